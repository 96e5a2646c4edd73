pub mod direct;
pub mod executor;
pub mod plan;

pub use executor::{execute_plans, ExecutionResult, SqlExecutor};
pub use plan::{build_insert_plan, InsertPlan};
