pub mod analyze;
pub mod introspect;
pub mod postgres;
pub mod sqlite;
pub mod types;
