pub mod dataset;
pub mod foreign_key;
pub mod hints;
pub mod machine;
pub mod orchestrator;
pub mod repair;

pub use dataset::{GeneratedDataSet, Row};
pub use orchestrator::{generate_all, GenerationOptions};
