pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod schema;

// Re-export key types for convenience
pub use error::{Result, SynthSeedError};
pub use generate::{GeneratedDataSet, GenerationOptions};
pub use llm::{LlmProvider, TextGenerator};
pub use output::{ExecutionResult, SqlExecutor};
pub use pipeline::{execute_mock_data_generation, generate_mock_data, plan_schema};
pub use schema::introspect::SchemaSource;
pub use schema::types::{DatabaseType, SchemaColumn, SchemaTable};
