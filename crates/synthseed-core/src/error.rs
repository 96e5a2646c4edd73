//! # Error Types
//!
//! Defines `SynthSeedError`, the unified error enum for every failure mode in
//! the SynthSeed pipeline. Only `SchemaFetch` (and the connection/config
//! errors that precede it) abort a run; generation and validation errors are
//! consumed by the batch state machine, and insert errors are recorded per
//! table in the execution result.

use thiserror::Error;

/// All errors that can occur in SynthSeed operations.
#[derive(Error, Debug)]
pub enum SynthSeedError {
    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema fetch failed on query '{query}': {source}")]
    SchemaFetch {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("No database URL provided. SynthSeed looks for a connection in this order:\n  1. --db flag\n  2. DATABASE_URL environment variable\n  3. .env file with DATABASE_URL\n  4. synthseed.toml [database] section\n\nExample: synthseed generate --db postgres://localhost/myapp --rows 25")]
    NoDatabaseUrl,

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, sqlite://")]
    UnsupportedDatabase { scheme: String },

    #[error("Generation failed for {table}: {message}")]
    Generation { table: String, message: String },

    #[error("Generated output for {table} is invalid: {message}")]
    Validation { table: String, message: String },

    #[error("Statement '{statement}' failed: {message}")]
    Sql { statement: String, message: String },

    #[error("Insert failed on {table}: {message}\n  SQL: {sql_preview}")]
    Insert {
        table: String,
        message: String,
        sql_preview: String,
    },

    #[error("Rollback failed on {table}: {message}")]
    Rollback { table: String, message: String },

    #[error("LLM API error: {message}")]
    LlmError { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SynthSeedError>;
