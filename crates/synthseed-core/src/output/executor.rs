//! # Transactional Executor
//!
//! Runs each table's insert plan in its own transaction:
//!
//! ```text
//! BEGIN;  INSERT ...;  COMMIT;
//!                 └── on failure: ROLLBACK;
//! ```
//!
//! Tables are independent: a failure is recorded and the next table still
//! runs. A failed rollback is kept next to the insert error and never
//! replaces it.

use serde::Serialize;

use crate::error::{Result, SynthSeedError};
use crate::output::direct::{truncate_sql, SQL_PREVIEW_LEN};
use crate::output::plan::InsertPlan;

/// Runs one raw SQL statement and reports rows affected.
///
/// The returned future need not be `Send`: plans run one after another on
/// the caller's task.
pub trait SqlExecutor: Send + Sync {
    fn execute(&self, sql: &str) -> impl std::future::Future<Output = Result<u64>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSuccess {
    pub table: String,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub table: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_error: Option<String>,
    pub records: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub tables_processed: usize,
    pub total_records: usize,
    pub successful_tables: usize,
    pub failed_tables: usize,
}

/// Structured outcome of a run. Always returned, even on fatal errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub summary: ExecutionSummary,
    pub successful: Vec<TableSuccess>,
    pub failed: Vec<TableFailure>,
}

impl ExecutionResult {
    /// Outcome for a run that failed before any table was touched.
    pub fn fatal(error: &SynthSeedError) -> Self {
        Self {
            success: false,
            message: format!("Mock data generation failed: {}", error),
            error: Some(error.to_string()),
            summary: ExecutionSummary::default(),
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Outcome when generation produced no rows at all.
    pub fn no_data() -> Self {
        Self {
            success: false,
            message: "No data generated".to_string(),
            error: None,
            summary: ExecutionSummary::default(),
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Classify per-table outcomes into an overall result.
    pub fn from_outcomes(successful: Vec<TableSuccess>, failed: Vec<TableFailure>) -> Self {
        let total_records: usize = successful.iter().map(|s| s.records).sum();
        let summary = ExecutionSummary {
            tables_processed: successful.len() + failed.len(),
            total_records,
            successful_tables: successful.len(),
            failed_tables: failed.len(),
        };

        let (success, message) = if failed.is_empty() {
            (
                true,
                format!(
                    "Successfully inserted {} records across {} tables",
                    total_records,
                    successful.len()
                ),
            )
        } else if !successful.is_empty() {
            (
                true,
                format!(
                    "Insertion partially completed: {} tables succeeded, {} failed",
                    successful.len(),
                    failed.len()
                ),
            )
        } else {
            (
                false,
                format!("Insertion failed for all {} tables", failed.len()),
            )
        };

        Self {
            success,
            message,
            error: None,
            summary,
            successful,
            failed,
        }
    }
}

/// Execute plans in order, one transaction per table.
pub async fn execute_plans<E: SqlExecutor>(executor: &E, plans: &[InsertPlan]) -> ExecutionResult {
    let mut successful = Vec::new();
    let mut failed = Vec::new();

    for plan in plans {
        match execute_plan(executor, plan).await {
            Ok(()) => {
                tracing::info!(table = %plan.table, records = plan.row_count, "Inserted");
                successful.push(TableSuccess {
                    table: plan.table.clone(),
                    records: plan.row_count,
                });
            }
            Err(failure) => {
                tracing::warn!(table = %plan.table, "{}", failure.error);
                failed.push(failure);
            }
        }
    }

    ExecutionResult::from_outcomes(successful, failed)
}

async fn execute_plan<E: SqlExecutor>(
    executor: &E,
    plan: &InsertPlan,
) -> std::result::Result<(), TableFailure> {
    let failure = |error: String, rollback_error: Option<String>| TableFailure {
        table: plan.table.clone(),
        error,
        rollback_error,
        records: plan.row_count,
    };

    // Nothing to roll back if the transaction never opened.
    if let Err(e) = executor.execute("BEGIN;").await {
        return Err(failure(e.to_string(), None));
    }

    let primary = match executor.execute(&plan.statement).await {
        Ok(_) => match executor.execute("COMMIT;").await {
            Ok(_) => return Ok(()),
            Err(e) => e,
        },
        Err(e) => e,
    };

    let rollback_error = match executor.execute("ROLLBACK;").await {
        Ok(_) => None,
        Err(e) => {
            let err = SynthSeedError::Rollback {
                table: plan.table.clone(),
                message: e.to_string(),
            };
            tracing::warn!(table = %plan.table, "{}", err);
            Some(err.to_string())
        }
    };

    let insert_error = SynthSeedError::Insert {
        table: plan.table.clone(),
        message: primary.to_string(),
        sql_preview: truncate_sql(&plan.statement, SQL_PREVIEW_LEN),
    };
    Err(failure(insert_error.to_string(), rollback_error))
}
