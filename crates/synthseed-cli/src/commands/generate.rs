use anyhow::{bail, Result};
use comfy_table::Table as ComfyTable;
use indicatif::ProgressBar;

use synthseed_core::generate::GenerationOptions;
use synthseed_core::output::direct::{PgExecutor, SqliteExecutor};
use synthseed_core::pipeline::execute_mock_data_generation;
use synthseed_core::schema::introspect::SchemaSource;
use synthseed_core::schema::sqlite::SqliteSchemaSource;
use synthseed_core::{ExecutionResult, LlmProvider, SqlExecutor};

use crate::args::{GenerateArgs, ReportFormat};
use crate::commands::{generation_spinner, rng, Database, Session};

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let session = Session::open(&args.connection).await?;
    session.warn_config_drift().await?;

    let options = session.generation_options(&args.generation);
    let provider = session.provider(&args.generation)?;
    tracing::info!(model = provider.model(), "Using LLM provider");

    let pb = generation_spinner()?;
    let result = match &session.db {
        Database::Postgres { pool, schema } => {
            let source = Database::postgres_source(pool, schema.as_deref());
            let executor = PgExecutor::new(pool.clone());
            insert(&source, &provider, &executor, &options, args.generation.seed, &pb).await
        }
        Database::Sqlite(pool) => {
            let source = SqliteSchemaSource::new(pool.clone());
            let executor = SqliteExecutor::new(pool.clone());
            insert(&source, &provider, &executor, &options, args.generation.seed, &pb).await
        }
    };
    pb.finish_and_clear();

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        ReportFormat::Text => print_report(&result),
    }

    if !result.success {
        bail!("{}", result.error.as_deref().unwrap_or(&result.message));
    }
    Ok(())
}

async fn insert<S: SchemaSource, E: SqlExecutor>(
    source: &S,
    provider: &LlmProvider,
    executor: &E,
    options: &GenerationOptions,
    seed: Option<u64>,
    pb: &ProgressBar,
) -> ExecutionResult {
    execute_mock_data_generation(
        source,
        provider,
        executor,
        options,
        &mut rng(seed),
        &mut |table: &str, done, total| {
            pb.set_message(format!("Generating {}... {}/{}", table, done, total));
        },
    )
    .await
}

fn print_report(result: &ExecutionResult) {
    if !result.successful.is_empty() || !result.failed.is_empty() {
        let mut t = ComfyTable::new();
        t.set_header(vec!["Table", "Records", "Status", "Error"]);
        for ok in &result.successful {
            t.add_row(vec![
                ok.table.clone(),
                ok.records.to_string(),
                "inserted".to_string(),
                String::new(),
            ]);
        }
        for failed in &result.failed {
            let error = match &failed.rollback_error {
                Some(rollback) => format!("{}\n{}", failed.error, rollback),
                None => failed.error.clone(),
            };
            t.add_row(vec![
                failed.table.clone(),
                failed.records.to_string(),
                "rolled back".to_string(),
                error,
            ]);
        }
        println!("{}", t);
    }

    // Failures surface through the returned error.
    if result.success {
        eprintln!("\n✓ {}", result.message);
    }
}
