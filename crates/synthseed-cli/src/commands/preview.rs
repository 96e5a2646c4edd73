use anyhow::{bail, Result};
use indicatif::ProgressBar;

use synthseed_core::generate::GenerationOptions;
use synthseed_core::pipeline::{generate_mock_data, GenerationReport};
use synthseed_core::schema::introspect::SchemaSource;
use synthseed_core::schema::sqlite::SqliteSchemaSource;
use synthseed_core::LlmProvider;

use crate::args::{PreviewArgs, ReportFormat};
use crate::commands::{generation_spinner, rng, Database, Session};

pub async fn run(args: &PreviewArgs) -> Result<()> {
    let session = Session::open(&args.connection).await?;
    session.warn_config_drift().await?;

    let options = session.generation_options(&args.generation);
    let provider = session.provider(&args.generation)?;

    let pb = generation_spinner()?;
    let report = match &session.db {
        Database::Postgres { pool, schema } => {
            let source = Database::postgres_source(pool, schema.as_deref());
            generate(&source, &provider, &options, args.generation.seed, &pb).await
        }
        Database::Sqlite(pool) => {
            let source = SqliteSchemaSource::new(pool.clone());
            generate(&source, &provider, &options, args.generation.seed, &pb).await
        }
    };
    pb.finish_and_clear();
    let report = report?;

    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => print_sql(&report),
    }

    if report.plans.is_empty() {
        bail!("No data generated");
    }
    Ok(())
}

async fn generate<S: SchemaSource>(
    source: &S,
    provider: &LlmProvider,
    options: &GenerationOptions,
    seed: Option<u64>,
    pb: &ProgressBar,
) -> synthseed_core::Result<GenerationReport> {
    generate_mock_data(
        source,
        provider,
        options,
        &mut rng(seed),
        &mut |table: &str, done, total| {
            pb.set_message(format!("Generating {}... {}/{}", table, done, total));
        },
    )
    .await
}

fn print_sql(report: &GenerationReport) {
    println!("-- Insertion order: {}", report.order.join(", "));
    for edge in &report.dropped_edges {
        println!("-- Ignored {} -> {} to break a cycle", edge.from, edge.to);
    }
    for plan in &report.plans {
        println!("\n-- {} ({} rows)", plan.table, plan.row_count);
        println!("BEGIN;");
        println!("{};", plan.statement);
        println!("COMMIT;");
    }
}
