//! # Pipeline
//!
//! End-to-end entry points:
//!
//! ```text
//! fetch schema ─► analyze ─► resolve order ─► generate ─► plan ─► execute
//! ```
//!
//! Only a schema fetch failure aborts a run. Everything after that degrades
//! per batch or per table and is reported in the returned result.

use rand::Rng;
use serde::Serialize;

use crate::error::Result;
use crate::generate::dataset::GeneratedDataSet;
use crate::generate::orchestrator::{generate_all, GenerationOptions, ProgressFn};
use crate::graph::dag::DependencyGraph;
use crate::graph::topo::{resolve_order, DroppedEdge, InsertionOrder};
use crate::llm::client::TextGenerator;
use crate::output::executor::{execute_plans, ExecutionResult, SqlExecutor};
use crate::output::plan::{build_insert_plans, InsertPlan};
use crate::schema::analyze::{analyze_schema, SchemaAnalysis};
use crate::schema::introspect::SchemaSource;

/// The schema side of a run: analyzed tables and their insertion order.
#[derive(Debug, Clone)]
pub struct SchemaPlan {
    pub analysis: SchemaAnalysis,
    pub order: InsertionOrder,
}

impl SchemaPlan {
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_analysis(&self.analysis)
    }
}

/// Everything produced before anything is written.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub order: Vec<String>,
    pub dropped_edges: Vec<DroppedEdge>,
    pub data: GeneratedDataSet,
    pub plans: Vec<InsertPlan>,
}

/// Fetch the schema, analyze it and resolve the insertion order.
pub async fn plan_schema<S: SchemaSource>(source: &S) -> Result<SchemaPlan> {
    let schema = source.fetch_schema().await?;
    let analysis = analyze_schema(&schema);
    tracing::info!(
        tables = analysis.table_count(),
        dependencies = analysis.dependency_count(),
        "Analyzed schema"
    );

    let graph = DependencyGraph::from_analysis(&analysis);
    for group in graph.cycle_groups() {
        tracing::warn!("Circular dependency between tables: {}", group.join(" -> "));
    }

    let order = resolve_order(&analysis.dependencies);
    for edge in &order.dropped_edges {
        tracing::warn!(from = %edge.from, to = %edge.to, "Ignoring dependency to break a cycle");
    }

    Ok(SchemaPlan { analysis, order })
}

/// Generate rows and build insert plans without touching the database.
pub async fn generate_mock_data<S, G, R>(
    source: &S,
    generator: &G,
    options: &GenerationOptions,
    rng: &mut R,
    progress: &mut ProgressFn<'_>,
) -> Result<GenerationReport>
where
    S: SchemaSource,
    G: TextGenerator,
    R: Rng + Send,
{
    let plan = plan_schema(source).await?;
    let data = generate_all(
        &plan.analysis,
        &plan.order.tables,
        generator,
        options,
        rng,
        progress,
    )
    .await;
    let plans = build_insert_plans(&data);

    Ok(GenerationReport {
        order: plan.order.tables,
        dropped_edges: plan.order.dropped_edges,
        data,
        plans,
    })
}

/// Run the whole pipeline and insert the generated rows.
///
/// Always returns a structured result; a schema fetch failure comes back as
/// `success = false` with the error attached.
pub async fn execute_mock_data_generation<S, G, E, R>(
    source: &S,
    generator: &G,
    executor: &E,
    options: &GenerationOptions,
    rng: &mut R,
    progress: &mut ProgressFn<'_>,
) -> ExecutionResult
where
    S: SchemaSource,
    G: TextGenerator,
    E: SqlExecutor,
    R: Rng + Send,
{
    let report = match generate_mock_data(source, generator, options, rng, progress).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Mock data generation failed: {}", e);
            return ExecutionResult::fatal(&e);
        }
    };

    if report.plans.is_empty() {
        tracing::warn!("No rows were generated for any table");
        return ExecutionResult::no_data();
    }

    execute_plans(executor, &report.plans).await
}
