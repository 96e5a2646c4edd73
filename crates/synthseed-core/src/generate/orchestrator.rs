//! # Batch Orchestrator
//!
//! Walks the insertion order and fills each table batch by batch. Every
//! batch gets a freshly sampled foreign-key context and one run of the
//! generate/validate machine. A batch that comes back empty ends the table
//! early; the rows produced so far are kept.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::generate::dataset::{GeneratedDataSet, Row};
use crate::generate::foreign_key::{sample_foreign_keys, DEFAULT_SAMPLE_SIZE};
use crate::generate::machine::{run_batch, MAX_RETRIES};
use crate::llm::client::TextGenerator;
use crate::schema::analyze::{SchemaAnalysis, TableModel};

/// Default rows per generator call.
pub const BATCH_SIZE: usize = 10;

/// Default rows per table when nothing else is configured.
pub const DEFAULT_ROWS: usize = 10;

/// Knobs for one generation run. Built from CLI flags and `synthseed.toml`.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub default_rows: usize,
    pub table_rows: BTreeMap<String, usize>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub sample_size: usize,
    pub include: BTreeSet<String>,
    pub exclude: BTreeSet<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            default_rows: DEFAULT_ROWS,
            table_rows: BTreeMap::new(),
            batch_size: BATCH_SIZE,
            max_retries: MAX_RETRIES,
            sample_size: DEFAULT_SAMPLE_SIZE,
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
        }
    }
}

impl GenerationOptions {
    pub fn with_rows(rows: usize) -> Self {
        Self {
            default_rows: rows,
            ..Self::default()
        }
    }

    /// Requested row count for a table.
    pub fn rows_for(&self, table: &str) -> usize {
        self.table_rows
            .get(table)
            .copied()
            .unwrap_or(self.default_rows)
    }

    /// Whether a table passes the include/exclude filters.
    pub fn is_selected(&self, table: &str) -> bool {
        if self.exclude.contains(table) {
            return false;
        }
        self.include.is_empty() || self.include.contains(table)
    }
}

/// Called after every accepted batch with `(table, generated, requested)`.
pub type ProgressFn<'a> = dyn FnMut(&str, usize, usize) + Send + 'a;

/// Generate up to `requested` rows for one table, appending each accepted
/// batch to `data` as it arrives.
///
/// Every batch samples its context from `data` at that moment, so a
/// self-referencing table sees the rows of its own earlier batches.
/// Returns the number of rows generated, which is lower than requested when
/// a batch exhausts its retries.
pub async fn generate_table<G, R>(
    table: &TableModel,
    generator: &G,
    requested: usize,
    data: &mut GeneratedDataSet,
    options: &GenerationOptions,
    rng: &mut R,
    progress: &mut ProgressFn<'_>,
) -> usize
where
    G: TextGenerator,
    R: Rng + Send,
{
    let batch_size = options.batch_size.max(1);
    let mut generated = 0;
    data.ensure_table(&table.name);

    while generated < requested {
        let batch = batch_size.min(requested - generated);
        let context = sample_foreign_keys(&table.dependencies, data, options.sample_size, &mut *rng);

        let state = run_batch(table, generator, batch, context, options.max_retries).await;
        if state.final_data.is_empty() {
            tracing::warn!(
                table = %table.name,
                generated,
                requested,
                "Stopping table early after an empty batch"
            );
            break;
        }

        let mut batch_rows = state.final_data;
        batch_rows.truncate(batch);
        generated += batch_rows.len();
        data.extend(&table.name, batch_rows);

        tracing::info!(table = %table.name, generated, requested, "Batch complete");
        progress(&table.name, generated, requested);
    }

    generated
}

/// Generate rows for every selected table in `order`.
///
/// Tables are processed strictly in order, so a table's foreign-key context
/// draws from complete parent tables plus its own rows so far.
pub async fn generate_all<G, R>(
    analysis: &SchemaAnalysis,
    order: &[String],
    generator: &G,
    options: &GenerationOptions,
    rng: &mut R,
    progress: &mut ProgressFn<'_>,
) -> GeneratedDataSet
where
    G: TextGenerator,
    R: Rng + Send,
{
    let mut data = GeneratedDataSet::new();

    for name in order {
        if !options.is_selected(name) {
            tracing::debug!(table = %name, "Skipping filtered table");
            continue;
        }
        let Some(table) = analysis.table(name) else {
            continue;
        };

        let requested = options.rows_for(name);
        tracing::info!(table = %name, requested, "Generating table");

        generate_table(
            table,
            generator,
            requested,
            &mut data,
            options,
            &mut *rng,
            &mut *progress,
        )
        .await;
    }

    data
}
