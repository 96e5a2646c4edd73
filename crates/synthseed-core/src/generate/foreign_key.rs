//! # Foreign-Key Context Sampler
//!
//! Draws a bounded random sample of key values from dependency tables that
//! have already been generated, so the generator can reference rows that
//! really exist. Tables are generated in dependency order, so every parent
//! sampled here is complete.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use crate::generate::dataset::GeneratedDataSet;
use crate::schema::analyze::Dependency;

/// Default cap on sampled values per dependency.
pub const DEFAULT_SAMPLE_SIZE: usize = 20;

/// Sentinel rendered when a table has no foreign keys.
pub const NO_FOREIGN_KEYS: &str = "no foreign keys";

/// Sampled values for one foreign-key column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeySample {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
    pub values: Vec<serde_json::Value>,
}

/// The foreign-key context handed to one generation batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ForeignKeyContext {
    /// The table has no dependencies at all.
    NoForeignKeys,
    /// One entry per dependency whose table already has rows. Dependencies
    /// on tables with no rows yet are left out.
    Sampled(Vec<ForeignKeySample>),
}

impl ForeignKeyContext {
    pub fn samples(&self) -> &[ForeignKeySample] {
        match self {
            ForeignKeyContext::NoForeignKeys => &[],
            ForeignKeyContext::Sampled(s) => s,
        }
    }

    /// Render for a prompt: the sentinel string, or a JSON object mapping
    /// each FK column to its allowed values.
    pub fn render(&self) -> String {
        match self {
            ForeignKeyContext::NoForeignKeys => NO_FOREIGN_KEYS.to_string(),
            ForeignKeyContext::Sampled(samples) => {
                let mut map = serde_json::Map::new();
                for s in samples {
                    map.insert(
                        s.column.clone(),
                        serde_json::json!({
                            "references": format!("{}.{}", s.references_table, s.references_column),
                            "values": s.values,
                        }),
                    );
                }
                serde_json::to_string_pretty(&serde_json::Value::Object(map))
                    .unwrap_or_else(|_| "{}".to_string())
            }
        }
    }
}

/// Sample up to `cap` referenced values per dependency from `data`.
pub fn sample_foreign_keys(
    dependencies: &[Dependency],
    data: &GeneratedDataSet,
    cap: usize,
    rng: &mut impl Rng,
) -> ForeignKeyContext {
    if dependencies.is_empty() {
        return ForeignKeyContext::NoForeignKeys;
    }

    let mut samples = Vec::new();
    for dep in dependencies {
        let rows = data.rows(&dep.table);
        if rows.is_empty() {
            continue;
        }

        let values: Vec<serde_json::Value> = rows
            .choose_multiple(rng, cap)
            .filter_map(|row| row.get(&dep.foreign_column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();

        samples.push(ForeignKeySample {
            column: dep.column.clone(),
            references_table: dep.table.clone(),
            references_column: dep.foreign_column.clone(),
            values,
        });
    }

    ForeignKeyContext::Sampled(samples)
}
