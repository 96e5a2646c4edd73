//! # Schema Analyzer
//!
//! Turns the flat table/column listing from a [`SchemaSource`] into
//! [`TableModel`]s with primary/foreign key metadata and a table-level
//! dependency map. Pure transform; built once per run.
//!
//! [`SchemaSource`]: crate::schema::introspect::SchemaSource

use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::types::{SchemaColumn, SchemaTable};

/// A resolved foreign-key edge: `column` in this table references
/// `table.foreign_column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub table: String,
    pub column: String,
    pub foreign_column: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableModel {
    pub name: String,
    pub columns: Vec<SchemaColumn>,
    pub primary_key: Option<SchemaColumn>,
    pub foreign_keys: Vec<SchemaColumn>,
    pub dependencies: Vec<Dependency>,
}

impl TableModel {
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.as_ref().is_some_and(|pk| pk.name == column)
    }
}

/// Output of [`analyze_schema`]. Both maps keep the schema's listing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaAnalysis {
    pub tables: IndexMap<String, TableModel>,
    /// Table name → distinct tables it references, in column order.
    pub dependencies: IndexMap<String, Vec<String>>,
}

impl SchemaAnalysis {
    pub fn table(&self, name: &str) -> Option<&TableModel> {
        self.tables.get(name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.values().map(|d| d.len()).sum()
    }
}

/// Build table models and the dependency map from a raw schema listing.
///
/// - The primary key is the first `PRIMARY KEY` column.
/// - Every `FOREIGN KEY` column is a foreign key.
/// - A dependency is recorded only when the referenced table is present in
///   the schema; dangling references are ignored.
pub fn analyze_schema(schema: &[SchemaTable]) -> SchemaAnalysis {
    let known: std::collections::HashSet<&str> =
        schema.iter().map(|t| t.table.as_str()).collect();

    let mut analysis = SchemaAnalysis::default();

    for table in schema {
        let primary_key = table.columns.iter().find(|c| c.is_primary_key()).cloned();
        let foreign_keys: Vec<SchemaColumn> = table
            .columns
            .iter()
            .filter(|c| c.is_foreign_key())
            .cloned()
            .collect();

        let mut dependencies = Vec::new();
        let mut depends_on: Vec<String> = Vec::new();

        for fk in &foreign_keys {
            let Some(target) = fk.foreign_table.as_deref() else {
                continue;
            };
            if !known.contains(target) {
                tracing::debug!(
                    "Ignoring {}.{} → {}: referenced table is not in the schema",
                    table.table,
                    fk.name,
                    target
                );
                continue;
            }

            dependencies.push(Dependency {
                table: target.to_string(),
                column: fk.name.clone(),
                foreign_column: fk.foreign_column.clone().unwrap_or_else(|| "id".to_string()),
            });
            if !depends_on.iter().any(|d| d == target) {
                depends_on.push(target.to_string());
            }
        }

        analysis.dependencies.insert(table.table.clone(), depends_on);
        analysis.tables.insert(
            table.table.clone(),
            TableModel {
                name: table.table.clone(),
                columns: table.columns.clone(),
                primary_key,
                foreign_keys,
                dependencies,
            },
        );
    }

    analysis
}
