//! # Configuration File Parser
//!
//! Reads and parses `synthseed.toml`, the optional user configuration file
//! that sets defaults without requiring CLI flags. Supports:
//!
//! - `[database]`: default connection URL
//! - `[generate]`: default row count, batching, retry and sampling limits
//! - `[tables.<name>]`: per-table row count overrides
//! - `[llm]`: model override
//!
//! Example `synthseed.toml`:
//!
//! ```toml
//! [database]
//! url = "postgres://localhost/myapp"
//!
//! [generate]
//! rows = 25
//! batch_size = 10
//! max_retries = 3
//! sample_size = 20
//! exclude = ["audit_log"]
//!
//! [tables.users]
//! rows = 50
//!
//! [llm]
//! model = "claude-sonnet-4-20250514"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SynthSeedError};
use crate::generate::orchestrator::GenerationOptions;
use crate::schema::analyze::SchemaAnalysis;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "synthseed.toml";

/// Top-level synthseed.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynthSeedConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
    /// Per-table overrides, keyed by table name.
    pub tables: BTreeMap<String, TableConfig>,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "postgres://localhost/myapp").
    pub url: Option<String>,
    /// Schema to introspect on PostgreSQL (default "public").
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Default number of rows per table.
    pub rows: Option<usize>,
    /// Rows requested per generator call.
    pub batch_size: Option<usize>,
    /// Failed steps allowed per batch before it is abandoned.
    pub max_retries: Option<u32>,
    /// Foreign-key values sampled per dependency.
    pub sample_size: Option<usize>,
    /// Tables to include (empty = all).
    pub include: Option<Vec<String>>,
    /// Tables to exclude.
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: Option<String>,
}

/// Read and parse a synthseed.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed or validated.
pub fn read_config(dir: &Path) -> Result<Option<SynthSeedConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| SynthSeedError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let config: SynthSeedConfig = toml::from_str(&content).map_err(|e| SynthSeedError::Config {
        message: format!("Failed to parse {}: {}", path.display(), e),
    })?;

    config.validate()?;

    Ok(Some(config))
}

impl SynthSeedConfig {
    /// Build table_row_overrides from the [tables] section.
    pub fn table_row_overrides(&self) -> BTreeMap<String, usize> {
        self.tables
            .iter()
            .filter_map(|(name, tc)| tc.rows.map(|rows| (name.clone(), rows)))
            .collect()
    }

    /// Generation options from this file alone. CLI flags are layered on
    /// top by the caller.
    pub fn generation_options(&self) -> GenerationOptions {
        let defaults = GenerationOptions::default();
        GenerationOptions {
            default_rows: self.generate.rows.unwrap_or(defaults.default_rows),
            table_rows: self.table_row_overrides(),
            batch_size: self.generate.batch_size.unwrap_or(defaults.batch_size),
            max_retries: self.generate.max_retries.unwrap_or(defaults.max_retries),
            sample_size: self.generate.sample_size.unwrap_or(defaults.sample_size),
            include: self.generate.include.iter().flatten().cloned().collect(),
            exclude: self.generate.exclude.iter().flatten().cloned().collect(),
        }
    }

    /// Validate semantic constraints that serde cannot enforce.
    pub fn validate(&self) -> Result<()> {
        let zero_checks = [
            ("batch_size", self.generate.batch_size.map(|v| v as u64)),
            ("max_retries", self.generate.max_retries.map(u64::from)),
            ("sample_size", self.generate.sample_size.map(|v| v as u64)),
        ];
        for (key, value) in zero_checks {
            if value == Some(0) {
                return Err(SynthSeedError::Config {
                    message: format!("generate.{} must be greater than 0", key),
                });
            }
        }

        if let (Some(include), Some(exclude)) = (&self.generate.include, &self.generate.exclude) {
            if let Some(table) = include.iter().find(|t| exclude.contains(t)) {
                return Err(SynthSeedError::Config {
                    message: format!(
                        "Table '{}' is listed in both generate.include and generate.exclude",
                        table
                    ),
                });
            }
        }

        Ok(())
    }

    /// Warn about config entries naming tables that are not in the schema.
    ///
    /// Called after introspection so stale entries surface early.
    pub fn validate_against_schema(&self, analysis: &SchemaAnalysis) -> Vec<String> {
        let mut warnings = Vec::new();

        for name in self.tables.keys() {
            if analysis.table(name).is_none() {
                warnings.push(format!(
                    "synthseed.toml: [tables.{}] references a table which does not exist in schema",
                    name
                ));
            }
        }

        let filters = [
            ("include", &self.generate.include),
            ("exclude", &self.generate.exclude),
        ];
        for (key, list) in filters {
            for name in list.iter().flatten() {
                if analysis.table(name).is_none() {
                    tracing::warn!(table = %name, "generate.{} names an unknown table", key);
                    warnings.push(format!(
                        "synthseed.toml: generate.{} lists '{}' which does not exist in schema",
                        key, name
                    ));
                }
            }
        }

        warnings
    }
}
