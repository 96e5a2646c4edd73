pub mod generate;
pub mod graph;
pub mod preview;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;

use synthseed_core::config::{read_config, SynthSeedConfig};
use synthseed_core::error::SynthSeedError;
use synthseed_core::generate::GenerationOptions;
use synthseed_core::output::direct::{connect_postgres, connect_sqlite};
use synthseed_core::pipeline::{plan_schema, SchemaPlan};
use synthseed_core::schema::introspect::database_type_from_url;
use synthseed_core::schema::postgres::PostgresSchemaSource;
use synthseed_core::schema::sqlite::SqliteSchemaSource;
use synthseed_core::schema::types::DatabaseType;
use synthseed_core::LlmProvider;

use crate::args::{ConnectionArgs, GenerationArgs};

/// A connected database, one pool per backend.
pub enum Database {
    Postgres {
        pool: sqlx::PgPool,
        schema: Option<String>,
    },
    Sqlite(sqlx::SqlitePool),
}

impl Database {
    pub async fn connect(db_url: &str, schema: Option<String>) -> Result<Self> {
        match database_type_from_url(db_url)? {
            DatabaseType::PostgreSQL => Ok(Database::Postgres {
                pool: connect_postgres(db_url).await?,
                schema,
            }),
            DatabaseType::SQLite => Ok(Database::Sqlite(connect_sqlite(db_url).await?)),
        }
    }

    pub fn postgres_source(pool: &sqlx::PgPool, schema: Option<&str>) -> PostgresSchemaSource {
        match schema {
            Some(name) => PostgresSchemaSource::with_schema(pool.clone(), name.to_string()),
            None => PostgresSchemaSource::new(pool.clone()),
        }
    }

    pub async fn plan(&self) -> Result<SchemaPlan> {
        let plan = match self {
            Database::Postgres { pool, schema } => {
                plan_schema(&Self::postgres_source(pool, schema.as_deref())).await?
            }
            Database::Sqlite(pool) => plan_schema(&SqliteSchemaSource::new(pool.clone())).await?,
        };
        Ok(plan)
    }
}

/// Config file, resolved database URL and connection for one command.
pub struct Session {
    pub config: Option<SynthSeedConfig>,
    pub db: Database,
}

impl Session {
    pub async fn open(args: &ConnectionArgs) -> Result<Self> {
        let config = read_config(Path::new("."))?;
        let db_url = resolve_db_url(args.db.as_deref(), config.as_ref())?;
        let schema = args
            .schema
            .clone()
            .or_else(|| config.as_ref().and_then(|c| c.database.schema.clone()));
        let db = Database::connect(&db_url, schema).await?;
        Ok(Self { config, db })
    }

    /// Print config entries that name tables missing from the schema.
    pub async fn warn_config_drift(&self) -> Result<()> {
        let Some(config) = &self.config else {
            return Ok(());
        };
        let has_table_refs = !config.tables.is_empty()
            || config.generate.include.is_some()
            || config.generate.exclude.is_some();
        if !has_table_refs {
            return Ok(());
        }
        let plan = self.db.plan().await?;
        for warning in config.validate_against_schema(&plan.analysis) {
            eprintln!("warning: {}", warning);
        }
        Ok(())
    }

    /// synthseed.toml as the base, CLI flags on top.
    pub fn generation_options(&self, args: &GenerationArgs) -> GenerationOptions {
        merge_options(self.config.as_ref(), args)
    }

    pub fn provider(&self, args: &GenerationArgs) -> Result<LlmProvider> {
        let model = args.model.clone().or_else(|| {
            self.config
                .as_ref()
                .and_then(|c| c.llm.model.clone())
        });
        LlmProvider::from_env(model.as_deref())
            .context("Generating data requires an LLM API key (ANTHROPIC_API_KEY or OPENAI_API_KEY)")
    }
}

pub fn merge_options(config: Option<&SynthSeedConfig>, args: &GenerationArgs) -> GenerationOptions {
    let mut options = config
        .map(|c| c.generation_options())
        .unwrap_or_default();

    if let Some(rows) = args.rows {
        options.default_rows = rows;
    }
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size.max(1);
    }
    options.table_rows.extend(args.parse_table_rows());
    if !args.include.is_empty() {
        options.include = args.include.iter().cloned().collect();
    }
    if !args.exclude.is_empty() {
        options.exclude = args.exclude.iter().cloned().collect();
    }
    options
}

pub fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Spinner showing per-table generation progress.
pub fn generation_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("invalid progress template")?,
    );
    pb.set_message("Generating data...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Resolve database URL from args, env, .env file, or synthseed.toml.
fn resolve_db_url(explicit: Option<&str>, config: Option<&SynthSeedConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }

    // Try environment variable
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }

    // Try .env file
    if dotenvy::dotenv().is_ok() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return Ok(url);
        }
    }

    // Try synthseed.toml
    if let Some(url) = config.and_then(|c| c.database.url.clone()) {
        return Ok(url);
    }

    Err(SynthSeedError::NoDatabaseUrl.into())
}
