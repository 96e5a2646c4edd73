use std::collections::BTreeMap;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "synthseed",
    about = "Fill a live database with referentially-consistent mock data written by an LLM",
    version,
    after_help = "Examples:\n  synthseed generate --db postgres://localhost/myapp --rows 25\n  synthseed generate --table-rows users=50,posts=200   # DB from .env\n  synthseed preview --db sqlite://dev.db --rows 5\n  synthseed graph --db postgres://localhost/myapp --format dot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate mock data and insert it into the database
    Generate(GenerateArgs),

    /// Generate mock data and print the insert statements without running them
    Preview(PreviewArgs),

    /// Visualize the table dependency graph
    Graph(GraphArgs),
}

/// Where the schema comes from.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Database connection URL (postgres://, sqlite://)
    /// Falls back to DATABASE_URL env var, .env file, then synthseed.toml
    #[arg(long, env = "DATABASE_URL")]
    pub db: Option<String>,

    /// Schema name to introspect (default: public for Postgres)
    #[arg(long)]
    pub schema: Option<String>,
}

/// Flags that shape a generation run. Unset flags fall back to synthseed.toml.
#[derive(Args, Debug)]
pub struct GenerationArgs {
    /// Number of rows to generate per table
    #[arg(long)]
    pub rows: Option<usize>,

    /// Per-table row count overrides (e.g., users=50,posts=200)
    #[arg(long, value_delimiter = ',')]
    pub table_rows: Vec<String>,

    /// Only generate data for these tables
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Exclude these tables from generation
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Rows requested per LLM call
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// LLM model override
    #[arg(long)]
    pub model: Option<String>,

    /// Seed for foreign-key sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub generation: GenerationArgs,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Parser, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format for the dependency graph
    #[arg(long, default_value = "mermaid")]
    pub format: GraphFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GraphFormat {
    Mermaid,
    Dot,
}

impl GenerationArgs {
    /// Parse table row overrides like "users=50,posts=200".
    /// Malformed entries are skipped.
    pub fn parse_table_rows(&self) -> BTreeMap<String, usize> {
        let mut map = BTreeMap::new();
        for entry in &self.table_rows {
            if let Some((table, count_str)) = entry.split_once('=') {
                if let Ok(count) = count_str.trim().parse::<usize>() {
                    map.insert(table.trim().to_string(), count);
                }
            }
        }
        map
    }
}
