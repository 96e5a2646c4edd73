use anyhow::Result;

use synthseed_core::graph::visualize::{self, GraphFormat as VizFormat};

use crate::args::GraphArgs;
use crate::commands::Session;

pub async fn run(args: &GraphArgs) -> Result<()> {
    let session = Session::open(&args.connection).await?;
    let plan = session.db.plan().await?;

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(&plan.graph(), &plan.order.dropped_edges, format);
    println!("{}", output);

    if let Some(config) = &session.config {
        for warning in config.validate_against_schema(&plan.analysis) {
            eprintln!("warning: {}", warning);
        }
    }

    Ok(())
}
