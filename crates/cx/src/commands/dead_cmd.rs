//! `cx dead` -- dead-code detection.

use anyhow::{bail, Result};
use owo_colors::OwoColorize;

use cortex_analysis::{DeadCodeAnalyzer, DeadRequest};
use cortex_core::enums::EntityKind;
use cortex_graph::DepGraph;

use crate::cli::DeadArgs;
use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &DeadArgs) -> Result<()> {
    let (_cx_dir, store) = ctx.open_store()?;
    let config = ctx.load_config()?;
    let graph = DepGraph::build_from_store(&store)?;

    let type_filter = match &args.type_filter {
        Some(raw) => match EntityKind::parse(raw) {
            Some(kind) => Some(kind),
            None => bail!("invalid argument: unknown entity type {raw:?}"),
        },
        None => None,
    };

    let request = DeadRequest {
        tier: args.tier,
        include_exports: args.include_exports,
        type_filter,
        chains: args.chains,
    };
    let result = DeadCodeAnalyzer::new(&store, &graph, &config).analyze(&request)?;

    if ctx.json {
        return output::print_json(&result);
    }

    if result.results.is_empty() {
        println!("No dead code found at tier {}", args.tier);
        return Ok(());
    }

    println!(
        "{} ({} entities, {} chains)",
        "Dead code".bold(),
        result.results.len(),
        result.chain_count
    );

    let mut last_file = "";
    for dead in &result.results {
        if args.by_file && dead.file_path != last_file {
            println!("\n{}", dead.file_path.underline());
            last_file = &dead.file_path;
        }
        let location = match dead.line_start {
            Some(line) => format!("{}:{line}", dead.file_path),
            None => dead.file_path.clone(),
        };
        let chain_note = if dead.chain > 0 {
            format!(" [chain {}]", dead.chain)
        } else {
            String::new()
        };
        println!(
            "  {} {} {} -- {}{chain_note}",
            dead.confidence.as_str().yellow(),
            dead.name,
            location.dimmed(),
            dead.reason
        );
    }
    Ok(())
}
