//! `cx impact` -- blast radius and risk for a change.

use anyhow::Result;
use owo_colors::OwoColorize;

use cortex_analysis::{ImpactAnalyzer, ImpactRequest};
use cortex_graph::DepGraph;

use crate::cli::ImpactArgs;
use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &ImpactArgs) -> Result<()> {
    let (_cx_dir, store) = ctx.open_store()?;
    let config = ctx.load_config()?;
    let graph = DepGraph::build_from_store(&store)?;

    let mut request = ImpactRequest::new(args.target.clone());
    request.depth = args.depth;
    let result = ImpactAnalyzer::new(&store, &graph, &config).analyze(&request)?;

    if ctx.json {
        return output::print_json(&result);
    }

    println!(
        "{} {} -- risk: {}",
        "Impact of".bold(),
        args.target,
        output::render_risk(result.risk_level)
    );
    for affected in &result.affected {
        let test_marker = if affected.is_test { " [test]" } else { "" };
        let keystone = if affected.is_keystone { " ★" } else { "" };
        println!(
            "  hop {} {}{keystone}{test_marker} {} -- {}",
            affected.hop,
            affected.name,
            affected.file_path.dimmed(),
            affected.reason
        );
    }
    println!("\nSuggested: {}", result.suggested_tests);
    for recommendation in &result.recommendations {
        println!("  - {recommendation}");
    }
    Ok(())
}
