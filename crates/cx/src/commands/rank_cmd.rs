//! `cx rank` -- ranked entity listings, with optional metric recompute.

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;

use cortex_analysis::{rank, RankRequest};
use cortex_graph::{compute_all, DepGraph, MetricsOptions};
use cortex_storage::Store;

use crate::cli::RankArgs;
use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &RankArgs) -> Result<()> {
    let config = ctx.load_config()?;

    if args.recompute {
        let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
        recompute(ctx, &store, &config)?;
        return rank_and_render(ctx, &store, &config, args);
    }

    let (_cx_dir, store) = ctx.open_store()?;
    rank_and_render(ctx, &store, &config, args)
}

/// Builds the graph, computes all metrics, and persists them.
fn recompute(
    ctx: &RuntimeContext,
    store: &dyn Store,
    config: &cortex_config::CxConfig,
) -> Result<()> {
    let graph = DepGraph::build_from_store(store)?;
    let opts = MetricsOptions {
        damping: config.metrics.page_rank_damping,
        max_iterations: config.metrics.page_rank_iterations,
        ..MetricsOptions::default()
    };
    let metrics = compute_all(&graph, &opts, &ctx.cancel)?;
    store
        .save_bulk_metrics(&metrics)
        .context("failed to persist metrics")?;
    if !ctx.quiet && !ctx.json {
        println!("Recomputed metrics for {} entities", metrics.len());
    }
    Ok(())
}

fn rank_and_render(
    ctx: &RuntimeContext,
    store: &dyn Store,
    config: &cortex_config::CxConfig,
    args: &RankArgs,
) -> Result<()> {
    let request = RankRequest {
        top: args.top,
        keystones: args.keystones,
        bottlenecks: args.bottlenecks,
        leaves: args.leaves,
    };
    let list = rank(store, config, &request)?;

    if ctx.json {
        return output::print_json(&list);
    }

    println!(
        "{} (showing {} of {})",
        "Ranked entities".bold(),
        list.entries.len(),
        list.total_ranked
    );
    for (position, entry) in list.entries.iter().enumerate() {
        let location = match entry.line_start {
            Some(line) => format!("{}:{line}", entry.file_path),
            None => entry.file_path.clone(),
        };
        println!(
            "  {:>3}. {} [{}] pr={:.4} bw={:.4} in={} out={} {}",
            position + 1,
            entry.name,
            entry.classification.as_str(),
            entry.page_rank,
            entry.betweenness,
            entry.in_degree,
            entry.out_degree,
            location.dimmed()
        );
    }
    Ok(())
}
