//! Versioning commands: commit, branch, checkout, tag, reset, log, status.

use std::io::{BufRead, Write as _};

use anyhow::{bail, Result};
use owo_colors::OwoColorize;

use cortex_storage::{ResetMode, Store};

use crate::cli::{BranchArgs, CheckoutArgs, CommitArgs, LogArgs, ResetArgs, TagArgs};
use crate::context::RuntimeContext;
use crate::output;

pub fn run_commit(ctx: &RuntimeContext, args: &CommitArgs) -> Result<()> {
    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
    let hash = store.commit(&args.message)?;
    if ctx.json {
        return output::print_json(&serde_json::json!({ "hash": hash }));
    }
    if !ctx.quiet {
        println!("Committed {hash}");
    }
    Ok(())
}

pub fn run_branch(ctx: &RuntimeContext, args: &BranchArgs) -> Result<()> {
    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
    store.branch(&args.name, args.from.as_deref())?;
    if !ctx.quiet && !ctx.json {
        println!("Created branch {}", args.name);
    }
    Ok(())
}

pub fn run_checkout(ctx: &RuntimeContext, args: &CheckoutArgs) -> Result<()> {
    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
    store.checkout(&args.reference)?;
    if !ctx.quiet && !ctx.json {
        println!("Switched to {}", args.reference);
    }
    Ok(())
}

pub fn run_tag(ctx: &RuntimeContext, args: &TagArgs) -> Result<()> {
    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
    store.tag(&args.name, args.reference.as_deref())?;
    if !ctx.quiet && !ctx.json {
        println!("Tagged {}", args.name);
    }
    Ok(())
}

pub fn run_reset(ctx: &RuntimeContext, args: &ResetArgs) -> Result<()> {
    let mode = if args.hard {
        ResetMode::Hard
    } else {
        ResetMode::Soft
    };

    if mode == ResetMode::Hard && !ctx.yes && !confirm_hard_reset(&args.reference)? {
        bail!("reset aborted");
    }

    let (_cx_dir, _lock, store) = ctx.open_store_for_write()?;
    store.reset(&args.reference, mode)?;
    if !ctx.quiet && !ctx.json {
        println!("Reset ({}) to {}", mode.as_str(), args.reference);
    }
    Ok(())
}

/// Prompts for confirmation before a destructive reset.
fn confirm_hard_reset(reference: &str) -> Result<bool> {
    print!("Hard reset to {reference} discards uncommitted changes. Continue? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

pub fn run_log(ctx: &RuntimeContext, args: &LogArgs) -> Result<()> {
    let (_cx_dir, store) = ctx.open_store()?;
    let log = store.log(args.limit)?;

    if ctx.json {
        return output::print_json(&log);
    }
    if log.is_empty() {
        println!("No commits yet");
        return Ok(());
    }
    for commit in &log {
        println!(
            "{} {} {} {}",
            commit.hash.yellow(),
            commit.created_at.format("%Y-%m-%d %H:%M"),
            format!("[{}]", commit.branch).dimmed(),
            commit.message
        );
    }
    Ok(())
}

pub fn run_status(ctx: &RuntimeContext) -> Result<()> {
    let (_cx_dir, store) = ctx.open_store()?;
    let status = store.status()?;

    if ctx.json {
        return output::print_json(&status);
    }
    let branch = if status.branch.is_empty() {
        "(detached)".to_owned()
    } else {
        status.branch.clone()
    };
    println!(
        "On branch {} @ {}{}",
        branch.bold(),
        status.head.as_deref().unwrap_or("no commits"),
        if status.dirty { " (dirty)" } else { "" }
    );
    println!(
        "  {} active, {} archived, {} dependencies, {} files",
        status.active_entities, status.archived_entities, status.dependencies, status.files
    );
    Ok(())
}
