//! `cx` -- code-intelligence CLI for the cortex engine.
//!
//! Parses CLI arguments with clap, resolves the runtime context, and
//! dispatches to command handlers. Ctrl+C cancels in-flight metric
//! computation through the shared cancellation token; a second Ctrl+C
//! force-exits.

mod cli;
mod commands;
mod context;
mod gitdiff;
mod output;

use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;
use cortex_graph::CancelToken;

/// Tracks whether a Ctrl+C has already been received.
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

fn main() {
    let cancel = CancelToken::new();

    // First Ctrl+C: request cancellation. Second: force exit.
    let handler_token = cancel.clone();
    let _ = ctrlc::set_handler(move || {
        if CTRLC_RECEIVED.swap(true, Ordering::SeqCst) {
            std::process::exit(1);
        }
        handler_token.cancel();
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global, cancel);

    if ctx.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("cx=debug,cortex_storage=debug,cortex_graph=debug,cortex_analysis=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Some(Commands::Init(args)) => commands::init::run(&ctx, &args),
        Some(Commands::Import(args)) => commands::import::run(&ctx, &args),
        Some(Commands::Context(args)) => commands::context_cmd::run(&ctx, &args),
        Some(Commands::Impact(args)) => commands::impact_cmd::run(&ctx, &args),
        Some(Commands::Dead(args)) => commands::dead_cmd::run(&ctx, &args),
        Some(Commands::Rank(args)) => commands::rank_cmd::run(&ctx, &args),
        Some(Commands::Recover(args)) => commands::recover_cmd::run(&ctx, &args),
        Some(Commands::Commit(args)) => commands::vc::run_commit(&ctx, &args),
        Some(Commands::Branch(args)) => commands::vc::run_branch(&ctx, &args),
        Some(Commands::Checkout(args)) => commands::vc::run_checkout(&ctx, &args),
        Some(Commands::Tag(args)) => commands::vc::run_tag(&ctx, &args),
        Some(Commands::Reset(args)) => commands::vc::run_reset(&ctx, &args),
        Some(Commands::Log(args)) => commands::vc::run_log(&ctx, &args),
        Some(Commands::Status) => commands::vc::run_status(&ctx),
        Some(Commands::Sql(args)) => commands::sql_cmd::run(&ctx, &args),
        Some(Commands::Config) => commands::config_cmd::run(&ctx),
        Some(Commands::Completion(args)) => commands::completion::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{s}");
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
