//! Output helpers for the `cx` CLI.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

use cortex_analysis::{ContextOutput, Relevance, RiskLevel};

/// Pretty-prints any serializable value as JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders a context pack for the terminal.
pub fn render_context(output: &ContextOutput) {
    println!(
        "{} {} ({} / {} tokens)",
        "Context for".bold(),
        output.target,
        output.total_tokens,
        output.max_tokens
    );

    if let Some(ref intent) = output.intent {
        let pattern = intent.pattern.as_deref().unwrap_or("unknown");
        println!("  intent: {} [{}]", intent.keywords.join(", "), pattern);
    }

    if !output.entry_points.is_empty() {
        println!("\n{}", "Entry points".bold());
        for entry in &output.entry_points {
            println!("  {} {}", entry.name.cyan(), dim_location(entry));
        }
    }

    println!("\n{}", "Relevant".bold());
    for entry in &output.relevant {
        let marker = match entry.relevance {
            Relevance::High => "●".green().to_string(),
            Relevance::Medium => "●".yellow().to_string(),
            Relevance::Low => "○".to_string(),
        };
        let keystone = if entry.is_keystone { " ★" } else { "" };
        println!(
            "  {marker} {}{keystone} {} -- {} ({} tokens)",
            entry.name,
            dim_location(entry),
            entry.reason,
            entry.estimated_tokens
        );
    }

    for (reason, ids) in &output.excluded {
        println!("\n{} ({}): {}", "Excluded".dimmed(), reason, ids.len());
    }
    for warning in &output.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn dim_location(entry: &cortex_analysis::ContextEntry) -> String {
    if entry.file_path.is_empty() {
        return String::new();
    }
    match entry.line_start {
        Some(line) => format!("{}:{line}", entry.file_path).dimmed().to_string(),
        None => entry.file_path.dimmed().to_string(),
    }
}

/// Colors a risk level for the terminal.
pub fn render_risk(risk: RiskLevel) -> String {
    match risk {
        RiskLevel::High => risk.as_str().red().bold().to_string(),
        RiskLevel::Medium => risk.as_str().yellow().to_string(),
        RiskLevel::Low => risk.as_str().green().to_string(),
    }
}
