//! `cx init` -- create the `.cx` directory, database, and default config.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use cortex_config::{create_cx_dir, save_config, CxConfig, DB_FILE_NAME};
use cortex_storage::SqliteStore;

use crate::cli::InitArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &InitArgs) -> Result<()> {
    let root = match &args.path {
        Some(path) => PathBuf::from(path),
        None => std::env::current_dir().context("failed to resolve current directory")?,
    };

    let cx_dir = create_cx_dir(&root).context("failed to create .cx directory")?;

    // Opening the database initializes the schema.
    let _store = SqliteStore::open(cx_dir.join(DB_FILE_NAME))
        .context("failed to initialize cortex database")?;

    let config_path = cx_dir.join(cortex_config::CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config(&cx_dir, &CxConfig::default()).context("failed to write default config")?;
    }

    if ctx.json {
        crate::output::print_json(&serde_json::json!({
            "cx_dir": cx_dir.display().to_string(),
        }))?;
    } else if !ctx.quiet {
        println!("Initialized cortex store at {}", cx_dir.display());
    }
    Ok(())
}
