//! `cx config` -- show the effective configuration.

use anyhow::{Context as _, Result};

use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let config = ctx.load_config()?;

    if ctx.json {
        return output::print_json(&config);
    }
    let yaml = serde_yaml::to_string(&config).context("failed to render config")?;
    print!("{yaml}");
    Ok(())
}
