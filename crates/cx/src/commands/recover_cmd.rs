//! `cx recover` -- the session-recovery digest.

use anyhow::Result;

use cortex_analysis::digest;

use crate::cli::RecoverArgs;
use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &RecoverArgs) -> Result<()> {
    let (cx_dir, store) = ctx.open_store()?;
    let text = digest(&store, Some(cx_dir.as_path()), args.full)?;

    if ctx.json {
        return output::print_json(&serde_json::json!({ "digest": text }));
    }
    print!("{text}");
    Ok(())
}
