//! `cx sql` -- read-only SQL introspection.

use anyhow::Result;

use cortex_storage::Store;

use crate::cli::SqlArgs;
use crate::context::RuntimeContext;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &SqlArgs) -> Result<()> {
    let (_cx_dir, store) = ctx.open_store()?;

    // Each --param is JSON when it parses, a plain string otherwise.
    let params: Vec<serde_json::Value> = args
        .params
        .iter()
        .map(|p| serde_json::from_str(p).unwrap_or_else(|_| serde_json::Value::from(p.clone())))
        .collect();

    let rows = store.query_sql(&args.query, &params)?;

    if ctx.json {
        return output::print_json(&rows);
    }
    println!("{}", rows.columns.join(" | "));
    for row in &rows.rows {
        let rendered: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", rendered.join(" | "));
    }
    Ok(())
}
