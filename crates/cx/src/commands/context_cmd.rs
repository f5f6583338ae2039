//! `cx context` -- assemble a context pack, or a recovery digest when no
//! target is given.

use anyhow::{bail, Result};

use cortex_analysis::{
    digest, ContextAssembler, ContextRequest, Density, DiffContextRequest, SmartContextRequest,
};
use cortex_config::BudgetMode;
use cortex_graph::DepGraph;

use crate::cli::ContextArgs;
use crate::context::RuntimeContext;
use crate::gitdiff;
use crate::output;

pub fn run(ctx: &RuntimeContext, args: &ContextArgs) -> Result<()> {
    let (cx_dir, store) = ctx.open_store()?;
    let config = ctx.load_config()?;

    // No target, no mode flags: session recovery digest.
    let diff_mode = args.diff || args.staged || args.commit_range.is_some();
    if args.target.is_none() && args.smart.is_none() && !diff_mode {
        let text = digest(&store, Some(cx_dir.as_path()), args.full)?;
        if ctx.json {
            return output::print_json(&serde_json::json!({ "digest": text }));
        }
        print!("{text}");
        return Ok(());
    }

    let max_tokens = args.max_tokens.unwrap_or(config.budget.max_tokens);
    let budget_mode = match &args.budget_mode {
        Some(raw) => match BudgetMode::parse(raw) {
            Some(mode) => mode,
            None => bail!("invalid argument: unknown budget mode {raw:?}"),
        },
        None => config.budget.mode,
    };
    let density = match Density::parse(&args.density) {
        Some(density) => density,
        None => bail!("invalid argument: unknown density {:?}", args.density),
    };

    let graph = DepGraph::build_from_store(&store)?;
    let assembler = ContextAssembler::new(&store, &graph, &config);

    let pack = if let Some(ref description) = args.smart {
        let mut request = SmartContextRequest::new(description.clone());
        request.depth = args.depth;
        request.max_tokens = max_tokens;
        request.budget_mode = budget_mode;
        request.density = density;
        assembler.assemble_smart(&request)?
    } else if diff_mode {
        let repo_root = cx_dir
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_else(|| std::path::PathBuf::from("."));
        let diff_text =
            gitdiff::capture_diff(&repo_root, args.staged, args.commit_range.as_deref())?;
        let mut request = DiffContextRequest::new(diff_text);
        request.depth = args.depth;
        request.max_tokens = max_tokens;
        request.budget_mode = budget_mode;
        request.density = density;
        assembler.assemble_diff(&request)?
    } else if let Some(ref target) = args.target {
        let request = ContextRequest {
            target: target.clone(),
            hops: args.hops,
            max_tokens,
            budget_mode,
            density,
            include: args.include.clone(),
            exclude: args.exclude.clone(),
            with_coverage: args.with_coverage,
        };
        assembler.assemble(&request)?
    } else {
        // Unreachable: the no-target case returned the digest above.
        bail!("invalid argument: context needs a target, --smart, or a diff selection");
    };

    if ctx.json {
        output::print_json(&pack)
    } else {
        output::render_context(&pack);
        Ok(())
    }
}
