//! CLI argument definitions for `cx`.

use clap::{Args, Parser, Subcommand};

/// Cortex: index a repository's symbols, rank them, and assemble
/// budget-bounded context packs around any target.
#[derive(Debug, Parser)]
#[command(name = "cx", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Path to the .cx directory (default: discovered by walking up).
    #[arg(long, global = true, env = "CX_DIR")]
    pub db: Option<String>,

    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose logging to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Assume yes for destructive confirmations.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a .cx directory and database in the current repo.
    Init(InitArgs),

    /// Ingest entities and dependencies emitted by a parser (JSON lines).
    Import(ImportArgs),

    /// Assemble a context pack around a target (or a recovery digest).
    Context(ContextArgs),

    /// Blast radius and risk for changing a target.
    Impact(ImpactArgs),

    /// Find dead and transitively dead code.
    Dead(DeadArgs),

    /// Rank entities by graph importance.
    Rank(RankArgs),

    /// Session-recovery digest for agents.
    Recover(RecoverArgs),

    /// Commit the working set.
    Commit(CommitArgs),

    /// Create a branch.
    Branch(BranchArgs),

    /// Switch to a branch, tag, or commit.
    Checkout(CheckoutArgs),

    /// Tag a commit.
    Tag(TagArgs),

    /// Move the current branch head.
    Reset(ResetArgs),

    /// Show commit history.
    Log(LogArgs),

    /// Show working-set status.
    Status,

    /// Run a read-only SQL query against the database.
    Sql(SqlArgs),

    /// Show the effective configuration.
    Config,

    /// Generate shell completions.
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory).
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON-lines file to ingest; "-" reads stdin.
    pub input: String,

    /// Overwrite entities that already exist (rescan).
    #[arg(long)]
    pub upsert: bool,
}

#[derive(Debug, Args)]
pub struct ContextArgs {
    /// Task id, file path, or entity id. Omit for a recovery digest.
    pub target: Option<String>,

    /// Expansion radius in hops.
    #[arg(long, default_value_t = 1)]
    pub hops: usize,

    /// Token budget for the pack.
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Budget mode: importance or distance.
    #[arg(long = "mode")]
    pub budget_mode: Option<String>,

    /// Density: sparse, medium, or dense.
    #[arg(long, default_value = "medium")]
    pub density: String,

    /// Expansion set members (deps, callers, types, tests, mocks).
    #[arg(long)]
    pub include: Vec<String>,

    /// Extra exclusion substrings.
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Attach coverage percentages to entries.
    #[arg(long)]
    pub with_coverage: bool,

    /// Smart mode: free-text task description instead of a target.
    #[arg(long)]
    pub smart: Option<String>,

    /// Diff mode: derive targets from the working-tree diff.
    #[arg(long)]
    pub diff: bool,

    /// Diff mode against the staged changes.
    #[arg(long)]
    pub staged: bool,

    /// Diff mode against a commit range (e.g. main..HEAD).
    #[arg(long)]
    pub commit_range: Option<String>,

    /// BFS depth for smart and diff modes.
    #[arg(long, default_value_t = 2)]
    pub depth: usize,

    /// Recovery digest in extended form (no-target mode only).
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Args)]
pub struct ImpactArgs {
    /// File path or entity id.
    pub target: String,

    /// Reverse-BFS depth.
    #[arg(long, default_value_t = 2)]
    pub depth: usize,
}

#[derive(Debug, Args)]
pub struct DeadArgs {
    /// Highest confidence tier to analyze (1, 2, or 3).
    #[arg(long, default_value_t = 1)]
    pub tier: u8,

    /// Also treat public never-referenced entities as dead.
    #[arg(long)]
    pub include_exports: bool,

    /// Group results by file.
    #[arg(long)]
    pub by_file: bool,

    /// Restrict to one entity kind (function, method, type, ...).
    #[arg(long = "type")]
    pub type_filter: Option<String>,

    /// Group dead entities into chains.
    #[arg(long)]
    pub chains: bool,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    /// Number of entries to show.
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Keystones only.
    #[arg(long)]
    pub keystones: bool,

    /// Bottlenecks only.
    #[arg(long)]
    pub bottlenecks: bool,

    /// Leaves only (in-degree zero).
    #[arg(long)]
    pub leaves: bool,

    /// Recompute metrics before ranking.
    #[arg(long)]
    pub recompute: bool,
}

#[derive(Debug, Args)]
pub struct RecoverArgs {
    /// Extended digest with top entities.
    #[arg(long)]
    pub full: bool,
}

#[derive(Debug, Args)]
pub struct CommitArgs {
    /// Commit message.
    #[arg(short, long)]
    pub message: String,
}

#[derive(Debug, Args)]
pub struct BranchArgs {
    /// Branch name.
    pub name: String,

    /// Ref to branch from (default: HEAD).
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Debug, Args)]
pub struct CheckoutArgs {
    /// Branch, tag, or commit to switch to.
    pub reference: String,
}

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Tag name.
    pub name: String,

    /// Ref to tag (default: HEAD).
    pub reference: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Ref to reset to.
    pub reference: String,

    /// Discard the working set (destructive; asks for confirmation).
    #[arg(long, conflicts_with = "soft")]
    pub hard: bool,

    /// Move the branch head only.
    #[arg(long)]
    pub soft: bool,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Maximum commits to show.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// A read-only SQL statement.
    pub query: String,

    /// Positional parameters, bound in order.
    #[arg(long = "param")]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    /// Shell to generate completions for.
    pub shell: clap_complete::Shell,
}
