use clap::{ArgAction, Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: u8,    // global -v / -vv
}

#[derive(Parser, Debug)]
#[command(name = "rdist")]
#[command(
    about = "Distribute LLM-agent rule and skill documents into per-tool layouts"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only report warnings and the final summary
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be written without touching the output tree
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Narrate every filter and rule (repeat for trace output)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean targets, precompute paths and distribute every task
    Run(RunArgs),

    /// Print the precomputed identity -> target path table
    Plan(PlanArgs),

    /// Initialize a ruledist.toml settings file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Location of the rule document and the tree it refers to
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Rule configuration document (json, toml or yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory that document identities are relative to
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Only show the mapping of this task
    #[arg(short, long)]
    pub task: Option<String>,

    /// Emit the table as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Directory to write the completion file into
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
