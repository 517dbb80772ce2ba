use anyhow::Result;
use clap::Parser;
use ruledist::cli::{AppContext, Cli, Commands};
use ruledist::infra::logging::{init_logging, level_for};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
    };

    let settings = ruledist::load_config(std::path::Path::new("."))?;
    init_logging(&level_for(&settings.log_level, &ctx), &ctx)?;

    match cli.command {
        Commands::Run(args) => ruledist::cli_ext::dist_cmd::run(args, &settings, &ctx),
        Commands::Plan(args) => ruledist::cli_ext::dist_cmd::plan(args, &settings, &ctx),
        Commands::Init(args) => ruledist::infra::config::init(args, &ctx),
        Commands::Completions(args) => ruledist::completion::run(args, &ctx),
    }
}
