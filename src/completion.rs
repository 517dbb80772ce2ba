//! Shell completion scripts for `rdist`.
//!
//! Scripts go to stdout with `--stdout`, otherwise into `--out-dir`
//! (the current directory when omitted) under the file name clap_complete
//! picks for the shell, e.g. `rdist.bash` or `_rdist`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate, generate_to};
use tracing::{info, instrument};

use crate::cli::{AppContext, Cli, CompletionsArgs};

const BIN_NAME: &str = "rdist";

#[instrument(skip_all, fields(shell = %args.shell))]
pub fn run(
    args: CompletionsArgs,
    ctx: &AppContext,
) -> Result<()> {
    if args.stdout {
        return write_script(args.shell, &mut std::io::stdout().lock());
    }

    let dir = args
        .out_dir
        .unwrap_or_else(|| PathBuf::from("."));
    let path = write_file(args.shell, &dir)?;

    info!(path = %path.display(), "wrote completion script");
    if !ctx.quiet {
        println!("Wrote completion to {}", path.display());
    }
    Ok(())
}

/// Stream the script for `shell` into `out`.
pub fn write_script(
    shell: Shell,
    out: &mut dyn Write,
) -> Result<()> {
    generate(shell, &mut Cli::command(), BIN_NAME, out);
    out.flush()
        .context("flush completion script")
}

/// Write the script for `shell` into `dir`, creating it first, and return
/// the file's path.
pub fn write_file(
    shell: Shell,
    dir: &Path,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create completion directory {}", dir.display()))?;
    generate_to(shell, &mut Cli::command(), BIN_NAME, dir)
        .with_context(|| format!("generate {shell} completion in {}", dir.display()))
}
