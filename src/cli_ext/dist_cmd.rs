//! CLI command handlers for `run` and `plan`.
//!
//! Both resolve the rule document and the source root the same way, then
//! hand over to the orchestrator. Only fatal configuration problems turn
//! into an error exit; task failures end up in the printed summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use tabled::{Table, Tabled};
use tracing::{info, instrument};

use crate::cli::{AppContext, PlanArgs, RunArgs, SourceArgs};
use crate::core::distribute::{Distributor, RunReport};
use crate::core::settings::builtin_hooks;
use crate::infra::config::Config;
use crate::infra::io::Removed;
use crate::infra::rules::load_rules;
use crate::infra::walk::FileWalker;

/// Resolved inputs of a distribution run
#[derive(Debug)]
pub struct Session
{
    /// Directory identities are relative to
    pub root: Utf8PathBuf,
    pub rules_file: PathBuf,
}

impl Session
{
    /// `--config` falls back to the settings' `rules_file`, `--root` to the
    /// current directory.
    pub fn resolve(
        source: &SourceArgs,
        settings: &Config,
    ) -> Result<Self>
    {
        let rules_file = source
            .config
            .clone()
            .unwrap_or_else(|| settings.rules_file.clone());

        let root = source
            .root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let root = dunce::canonicalize(&root)
            .with_context(|| format!("Source root {} is not accessible", root.display()))?;
        let root = Utf8PathBuf::from_path_buf(root)
            .map_err(|p| anyhow!("Source root {} is not valid UTF-8", p.display()))?;

        Ok(Self { root, rules_file })
    }

    fn distributor(
        &self,
        settings: &Config,
        ctx: &AppContext,
    ) -> Result<Distributor>
    {
        let rules = load_rules(&self.rules_file)?;
        let walker = FileWalker::new(&settings.ignore_patterns)?
            .with_ignore_files(settings.respect_ignore_files)
            .with_follow_symlinks(settings.follow_symlinks);

        Ok(Distributor::new(rules, self.root.as_std_path(), walker)
            .with_hooks(builtin_hooks())
            .with_dry_run(ctx.dry_run))
    }
}

#[instrument(skip_all)]
pub fn run(
    args: RunArgs,
    settings: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::resolve(&args.source, settings)?;
    let distributor = session.distributor(settings, ctx)?;
    info!(root = %session.root, rules = %session.rules_file.display(), "loaded rule document");

    let report = distributor.run();

    if !ctx.quiet
    {
        print_summary(&report, distributor.workpath(), ctx);
    }
    Ok(())
}

#[derive(Tabled)]
struct PlanRow
{
    task: String,
    source: String,
    target: String,
}

#[instrument(skip_all)]
pub fn plan(
    args: PlanArgs,
    settings: &Config,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::resolve(&args.source, settings)?;
    let table = session
        .distributor(settings, ctx)?
        .plan();

    if let Some(name) = &args.task
    {
        if table
            .task(name)
            .is_none()
        {
            anyhow::bail!("No task named `{}` in {}", name, session.rules_file.display());
        }
    }

    let selected = table
        .iter()
        .filter(|(name, _)| {
            args.task
                .as_deref()
                .is_none_or(|wanted| wanted == *name)
        });

    if args.json
    {
        let value: IndexMap<&str, _> = selected.collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let rows: Vec<PlanRow> = selected
        .flat_map(|(name, mapping)| {
            mapping
                .iter()
                .map(move |(id, target)| PlanRow {
                    task: name.to_string(),
                    source: id.to_string(),
                    target: target.clone(),
                })
        })
        .collect();

    if rows.is_empty()
    {
        if !ctx.quiet
        {
            println!("No documents mapped.");
        }
        return Ok(());
    }

    println!("{}", Table::new(rows));
    Ok(())
}

fn print_summary(
    report: &RunReport,
    workpath: &Path,
    ctx: &AppContext,
)
{
    let paint = !ctx.no_color;
    let heading = if ctx.dry_run { "DRY RUN: would distribute into" } else { "Distributed into" };
    if paint
    {
        println!("{} {}", heading.bold(), workpath.display());
    }
    else
    {
        println!("{} {}", heading, workpath.display());
    }

    for (entry, removed) in &report.cleaned
    {
        if *removed != Removed::Missing
        {
            println!("  cleaned {}", entry);
        }
    }

    for task in &report.tasks
    {
        let line = match &task.error
        {
            Some(error) => format!("  ✗ {}: {}", task.name, error),
            None => format!(
                "  ✓ {}: {} written, {} skipped, {} failed",
                task.name, task.written, task.skipped, task.failed
            ),
        };

        match (paint, task.is_ok() && task.failed == 0)
        {
            (false, _) => println!("{}", line),
            (true, true) => println!("{}", line.green()),
            (true, false) => println!("{}", line.red()),
        }

        if let Some(settings) = &task.settings
        {
            println!("    settings: {}", settings.display());
        }
    }

    let total = format!("{} documents across {} tasks", report.written(), report.tasks.len());
    if paint
    {
        println!("{}", total.dimmed());
    }
    else
    {
        println!("{}", total);
    }
}
