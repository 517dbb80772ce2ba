//! Distribution orchestrator.
//!
//! A run cleans the configured targets, precomputes the path table for every
//! task, then walks tasks, units and matched documents in order, writing each
//! transformed document to its precomputed place. Document failures skip the
//! document; task failures skip the rest of the task.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::core::filter::{self, Narration};
use crate::core::identity::DocId;
use crate::core::matcher::Matcher;
use crate::core::plan::{self, PathLookup, PathTable};
use crate::core::rename;
use crate::core::rules::{self, TaskRules};
use crate::core::settings::{HookContext, SettingsHook};
use crate::infra::io::{Removed, read_document, remove_path, write_document};
use crate::infra::rules::{RulesConfig, Task};
use crate::infra::walk::FileWalker;

/// Outcome of one task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub name: String,
    /// Documents written (or that would be written on a dry run)
    pub written: usize,
    /// Documents turned away by unit filters
    pub skipped: usize,
    /// Documents that could not be read or written
    pub failed: usize,
    pub settings: Option<PathBuf>,
    /// Set when the task was aborted or its settings could not be generated
    pub error: Option<String>,
}

impl TaskReport {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub cleaned: Vec<(String, Removed)>,
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.tasks.iter().map(|t| t.written).sum()
    }

    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskReport> {
        self.tasks.iter().filter(|t| !t.is_ok())
    }

    pub fn is_success(&self) -> bool {
        self.tasks.iter().all(|t| t.is_ok() && t.failed == 0)
    }
}

pub struct Distributor {
    config: RulesConfig,
    workpath: PathBuf,
    matcher: Matcher,
    hooks: Vec<Box<dyn SettingsHook>>,
    dry_run: bool,
}

impl Distributor {
    /// Sources resolve against `root`; targets against `root/workpath`.
    pub fn new(config: RulesConfig, root: impl Into<PathBuf>, walker: FileWalker) -> Self {
        let root = root.into();
        let workpath = root.join(&config.workpath);
        Self {
            config,
            workpath,
            matcher: Matcher::new(root, walker),
            hooks: Vec::new(),
            dry_run: false,
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<Box<dyn SettingsHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Compute everything but write and delete nothing.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn workpath(&self) -> &Path {
        &self.workpath
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Precompute the path table without touching the tree.
    pub fn plan(&self) -> PathTable {
        plan::build_table(&self.config.tasks, &self.matcher)
    }

    /// Remove every `cleanpath` entry under the workpath.
    pub fn clean(&self) -> Vec<(String, Removed)> {
        let mut cleaned = Vec::new();

        for entry in &self.config.cleanpath {
            let normalized = DocId::new(entry);
            if Path::new(entry).is_absolute() || normalized.as_str().starts_with("..") {
                warn!(entry = %entry, "clean path leaves the workpath, ignored");
                continue;
            }

            let path = self.workpath.join(normalized.as_str());
            if self.dry_run {
                let found = if path.is_dir() {
                    Removed::Directory
                } else if path.exists() {
                    Removed::File
                } else {
                    Removed::Missing
                };
                info!(path = %path.display(), "would remove");
                cleaned.push((entry.clone(), found));
                continue;
            }

            match remove_path(&path) {
                Ok(Removed::Missing) => {
                    debug!(path = %path.display(), "nothing to clean");
                    cleaned.push((entry.clone(), Removed::Missing));
                }
                Ok(kind) => {
                    info!(path = %path.display(), ?kind, "cleaned");
                    cleaned.push((entry.clone(), kind));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "clean failed"),
            }
        }

        cleaned
    }

    /// Clean, precompute, then distribute every task.
    pub fn run(&self) -> RunReport {
        info!(
            workpath = %self.workpath.display(),
            tasks = self.config.tasks.len(),
            dry_run = self.dry_run,
            "starting distribution"
        );

        let cleaned = self.clean();
        let table = self.plan();

        let tasks = self
            .config
            .tasks
            .iter()
            .map(|task| match self.run_task(task, &table) {
                Ok(report) => {
                    info!(task = %task.name, written = report.written, "task finished");
                    report
                }
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(task = %task.name, error = %message, "task failed");
                    TaskReport { error: Some(message), ..TaskReport::named(&task.name) }
                }
            })
            .collect();

        RunReport { cleaned, tasks }
    }

    fn run_task(&self, task: &Task, table: &PathTable) -> Result<TaskReport> {
        let task_rules = TaskRules::for_task(&self.config.content_rules, &task.name);
        let mut report = TaskReport::named(&task.name);
        info!(task = %task.name, units = task.distribute.len(), rules = task_rules.rule_count(), "running task");

        for (idx, unit) in task.distribute.iter().enumerate() {
            let Some(source) = &unit.source else {
                debug!(task = %task.name, unit = idx + 1, "unit has no source");
                continue;
            };

            let docs = self
                .matcher
                .collect(source)
                .with_context(|| format!("unit {} of task `{}`", idx + 1, task.name))?;
            info!(task = %task.name, unit = idx + 1, matched = docs.len(), "collected sources");

            for doc in docs {
                let content = match read_document(&doc.path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "read failed, skipping");
                        report.failed += 1;
                        continue;
                    }
                };

                if !filter::passes(&unit.filter, &content, Narration::Verbose) {
                    debug!(id = %doc.id, "unit filters not met");
                    report.skipped += 1;
                    continue;
                }

                let lookup: &dyn PathLookup = table;
                let content = task_rules.transform(&doc.id, content, Some(lookup));
                // unit-level operations run without a link rewriter
                let content = rules::apply_operations(&unit.process, content, &doc.id, None);

                let target = rename::target_path(&doc.id, unit);
                let dest = self.workpath.join(&target);

                if self.dry_run {
                    debug!(id = %doc.id, target = %target, "would write");
                    report.written += 1;
                    continue;
                }

                match write_document(&dest, &content) {
                    Ok(()) => {
                        debug!(id = %doc.id, target = %target, "written");
                        report.written += 1;
                    }
                    Err(e) => {
                        warn!(id = %doc.id, error = %e, "write failed, skipping");
                        report.failed += 1;
                    }
                }
            }
        }

        if let Some(hook) = self.hooks.iter().find(|h| h.accepts(&task.name)) {
            let ctx = HookContext::new(task, table, &self.matcher, &self.workpath).dry_run(self.dry_run);
            match hook.generate(&ctx) {
                Ok(path) => report.settings = path,
                Err(e) => {
                    let message = format!("{:#}", e.context(format!("settings for task `{}`", task.name)));
                    warn!(task = %task.name, error = %message, "settings generation failed");
                    report.error = Some(message);
                }
            }
        }

        Ok(report)
    }
}
