//! Settings generation for downstream tools.
//!
//! After a task's documents are written, a hook selected by the task name may
//! derive a tool settings file from them. The built-in `PermissionsHook`
//! records one `Skill(<folder>)` permission per distributed skill.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::filter::{self, Narration};
use crate::core::frontmatter;
use crate::core::matcher::Matcher;
use crate::core::plan::PathLookup;
use crate::infra::io::{read_document, write_document};
use crate::infra::rules::{SourceEntry, SourceSpec, Task};

/// Reads one header field from a document
pub type FieldReader = fn(&str, &str) -> Option<String>;

/// Everything a hook may look at. Hooks never see unwritten content.
pub struct HookContext<'a> {
    pub task: &'a Task,
    pub lookup: &'a dyn PathLookup,
    pub matcher: &'a Matcher,
    pub workpath: &'a Path,
    pub field: FieldReader,
    pub dry_run: bool,
}

impl<'a> HookContext<'a> {
    pub fn new(task: &'a Task, lookup: &'a dyn PathLookup, matcher: &'a Matcher, workpath: &'a Path) -> Self {
        Self { task, lookup, matcher, workpath, field: frontmatter::field, dry_run: false }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

pub trait SettingsHook {
    /// Whether this hook handles `task_name`.
    fn accepts(&self, task_name: &str) -> bool;

    /// Produce the settings file; `Ok(None)` when the task asks for nothing.
    fn generate(&self, ctx: &HookContext<'_>) -> Result<Option<PathBuf>>;
}

/// `permissions` block of a settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub ask: Vec<String>,
}

impl Permissions {
    /// Record `entry` under `level`. Unknown levels are ignored.
    fn record(&mut self, level: &str, entry: String) {
        let bucket = match level {
            "allow" => &mut self.allow,
            "deny" => &mut self.deny,
            "ask" => &mut self.ask,
            other => {
                debug!(permission = other, %entry, "unknown permission level ignored");
                return;
            }
        };
        if !bucket.contains(&entry) {
            bucket.push(entry);
        }
    }
}

/// Skill permissions for agent tools that read `settings.local.json`.
#[derive(Debug, Clone)]
pub struct PermissionsHook {
    flavors: Vec<String>,
}

impl Default for PermissionsHook {
    fn default() -> Self {
        Self { flavors: vec!["claude".into(), "codebuddy".into()] }
    }
}

impl PermissionsHook {
    /// Collect permissions for every directory-sourced unit of the task.
    pub fn permissions(&self, ctx: &HookContext<'_>, default_permission: &str) -> Permissions {
        let mut permissions = Permissions::default();

        for unit in &ctx.task.distribute {
            let Some(source @ SourceSpec::Entry(SourceEntry::Directory { .. })) = &unit.source else {
                continue;
            };

            let docs = match ctx.matcher.collect(source) {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(task = %ctx.task.name, error = %e, "skipping unit for settings");
                    continue;
                }
            };

            for doc in docs {
                let Ok(content) = read_document(&doc.path) else {
                    continue;
                };
                if !filter::passes(&unit.filter, &content, Narration::Silent) {
                    continue;
                }

                let level = (ctx.field)(&content, "permission")
                    .unwrap_or_else(|| default_permission.to_string());

                let Some(target) = ctx.lookup.target_path(&ctx.task.name, &doc.id) else {
                    continue;
                };
                let parts: Vec<&str> = target.split('/').collect();
                if parts.len() >= 2 {
                    let skill = parts[parts.len() - 2];
                    permissions.record(&level, format!("Skill({skill})"));
                }
            }
        }

        permissions
    }
}

impl SettingsHook for PermissionsHook {
    fn accepts(&self, task_name: &str) -> bool {
        self.flavors.iter().any(|f| f.eq_ignore_ascii_case(task_name))
    }

    fn generate(&self, ctx: &HookContext<'_>) -> Result<Option<PathBuf>> {
        let Some(directive) = &ctx.task.generate_settings else {
            return Ok(None);
        };

        let permissions = self.permissions(ctx, &directive.default_permission);
        let path = ctx.workpath.join(&directive.target);

        // keep unrelated keys of an existing file
        let mut settings = match read_document(&path) {
            Ok(text) => match serde_json::from_str::<Map<String, Value>>(&text) {
                Ok(map) => map,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "existing settings unreadable, starting empty");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        settings.insert("permissions".into(), serde_json::to_value(&permissions)?);

        info!(
            task = %ctx.task.name,
            target = %directive.target,
            allow = permissions.allow.len(),
            deny = permissions.deny.len(),
            ask = permissions.ask.len(),
            "generated settings"
        );

        if ctx.dry_run {
            return Ok(Some(path));
        }

        let text = serde_json::to_string_pretty(&Value::Object(settings))
            .context("Failed to serialize settings")?;
        write_document(&path, &text)?;
        Ok(Some(path))
    }
}

/// Hooks shipped with the binary.
pub fn builtin_hooks() -> Vec<Box<dyn SettingsHook>> {
    vec![Box::new(PermissionsHook::default())]
}
