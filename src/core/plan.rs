//! Path precomputation.
//!
//! Before any document is rewritten, every task's units are matched and
//! filtered and every surviving document gets its target path. The result
//! is an immutable `PathTable` that the content phase only reads, which is
//! what lets a link in one task point at a document another task has not
//! written yet.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::filter::{self, Narration};
use crate::core::identity::DocId;
use crate::core::matcher::Matcher;
use crate::core::rename;
use crate::infra::io::read_document;
use crate::infra::rules::Task;

/// Read access to precomputed target paths.
pub trait PathLookup {
    /// Target path (relative to the workpath) of `id` in `task`.
    fn target_path(&self, task: &str, id: &DocId) -> Option<&str>;
}

/// `task name -> (identity -> target path)`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PathTable {
    tasks: IndexMap<String, IndexMap<DocId, String>>,
}

impl PathTable {
    /// Mapping of one task, if the task exists.
    pub fn task(&self, name: &str) -> Option<&IndexMap<DocId, String>> {
        self.tasks.get(name)
    }

    /// Tasks in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexMap<DocId, String>)> {
        self.tasks.iter().map(|(name, map)| (name.as_str(), map))
    }

    /// Total number of mapped documents across tasks.
    pub fn len(&self) -> usize {
        self.tasks.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PathLookup for PathTable {
    fn target_path(&self, task: &str, id: &DocId) -> Option<&str> {
        self.tasks.get(task)?.get(id).map(String::as_str)
    }
}

/// Build the table for every task. Never writes and never mutates content.
pub fn build_table(tasks: &[Task], matcher: &Matcher) -> PathTable {
    let mut table = PathTable::default();

    for task in tasks {
        let mapping = task_mapping(task, matcher);
        info!(task = %task.name, files = mapping.len(), "precomputed path mapping");

        if table.tasks.insert(task.name.clone(), mapping).is_some() {
            warn!(task = %task.name, "duplicate task name, later definition wins");
        }
    }

    table
}

fn task_mapping(task: &Task, matcher: &Matcher) -> IndexMap<DocId, String> {
    let mut mapping = IndexMap::new();

    for (idx, unit) in task.distribute.iter().enumerate() {
        let Some(source) = &unit.source else {
            continue;
        };

        let docs = match matcher.collect(source) {
            Ok(docs) => docs,
            Err(e) => {
                // the content phase hits the same error and fails the task
                warn!(task = %task.name, unit = idx + 1, error = %e, "unit skipped during precompute");
                continue;
            }
        };

        for doc in docs {
            if !unit.filter.is_empty() {
                let admitted = match read_document(&doc.path) {
                    Ok(content) => filter::passes(&unit.filter, &content, Narration::Silent),
                    Err(_) => false,
                };
                if !admitted {
                    debug!(task = %task.name, id = %doc.id, "filtered out of mapping");
                    continue;
                }
            }

            let target = rename::target_path(&doc.id, unit);
            mapping.insert(doc.id, target);
        }
    }

    mapping
}
