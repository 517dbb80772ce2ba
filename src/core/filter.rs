//! Filter engine and scope resolution.
//!
//! `passes` is a strict conjunction over the configured predicates, each of
//! which may be negated individually. A predicate kind this build does not
//! know fails the whole filter.

use tracing::debug;

use crate::core::frontmatter;
use crate::infra::rules::{FilterRule, Predicate, Scope};

/// Whether the engine narrates each predicate. Never affects the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narration {
    Verbose,
    Silent,
}

/// Evaluate one predicate; `None` for an unknown kind.
pub fn evaluate(predicate: &Predicate, content: &str) -> Option<bool> {
    match predicate {
        Predicate::FrontmatterHas { fields } => Some(frontmatter::has_fields(content, fields)),
        Predicate::Unknown(_) => None,
    }
}

/// All predicates must hold (after their own negation).
pub fn passes<'a, I>(filters: I, content: &str, narration: Narration) -> bool
where
    I: IntoIterator<Item = &'a FilterRule>,
{
    let verbose = narration == Narration::Verbose;

    for (i, rule) in filters.into_iter().enumerate() {
        let label = rule
            .description
            .clone()
            .unwrap_or_else(|| format!("filter {}", i + 1));

        let Some(raw) = evaluate(&rule.predicate, content) else {
            if verbose {
                debug!(filter = %label, predicate = ?rule.predicate, "unknown filter kind, failing closed");
            }
            return false;
        };

        let passed = raw != rule.negate;
        if !passed {
            if verbose {
                let reason = if rule.negate {
                    "negated predicate held"
                } else {
                    "header block missing or lacks fields"
                };
                debug!(filter = %label, reason, "filter rejected document");
            }
            return false;
        }

        if verbose {
            debug!(filter = %label, "filter passed");
        }
    }

    true
}

/// Does a rule with this scope apply to `task_name`?
pub fn applies(scope: &Scope, task_name: &str) -> bool {
    match scope {
        Scope::Always => true,
        Scope::Only(tasks) => tasks.iter().any(|t| t == "*" || t == task_name),
        Scope::Except(tasks) => !tasks.iter().any(|t| t == task_name),
    }
}
