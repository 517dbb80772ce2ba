//! Target naming.
//!
//! `target_path` is the single place where a unit's target descriptor turns
//! into a path under the workpath. The precompute pass and the write pass
//! both call it, so a link pointing at a precomputed path always points at
//! the file that actually gets written.

use crate::core::identity::DocId;
use crate::infra::rules::{ApplyTo, DistributionUnit, NamePart, RenameRule};

/// Lowercase, then apply the literal replacements in order.
fn fold(name: String, rule: &RenameRule) -> String {
    let mut out = if rule.lowercase { name.to_lowercase() } else { name };
    for r in &rule.replacements {
        out = out.replace(&r.from, &r.to);
    }
    out
}

/// Base name (no extension) derived from `id` under `rule`.
pub fn derive_name(id: &DocId, rule: &RenameRule) -> String {
    let name = if rule.foldername {
        id.parent_name().to_string()
    } else {
        rule.combine
            .iter()
            .filter_map(|part| match part {
                NamePart::Filename => Some(id.stem()),
                NamePart::ParentDir => Some(id.parent_name()),
                NamePart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("-")
    };

    if rule.apply_to.contains(&ApplyTo::File) {
        fold(name, rule)
    } else {
        name
    }
}

/// Parent directory name as folded into the target directory.
pub fn derive_parent_name(parent: &str, rule: &RenameRule) -> String {
    if rule.apply_to.contains(&ApplyTo::Parent) || rule.apply_to_parent_dir {
        fold(parent.to_string(), rule)
    } else {
        parent.to_string()
    }
}

/// Target file name for `id` under `unit`.
pub fn target_name(id: &DocId, unit: &DistributionUnit) -> String {
    if let Some(literal) = &unit.rename {
        return literal.clone();
    }

    match &unit.rename_rule {
        Some(rule) if rule.apply_to.contains(&ApplyTo::File) || rule.foldername => {
            let base = derive_name(id, rule);
            match &unit.suffix {
                Some(suffix) => format!("{base}.{suffix}"),
                None => format!("{base}{}", id.suffix()),
            }
        }
        _ => id.file_name().to_string(),
    }
}

/// Target directory for `id` under `unit`, relative to the workpath.
pub fn target_dir(id: &DocId, unit: &DistributionUnit) -> String {
    let copy = unit.copy.trim_end_matches('/');

    if !unit.use_parent_dir {
        return copy.to_string();
    }

    let parent = match &unit.rename_rule {
        Some(rule) => derive_parent_name(id.parent_name(), rule),
        None => id.parent_name().to_string(),
    };

    if copy.is_empty() {
        parent
    } else {
        format!("{copy}/{parent}")
    }
}

/// Full target path of `id` relative to the workpath.
pub fn target_path(id: &DocId, unit: &DistributionUnit) -> String {
    let dir = target_dir(id, unit);
    let name = target_name(id, unit);
    if dir.is_empty() { name } else { format!("{dir}/{name}") }
}
