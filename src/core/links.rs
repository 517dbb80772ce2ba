//! Relative link rewriting.
//!
//! Links of the shape `[text](./relative/path)` are resolved against the
//! linking document's directory and looked up in the precomputed path table.
//! Unresolvable or unmapped links are left exactly as written.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::identity::DocId;
use crate::core::plan::PathLookup;
use crate::infra::rules::LinkRule;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(\./([^)]+)\)")
        .unwrap_or_else(|e| unreachable!("link pattern is valid: {e}"))
});

/// Last two segments of `target`, or the only one.
fn display_text(target: &str) -> String {
    let parts: Vec<&str> = target.split('/').collect();
    let tail = parts.len().saturating_sub(2);
    parts[tail..].join("/")
}

/// Rewrite every relative link in `content` written by `source`.
pub fn rewrite_links(
    content: &str,
    source: &DocId,
    rule: &LinkRule,
    lookup: &dyn PathLookup,
) -> String {
    LINK_RE
        .replace_all(content, |caps: &Captures| {
            let whole = caps[0].to_string();
            let text = &caps[1];
            let rel = &caps[2];

            let Some(referenced) = source.resolve_relative(rel) else {
                return whole;
            };
            let Some(target) = lookup.target_path(&rule.target_task, &referenced) else {
                return whole;
            };

            let new_text = if rule.rewrite_text { display_text(target) } else { text.to_string() };
            format!("[{new_text}]({}/{target})", rule.link_prefix)
        })
        .into_owned()
}
