//! Content rule engine.
//!
//! For one task, the configured rule groups are narrowed to the rules in
//! scope. A document is then run through every group whose pattern matches
//! its identity, in configuration order, each group gated by its own
//! filters. Operations inside a group see the output of the previous one.
//! A failing operation is reported and skipped; it never aborts the document.

use globset::Glob;
use indexmap::IndexMap;
use regex::RegexBuilder;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::filter::{self, Narration};
use crate::core::identity::DocId;
use crate::core::links;
use crate::core::plan::PathLookup;
use crate::infra::rules::{FilterRule, Operation, ProcessRule, RuleGroup};

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid regular expression")]
    InvalidRegex(#[from] regex::Error),

    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
}

/// A rule group narrowed to one task
#[derive(Debug)]
pub struct ActiveGroup<'a> {
    pub pattern: &'a str,
    pub filter: Vec<&'a FilterRule>,
    pub process: Vec<&'a ProcessRule>,
}

/// The rule groups that apply to one task, in configuration order.
#[derive(Debug, Default)]
pub struct TaskRules<'a> {
    groups: Vec<ActiveGroup<'a>>,
}

impl<'a> TaskRules<'a> {
    pub fn for_task(content_rules: &'a IndexMap<String, RuleGroup>, task_name: &str) -> Self {
        let groups = content_rules
            .iter()
            .filter(|(_, group)| filter::applies(&group.scope, task_name))
            .filter_map(|(pattern, group)| {
                let process: Vec<_> =
                    group.process.iter().filter(|r| filter::applies(&r.scope, task_name)).collect();
                let filter: Vec<_> =
                    group.filter.iter().filter(|r| filter::applies(&r.scope, task_name)).collect();

                if process.is_empty() && filter.is_empty() {
                    None
                } else {
                    Some(ActiveGroup { pattern: pattern.as_str(), filter, process })
                }
            })
            .collect();

        Self { groups }
    }

    /// Number of filter and process rules in scope.
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.filter.len() + g.process.len()).sum()
    }

    /// Groups applying to `id`: the exact key first, then wildcard patterns.
    pub fn matching(&self, id: &DocId) -> Vec<&ActiveGroup<'a>> {
        let exact = self.groups.iter().filter(|g| g.pattern == id.as_str());
        let wild = self
            .groups
            .iter()
            .filter(|g| g.pattern != id.as_str() && pattern_matches(g.pattern, id));
        exact.chain(wild).collect()
    }

    /// Run every matching group over `content`.
    pub fn transform(&self, id: &DocId, content: String, lookup: Option<&dyn PathLookup>) -> String {
        let groups = self.matching(id);
        if groups.is_empty() {
            return content;
        }
        debug!(%id, groups = groups.len(), "applying content rules");

        groups.into_iter().fold(content, |content, group| {
            if !filter::passes(group.filter.iter().copied(), &content, Narration::Verbose) {
                debug!(%id, pattern = group.pattern, "group filters not met, skipping group");
                return content;
            }
            apply_operations(group.process.iter().copied(), content, id, lookup)
        })
    }
}

/// Wildcard pattern test used beside exact key matching.
///
/// `prefix/**...` matches identities starting with `prefix`. A single `*`
/// pattern uses everything before its last `/` as the prefix. Without any
/// directory part the bare file name is matched against the pattern, so
/// `*.md` hits same-named files in every directory. A bare name never holds
/// a `/`, so `**/*.md` with nothing before it matches no document.
pub fn pattern_matches(pattern: &str, id: &DocId) -> bool {
    if !pattern.contains('*') {
        return false;
    }

    let prefix = match pattern.split_once("**") {
        Some((head, _)) => head.trim_end_matches('/'),
        None => pattern.rsplit_once('/').map(|(head, _)| head).unwrap_or(""),
    };

    if !prefix.is_empty() {
        return id.as_str().starts_with(prefix);
    }
    if pattern.contains('/') {
        return false;
    }

    match Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(id.file_name()),
        Err(e) => {
            warn!(pattern, error = %e, "content rule pattern is not a valid glob");
            false
        }
    }
}

/// Apply `rules` in order; each sees the previous result.
pub fn apply_operations<'r, I>(
    rules: I,
    content: String,
    id: &DocId,
    lookup: Option<&dyn PathLookup>,
) -> String
where
    I: IntoIterator<Item = &'r ProcessRule>,
{
    rules.into_iter().fold(content, |content, rule| {
        match apply_operation(&rule.operation, &content, id, lookup) {
            Ok(Some(next)) if next != content => {
                debug!(%id, rule = rule.label(), "applied");
                next
            }
            Ok(_) => {
                debug!(%id, rule = rule.label(), "not matched");
                content
            }
            Err(e) => {
                warn!(%id, rule = rule.label(), error = %e, "rule failed, left content unchanged");
                content
            }
        }
    })
}

/// `Ok(None)` means the operation did not run (nothing to do).
fn apply_operation(
    op: &Operation,
    content: &str,
    id: &DocId,
    lookup: Option<&dyn PathLookup>,
) -> Result<Option<String>, OperationError> {
    match op {
        Operation::AppendStart { content: extra } if !extra.is_empty() => {
            Ok(Some(format!("{extra}{content}")))
        }
        Operation::AppendEnd { content: extra } if !extra.is_empty() => {
            Ok(Some(format!("{content}{extra}")))
        }
        Operation::AppendStart { .. } | Operation::AppendEnd { .. } => Ok(None),
        Operation::Replace { pattern: Some(pattern), replacement, flags } => {
            let re = build_regex(pattern, flags)?;
            let replacement = translate_replacement(replacement);
            Ok(Some(re.replace_all(content, replacement.as_str()).into_owned()))
        }
        Operation::Replace { pattern: None, .. } => Ok(None),
        Operation::RewriteLinks(rule) => {
            Ok(lookup.map(|lookup| links::rewrite_links(content, id, rule, lookup)))
        }
        Operation::Unknown(name) => Err(OperationError::UnknownOperation(name.clone())),
    }
}

fn build_regex(pattern: &str, flags: &[String]) -> Result<regex::Regex, regex::Error> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags {
        match flag.as_str() {
            "DOTALL" => builder.dot_matches_new_line(true),
            "MULTILINE" => builder.multi_line(true),
            "IGNORECASE" => builder.case_insensitive(true),
            other => {
                warn!(flag = other, "ignoring unknown regex flag");
                &mut builder
            }
        };
    }
    builder.build()
}

/// Translate backslash-style replacement syntax (`\1`, `\g<name>`, `\n`)
/// into the regex crate's `${..}` form. Literal `$` is escaped.
pub fn translate_replacement(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    let mut group = String::new();
                    while group.len() < 2 {
                        match chars.peek() {
                            Some(d) if d.is_ascii_digit() => {
                                group.push(*d);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    out.push_str(&format!("${{{group}}}"));
                }
                Some('g') => {
                    let mut ahead = chars.clone();
                    ahead.next();
                    if ahead.next() == Some('<') {
                        let name: String = ahead.by_ref().take_while(|&ch| ch != '>').collect();
                        chars = ahead;
                        out.push_str(&format!("${{{name}}}"));
                    } else {
                        out.push('\\');
                    }
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some('r') => {
                    chars.next();
                    out.push('\r');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            other => out.push(other),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::rules::{LinkRule, Predicate, Scope};
    use crate::core::plan::PathTable;

    fn op(operation: Operation) -> ProcessRule {
        ProcessRule::new(operation)
    }

    fn replace(pattern: &str, replacement: &str, flags: &[&str]) -> ProcessRule {
        op(Operation::Replace {
            pattern: Some(pattern.into()),
            replacement: replacement.into(),
            flags: flags.iter().map(|f| f.to_string()).collect(),
        })
    }

    fn group(process: Vec<ProcessRule>) -> RuleGroup {
        RuleGroup { filter: Vec::new(), process, scope: Scope::Always }
    }

    #[test]
    fn test_glob_prefix_matching() {
        assert!(pattern_matches("docs/**/*.md", &DocId::new("docs/a/b/c.md")));
        assert!(!pattern_matches("docs/**/*.md", &DocId::new("other/a.md")));
        assert!(pattern_matches("docs/*.md", &DocId::new("docs/x.md")));
        assert!(pattern_matches("*.md", &DocId::new("deep/dir/x.md")));
        assert!(!pattern_matches("*.md", &DocId::new("deep/dir/x.txt")));
        assert!(pattern_matches("SKILL*", &DocId::new("skills/a/SKILL.md")));
        assert!(!pattern_matches("docs/a.md", &DocId::new("docs/a.md")));
    }

    #[test]
    fn test_rootless_double_star_matches_nothing() {
        assert!(!pattern_matches("**/*.md", &DocId::new("a/SKILL.md")));
        assert!(!pattern_matches("**/*.md", &DocId::new("top.md")));
        assert!(!pattern_matches("*/SKILL.md", &DocId::new("skills/SKILL.md")));

        let mut rules = IndexMap::new();
        rules.insert("**/*.md".to_string(), group(vec![op(Operation::AppendEnd { content: "!".into() })]));
        let task = TaskRules::for_task(&rules, "claude");
        assert_eq!(task.transform(&DocId::new("a/b.md"), "body".into(), None), "body");
    }

    #[test]
    fn test_exact_then_wildcard_order() {
        let mut rules = IndexMap::new();
        rules.insert("*.md".to_string(), group(vec![op(Operation::AppendEnd { content: "[w]".into() })]));
        rules.insert("a/b.md".to_string(), group(vec![op(Operation::AppendEnd { content: "[e]".into() })]));
        rules.insert("other.md".to_string(), group(vec![op(Operation::AppendEnd { content: "[x]".into() })]));

        let task = TaskRules::for_task(&rules, "claude");
        let out = task.transform(&DocId::new("a/b.md"), "body".into(), None);
        assert_eq!(out, "body[e][w]");
    }

    #[test]
    fn test_scope_narrows_groups_and_rules() {
        let mut rules = IndexMap::new();
        let mut scoped = op(Operation::AppendStart { content: "C:".into() });
        scoped.scope = Scope::Only(vec!["claude".into()]);
        let mut excluded = op(Operation::AppendEnd { content: ":!cursor".into() });
        excluded.scope = Scope::Except(vec!["cursor".into()]);
        rules.insert("*.md".to_string(), group(vec![scoped, excluded]));
        rules.insert(
            "x.md".to_string(),
            RuleGroup {
                scope: Scope::Only(vec!["codex".into()]),
                ..group(vec![op(Operation::AppendEnd { content: "!".into() })])
            },
        );

        let id = DocId::new("x.md");
        assert_eq!(TaskRules::for_task(&rules, "claude").transform(&id, "b".into(), None), "C:b:!cursor");
        assert_eq!(TaskRules::for_task(&rules, "cursor").transform(&id, "b".into(), None), "b");
        assert_eq!(TaskRules::for_task(&rules, "codex").transform(&id, "b".into(), None), "b!:!cursor");
        assert_eq!(TaskRules::for_task(&rules, "cursor").rule_count(), 0);
    }

    #[test]
    fn test_group_filter_skips_only_that_group() {
        let mut rules = IndexMap::new();
        rules.insert(
            "skills/**".to_string(),
            RuleGroup {
                filter: vec![FilterRule {
                    predicate: Predicate::FrontmatterHas { fields: vec!["name".into()] },
                    negate: false,
                    description: None,
                    scope: Scope::Always,
                }],
                ..group(vec![op(Operation::AppendEnd { content: "[skill]".into() })])
            },
        );
        rules.insert("*.md".to_string(), group(vec![op(Operation::AppendEnd { content: "[any]".into() })]));

        let task = TaskRules::for_task(&rules, "t");
        let id = DocId::new("skills/a/SKILL.md");
        assert_eq!(task.transform(&id, "plain".into(), None), "plain[any]");
        assert_eq!(
            task.transform(&id, "---\nname: a\n---\n".into(), None),
            "---\nname: a\n---\n[skill][any]"
        );
    }

    #[test]
    fn test_replace_flags_and_order() {
        let id = DocId::new("a.md");
        let rules = [
            replace("^title", "Title", &["MULTILINE", "IGNORECASE"]),
            replace("<!--.*-->", "", &["DOTALL"]),
            replace("Title", "Heading", &[]),
        ];
        let out = apply_operations(&rules, "x\nTITLE one\n<!-- a\nb -->end".into(), &id, None);
        assert_eq!(out, "x\nHeading one\nend");
    }

    #[test]
    fn test_failing_rule_is_isolated() {
        let id = DocId::new("a.md");
        let rules = [
            op(Operation::AppendStart { content: "1".into() }),
            replace("(unclosed", "x", &[]),
            op(Operation::Unknown("shout".into())),
            op(Operation::AppendEnd { content: "2".into() }),
            op(Operation::AppendEnd { content: String::new() }),
            op(Operation::Replace { pattern: None, replacement: "x".into(), flags: vec![] }),
        ];
        assert_eq!(apply_operations(&rules, "-".into(), &id, None), "1-2");
    }

    #[test]
    fn test_link_rewrite_needs_lookup() {
        let id = DocId::new("README.md");
        let rules = [op(Operation::RewriteLinks(LinkRule::default()))];
        let text = "[a](./a.md)";

        assert_eq!(apply_operations(&rules, text.into(), &id, None), text);

        let table = PathTable::default();
        assert_eq!(apply_operations(&rules, text.into(), &id, Some(&table)), text);
    }

    #[test]
    fn test_backreference_translation() {
        assert_eq!(translate_replacement(r"\1-\2"), "${1}-${2}");
        assert_eq!(translate_replacement(r"\g<name>!"), "${name}!");
        assert_eq!(translate_replacement(r"cost: $5\n"), "cost: $$5\n");
        assert_eq!(translate_replacement(r"a\\b"), r"a\b");

        let id = DocId::new("a.md");
        let rules = [replace(r"(\w+)@(\w+)", r"\2 at \1", &[])];
        assert_eq!(apply_operations(&rules, "me@host".into(), &id, None), "host at me");
    }
}
