//! Source matching.
//!
//! Turns a unit's source descriptor into the ordered, deduplicated list of
//! documents it covers. Anything that does not exist simply matches nothing,
//! so a partially populated source tree never aborts a run.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use thiserror::Error;
use tracing::{trace, warn};

use crate::core::identity::DocId;
use crate::infra::rules::{SourceEntry, SourceSpec};
use crate::infra::walk::FileWalker;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid source pattern `{pattern}`")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// A matched document: where it is on disk and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    pub path: PathBuf,
    pub id: DocId,
}

pub struct Matcher {
    root: PathBuf,
    walker: FileWalker,
}

/// Glob where `*` stays inside one path segment and `**` spans segments.
fn segment_glob(pattern: &str) -> Result<GlobMatcher, MatchError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source| MatchError::InvalidPattern { pattern: pattern.to_string(), source })
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Drop leading `./` and unify separators, leaving wildcards intact.
fn tidy_pattern(pattern: &str) -> String {
    let mut p = pattern.replace('\\', "/");
    while let Some(rest) = p.strip_prefix("./") {
        p = rest.to_string();
    }
    p
}

impl Matcher {
    pub fn new(root: impl Into<PathBuf>, walker: FileWalker) -> Self {
        Self { root: root.into(), walker }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Documents covered by `source`, sorted by identity.
    pub fn collect(&self, source: &SourceSpec) -> Result<Vec<Matched>, MatchError> {
        let mut found = match source {
            SourceSpec::Path(raw) if raw.contains('*') => self.collect_glob(raw)?,
            SourceSpec::Path(raw) => self.collect_file(raw),
            SourceSpec::Entry(SourceEntry::File { path }) => self.collect_file(path),
            SourceSpec::Entry(SourceEntry::Directory { path, pattern }) => {
                self.collect_dir(path, pattern)?
            }
            SourceSpec::Entry(SourceEntry::Unsupported) => {
                warn!("source descriptor has an unsupported type, matching nothing");
                Vec::new()
            }
        };

        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        trace!(count = found.len(), ?source, "collected source");
        Ok(found)
    }

    fn matched(&self, path: PathBuf) -> Matched {
        let id = DocId::from_path(&path, &self.root);
        Matched { path, id }
    }

    fn collect_file(&self, raw: &str) -> Vec<Matched> {
        let path = self.root.join(raw);
        if !path.is_file() {
            return Vec::new();
        }
        if Path::new(raw).is_absolute() {
            vec![self.matched(path)]
        } else {
            vec![Matched { path, id: DocId::new(raw) }]
        }
    }

    /// Glob relative to the root. Only the literal leading segments are walked.
    fn collect_glob(&self, raw: &str) -> Result<Vec<Matched>, MatchError> {
        let pattern = tidy_pattern(raw);
        let glob = segment_glob(&pattern)?;

        let base: Vec<&str> = pattern
            .split('/')
            .take_while(|seg| !has_glob_meta(seg))
            .collect();
        let start = self.root.join(base.join("/"));

        Ok(self
            .walker
            .walk_files(&start)
            .into_iter()
            .map(|path| self.matched(path))
            .filter(|m| glob.is_match(m.id.as_str()))
            .collect())
    }

    fn collect_dir(&self, dir: &str, pattern: &str) -> Result<Vec<Matched>, MatchError> {
        let glob = segment_glob(&tidy_pattern(pattern))?;
        let dir_path = self.root.join(dir);
        let absolute = Path::new(dir).is_absolute();

        Ok(self
            .walker
            .walk_files(&dir_path)
            .into_iter()
            .filter_map(|path| {
                let rel = DocId::from_path(&path, &dir_path);
                if !glob.is_match(rel.as_str()) {
                    return None;
                }
                if absolute {
                    Some(self.matched(path))
                } else {
                    let id = DocId::new(&format!("{dir}/{rel}"));
                    Some(Matched { path, id })
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> Result<TempDir> {
        let tmp = TempDir::new()?;
        for rel in [
            "skills/pdf/SKILL.md",
            "skills/pdf/reference.md",
            "skills/pdf/scripts/run.py",
            "skills/xlsx/SKILL.md",
            "rules/style.md",
            "AGENTS.md",
        ] {
            let p = tmp.path().join(rel);
            fs::create_dir_all(p.parent().unwrap())?;
            fs::write(p, rel)?;
        }
        Ok(tmp)
    }

    fn ids(found: &[Matched]) -> Vec<&str> {
        found.iter().map(|m| m.id.as_str()).collect()
    }

    fn matcher(tmp: &TempDir) -> Result<Matcher> {
        Ok(Matcher::new(tmp.path(), FileWalker::new(&[])?))
    }

    #[test]
    fn test_directory_default_pattern() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;
        let found = m.collect(&SourceSpec::Entry(SourceEntry::Directory {
            path: "skills".into(),
            pattern: "**/*.md".into(),
        }))?;

        assert_eq!(
            ids(&found),
            vec!["skills/pdf/SKILL.md", "skills/pdf/reference.md", "skills/xlsx/SKILL.md"]
        );
        assert!(found[0].path.ends_with("skills/pdf/SKILL.md"));
        Ok(())
    }

    #[test]
    fn test_directory_custom_pattern_and_dot_prefix() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;
        let found = m.collect(&SourceSpec::Entry(SourceEntry::Directory {
            path: "./skills".into(),
            pattern: "*/SKILL.md".into(),
        }))?;
        assert_eq!(ids(&found), vec!["skills/pdf/SKILL.md", "skills/xlsx/SKILL.md"]);
        Ok(())
    }

    #[test]
    fn test_glob_string() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;

        let found = m.collect(&SourceSpec::Path("skills/**/SKILL.md".into()))?;
        assert_eq!(ids(&found), vec!["skills/pdf/SKILL.md", "skills/xlsx/SKILL.md"]);

        let top = m.collect(&SourceSpec::Path("*.md".into()))?;
        assert_eq!(ids(&top), vec!["AGENTS.md"]);

        let everywhere = m.collect(&SourceSpec::Path("./**/style.md".into()))?;
        assert_eq!(ids(&everywhere), vec!["rules/style.md"]);
        Ok(())
    }

    #[test]
    fn test_exact_paths() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;

        assert_eq!(ids(&m.collect(&SourceSpec::Path("./AGENTS.md".into()))?), vec!["AGENTS.md"]);
        assert_eq!(
            ids(&m.collect(&SourceSpec::Entry(SourceEntry::File { path: "rules/style.md".into() }))?),
            vec!["rules/style.md"]
        );
        assert!(m.collect(&SourceSpec::Path("rules".into()))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_absent_sources_match_nothing() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;

        assert!(m.collect(&SourceSpec::Path("missing.md".into()))?.is_empty());
        assert!(m.collect(&SourceSpec::Path("missing/**/*.md".into()))?.is_empty());
        assert!(m
            .collect(&SourceSpec::Entry(SourceEntry::Directory {
                path: "missing".into(),
                pattern: "**/*.md".into()
            }))?
            .is_empty());
        assert!(m.collect(&SourceSpec::Entry(SourceEntry::Unsupported))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_pattern_is_an_error() -> Result<()> {
        let tmp = tree()?;
        let m = matcher(&tmp)?;
        assert!(m.collect(&SourceSpec::Path("skills/[*.md".into())).is_err());
        Ok(())
    }
}
