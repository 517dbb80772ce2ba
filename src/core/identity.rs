//! Document identities.
//!
//! A `DocId` is the slash-separated path of a source document relative to
//! the run root. It is the key of every lookup in the path table, so it is
//! normalized once on construction and never mutated afterwards.

use std::fmt;
use std::path::Path;

use camino::Utf8Path;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocId(String);

impl DocId {
    /// Normalize `raw`: backslashes become slashes, `.` segments and empty
    /// segments vanish, `..` folds into its predecessor. Leading `..` that
    /// cannot fold are kept.
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    /// Identity of a physical path under `root`. Paths outside `root` keep
    /// their own (slash-normalized) spelling.
    pub fn from_path(path: &Path, root: &Path) -> Self {
        let rel = path.strip_prefix(root).unwrap_or(path);
        Self::new(&rel.to_string_lossy())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.0)
    }

    /// Bare file name, e.g. `SKILL.md`
    pub fn file_name(&self) -> &str {
        self.as_path().file_name().unwrap_or_default()
    }

    /// File name without its extension
    pub fn stem(&self) -> &str {
        self.as_path().file_stem().unwrap_or_default()
    }

    /// Extension including the dot, or empty
    pub fn suffix(&self) -> String {
        self.as_path()
            .extension()
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default()
    }

    /// Name of the directory holding the document; empty at the root
    pub fn parent_name(&self) -> &str {
        self.as_path()
            .parent()
            .and_then(|p| p.file_name())
            .unwrap_or_default()
    }

    /// Identity of `rel` interpreted relative to this document's directory.
    /// `None` when the result leaves the root.
    pub fn resolve_relative(&self, rel: &str) -> Option<DocId> {
        if self.is_outside_root() {
            return None;
        }
        let dir = self.as_path().parent().map(Utf8Path::as_str).unwrap_or_default();
        let joined = if dir.is_empty() {
            rel.to_string()
        } else {
            format!("{dir}/{rel}")
        };
        if joined.starts_with('/') {
            return None;
        }

        let id = DocId::new(&joined);
        if id.is_outside_root() || id.0.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    fn is_outside_root(&self) -> bool {
        self.0.starts_with('/') || self.0 == ".." || self.0.starts_with("../") || has_drive(&self.0)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(raw: &str) -> Self {
        DocId::new(raw)
    }
}

/// `C:/...` style prefix
fn has_drive(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[0].is_ascii_alphabetic() && b[1] == b':'
}

fn normalize(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute { format!("/{joined}") } else { joined }
}
