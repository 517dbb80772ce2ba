//! Shared test utilities for integration tests
//!
//! Provides the skill tree fixture and the rule document used across the
//! library and binary tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use assert_fs::prelude::*;

/// Three tasks over one skill tree: claude keeps folders, cursor flattens to
/// `.mdc`, codex ships the README as AGENTS.md.
pub const RULES_JSON: &str = r#"{
    "workpath": "out",
    "cleanpath": [".claude", ".cursor"],
    "content_rules": {
        "skills/**/SKILL.md": {
            "filter": [{"operation": "frontmatter_has"}],
            "process": [{"operation": "rewrite_links_to_claude", "link_prefix": "../.."}]
        },
        "README.md": [
            {"operation": "rewrite_links_to_claude", "link_prefix": "."}
        ],
        "*.md": {
            "scope": ["cursor"],
            "process": [{"operation": "append_end", "content": "\n<!-- cursor -->\n"}]
        }
    },
    "tasks": [
        {
            "name": "claude",
            "distribute": [{
                "source": {"type": "directory", "path": "skills", "pattern": "*/SKILL.md"},
                "filter": [{"operation": "frontmatter_has"}],
                "copy": ".claude/skills",
                "use_parent_dir": true
            }],
            "generate_settings": {}
        },
        {
            "name": "cursor",
            "distribute": [{
                "source": {"type": "directory", "path": "skills", "pattern": "*/SKILL.md"},
                "filter": [{"operation": "frontmatter_has"}],
                "copy": ".cursor/rules",
                "rename_rule": {"foldername": true},
                "suffix": "mdc"
            }],
            "generate_settings": {}
        },
        {
            "name": "codex",
            "distribute": [{"source": "README.md", "rename": "AGENTS.md"}]
        }
    ]
}"#;

/// The codex task of `RULES_JSON` as YAML.
pub const RULES_YAML: &str = r#"
workpath: out
tasks:
  - name: codex
    distribute:
      - source: README.md
        rename: AGENTS.md
"#;

pub const PDF_SKILL: &str = "---\nname: pdf\ndescription: Read PDFs\npermission: ask\n---\n\
Pair with [sheets](./../xlsx/SKILL.md), see [reference](./reference.md).\n";

pub const XLSX_SKILL: &str = "---\nname: xlsx\ndescription: Edit spreadsheets\n---\nSpreadsheets.\n";

/// Source tree plus `rules_config.json` at the root.
pub fn make_skill_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("skills/pdf/SKILL.md")
        .write_str(PDF_SKILL)
        .expect("write pdf");
    tmp.child("skills/pdf/reference.md")
        .write_str("# Reference\n")
        .expect("write reference");
    tmp.child("skills/xlsx/SKILL.md")
        .write_str(XLSX_SKILL)
        .expect("write xlsx");

    // no header block: filtered out of every task
    tmp.child("skills/draft/SKILL.md")
        .write_str("# Draft\n")
        .expect("write draft");

    tmp.child("README.md")
        .write_str("Start with [pdf](./skills/pdf/SKILL.md) or [draft](./skills/draft/SKILL.md).\n")
        .expect("write readme");

    tmp.child("rules_config.json")
        .write_str(RULES_JSON)
        .expect("write rules");

    tmp
}

/// Relative path -> content of every file under `dir`.
pub fn snapshot(dir: &Path) -> BTreeMap<String, String>
{
    fn visit(
        base: &Path,
        dir: &Path,
        out: &mut BTreeMap<String, String>,
    )
    {
        let Ok(entries) = std::fs::read_dir(dir)
        else
        {
            return;
        };
        for entry in entries.flatten()
        {
            let path = entry.path();
            if path.is_dir()
            {
                visit(base, &path, out);
            }
            else
            {
                let rel = path
                    .strip_prefix(base)
                    .expect("under base")
                    .to_string_lossy()
                    .replace('\\', "/");
                out.insert(rel, std::fs::read_to_string(&path).expect("read"));
            }
        }
    }

    let mut out = BTreeMap::new();
    visit(dir, dir, &mut out);
    out
}
