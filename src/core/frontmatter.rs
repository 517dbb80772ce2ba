//! Header block access.
//!
//! A header block is a leading `---` line, a body of `name: value` lines and
//! a closing `---` line. Nothing else in a document is interpreted.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A---[ \t]*\r?\n((?s:.*?))\r?\n---[ \t]*\r?\n")
        .unwrap_or_else(|e| unreachable!("header pattern is valid: {e}"))
});

/// Body of the leading header block, without the delimiter lines.
pub fn header_block(content: &str) -> Option<&str> {
    HEADER_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Value part of a `name: value` line whose key is exactly `name`.
fn line_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    rest.trim_start().strip_prefix(':')
}

/// True when a header block exists and declares every field in `fields`.
pub fn has_fields<S: AsRef<str>>(content: &str, fields: &[S]) -> bool {
    let Some(block) = header_block(content) else {
        return false;
    };

    fields.iter().all(|field| {
        block
            .lines()
            .any(|line| line_value(line, field.as_ref()).is_some())
    })
}

/// Trimmed value of a header field; `None` when absent or empty.
pub fn field(content: &str, name: &str) -> Option<String> {
    let block = header_block(content)?;
    block
        .lines()
        .filter_map(|line| line_value(line, name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
