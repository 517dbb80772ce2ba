//! Rule configuration document.
//!
//! The document is the declarative input of a run: where to write
//! (`workpath`), what to delete first (`cleanpath`), pattern-keyed content
//! rule groups and the ordered task list. Operation and predicate kinds are
//! closed enums; a kind this build does not know parses into an `Unknown`
//! variant so callers can report it instead of silently passing.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

/// Fatal problems with the rule document. Nothing runs when one occurs.
#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("rule configuration not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read rule configuration {path}")]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule configuration {path}: {message}")]
    Parse
    {
        path: PathBuf,
        message: String,
    },

    #[error("unsupported rule configuration format `{0}` (expected json, toml, yaml)")]
    UnsupportedFormat(String),
}

/// Serialization format of a rule document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesFormat
{
    Json,
    Toml,
    Yaml,
}

impl RulesFormat
{
    pub fn from_path(path: &Path) -> Result<Self, ConfigError>
    {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match ext.as_str()
        {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig
{
    /// Output root every target path is relative to
    pub workpath: String,

    /// Paths under `workpath` removed before distributing
    pub cleanpath: Vec<String>,

    /// Pattern -> rule group, in declaration order
    pub content_rules: IndexMap<String, RuleGroup>,

    pub tasks: Vec<Task>,
}

impl Default for RulesConfig
{
    fn default() -> Self
    {
        Self {
            workpath: ".".to_string(),
            cleanpath: Vec::new(),
            content_rules: IndexMap::new(),
            tasks: Vec::new(),
        }
    }
}

/// Task applicability of a rule or rule group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope
{
    #[default]
    Always,
    /// Allow-list; `*` admits every task
    Only(Vec<String>),
    /// Deny-list
    Except(Vec<String>),
}

impl Scope
{
    /// `scope` is evaluated before `exclude`; an empty list counts as absent.
    fn from_lists(
        scope: Option<OneOrMany>,
        exclude: Option<OneOrMany>,
    ) -> Self
    {
        let scope = scope
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        let exclude = exclude
            .map(OneOrMany::into_vec)
            .unwrap_or_default();

        if !scope.is_empty()
        {
            Scope::Only(scope)
        }
        else if !exclude.is_empty()
        {
            Scope::Except(exclude)
        }
        else
        {
            Scope::Always
        }
    }
}

/// `"claude"` and `["claude"]` are both accepted for task lists.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany
{
    One(String),
    Many(Vec<String>),
}

impl OneOrMany
{
    fn into_vec(self) -> Vec<String>
    {
        match self
        {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// A pattern-keyed bundle of filters and ordered content operations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawRuleGroup")]
pub struct RuleGroup
{
    pub filter: Vec<FilterRule>,
    pub process: Vec<ProcessRule>,
    pub scope: Scope,
}

/// A group is either a bare operation list or a `{filter, process}` record.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRuleGroup
{
    Bare(Vec<ProcessRule>),
    Full
    {
        #[serde(default)]
        filter: Vec<FilterRule>,
        #[serde(default)]
        process: Vec<ProcessRule>,
        scope: Option<OneOrMany>,
        exclude: Option<OneOrMany>,
    },
}

impl From<RawRuleGroup> for RuleGroup
{
    fn from(raw: RawRuleGroup) -> Self
    {
        match raw
        {
            RawRuleGroup::Bare(process) => Self { filter: Vec::new(), process, scope: Scope::Always },
            RawRuleGroup::Full { filter, process, scope, exclude } => Self {
                filter,
                process,
                scope: Scope::from_lists(scope, exclude),
            },
        }
    }
}

/// Boolean predicate over a document's content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate
{
    /// Header block exists and declares every listed field
    FrontmatterHas
    {
        fields: Vec<String>,
    },
    Unknown(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawFilterRule")]
pub struct FilterRule
{
    pub predicate: Predicate,
    pub negate: bool,
    pub description: Option<String>,
    pub scope: Scope,
}

#[derive(Deserialize)]
struct RawFilterRule
{
    #[serde(default)]
    operation: String,
    #[serde(default)]
    negate: bool,
    description: Option<String>,
    fields: Option<Vec<String>>,
    scope: Option<OneOrMany>,
    exclude: Option<OneOrMany>,
}

impl From<RawFilterRule> for FilterRule
{
    fn from(raw: RawFilterRule) -> Self
    {
        let predicate = match raw
            .operation
            .as_str()
        {
            "frontmatter_has" => Predicate::FrontmatterHas {
                fields: raw
                    .fields
                    .unwrap_or_else(|| vec!["name".to_string(), "description".to_string()]),
            },
            other => Predicate::Unknown(other.to_string()),
        };

        Self {
            predicate,
            negate: raw.negate,
            description: raw.description,
            scope: Scope::from_lists(raw.scope, raw.exclude),
        }
    }
}

/// Parameters of a link-rewrite operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRule
{
    /// Task whose precomputed paths the links should point at
    pub target_task: String,
    pub link_prefix: String,
    /// Replace the display text with the tail of the target path
    pub rewrite_text: bool,
}

impl Default for LinkRule
{
    fn default() -> Self
    {
        Self {
            target_task: "claude".to_string(),
            link_prefix: "../..".to_string(),
            rewrite_text: true,
        }
    }
}

/// One content operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation
{
    AppendStart
    {
        content: String,
    },
    AppendEnd
    {
        content: String,
    },
    Replace
    {
        pattern: Option<String>,
        replacement: String,
        flags: Vec<String>,
    },
    RewriteLinks(LinkRule),
    Unknown(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawProcessRule")]
pub struct ProcessRule
{
    pub operation: Operation,
    pub description: Option<String>,
    pub scope: Scope,
}

impl ProcessRule
{
    pub fn new(operation: Operation) -> Self
    {
        Self { operation, description: None, scope: Scope::Always }
    }

    pub fn label(&self) -> &str
    {
        self.description
            .as_deref()
            .unwrap_or(match &self.operation
            {
                Operation::AppendStart { .. } => "append_start",
                Operation::AppendEnd { .. } => "append_end",
                Operation::Replace { .. } => "replace",
                Operation::RewriteLinks(_) => "rewrite_links",
                Operation::Unknown(name) => name.as_str(),
            })
    }
}

#[derive(Deserialize)]
struct RawProcessRule
{
    #[serde(default = "default_operation")]
    operation: String,
    description: Option<String>,
    scope: Option<OneOrMany>,
    exclude: Option<OneOrMany>,
    #[serde(default)]
    content: String,
    pattern: Option<String>,
    #[serde(default)]
    replacement: String,
    #[serde(default)]
    flags: Vec<String>,
    target_task: Option<String>,
    link_prefix: Option<String>,
    rewrite_text: Option<bool>,
}

fn default_operation() -> String
{
    "replace".to_string()
}

impl From<RawProcessRule> for ProcessRule
{
    fn from(raw: RawProcessRule) -> Self
    {
        let operation = match raw
            .operation
            .as_str()
        {
            "append_start" => Operation::AppendStart { content: raw.content },
            "append_end" => Operation::AppendEnd { content: raw.content },
            "replace" => Operation::Replace {
                pattern: raw.pattern,
                replacement: raw.replacement,
                flags: raw.flags,
            },
            "rewrite_links_to_claude" | "rewrite_links" =>
            {
                let defaults = LinkRule::default();
                Operation::RewriteLinks(LinkRule {
                    target_task: raw
                        .target_task
                        .unwrap_or(defaults.target_task),
                    link_prefix: raw
                        .link_prefix
                        .unwrap_or(defaults.link_prefix),
                    rewrite_text: raw
                        .rewrite_text
                        .unwrap_or(defaults.rewrite_text),
                })
            }
            other => Operation::Unknown(other.to_string()),
        };

        Self {
            operation,
            description: raw.description,
            scope: Scope::from_lists(raw.scope, raw.exclude),
        }
    }
}

/// Where a distribution unit reads its documents from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec
{
    /// Exact path, or a glob when it contains `*`
    Path(String),
    Entry(SourceEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceEntry
{
    File
    {
        path: String,
    },
    Directory
    {
        path: String,
        #[serde(default = "default_dir_pattern")]
        pattern: String,
    },
    #[serde(other)]
    Unsupported,
}

pub fn default_dir_pattern() -> String
{
    "**/*.md".to_string()
}

/// Component of a derived file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePart
{
    Filename,
    ParentDir,
    #[serde(other)]
    Other,
}

/// What the lowercase/replacement steps of a rename rule touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyTo
{
    File,
    Parent,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Replacement
{
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenameRule
{
    /// Name the file after its parent folder
    pub foldername: bool,
    pub combine: Vec<NamePart>,
    pub lowercase: bool,
    pub replacements: Vec<Replacement>,
    pub apply_to: Vec<ApplyTo>,
    pub apply_to_parent_dir: bool,
}

impl Default for RenameRule
{
    fn default() -> Self
    {
        Self {
            foldername: false,
            combine: vec![NamePart::Filename],
            lowercase: false,
            replacements: Vec::new(),
            apply_to: vec![ApplyTo::File],
            apply_to_parent_dir: false,
        }
    }
}

/// One source-to-destination rule within a task
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DistributionUnit
{
    pub source: Option<SourceSpec>,
    pub filter: Vec<FilterRule>,
    pub process: Vec<ProcessRule>,
    /// Target directory relative to `workpath`; empty means the root
    pub copy: String,
    /// Literal target file name
    pub rename: Option<String>,
    pub rename_rule: Option<RenameRule>,
    /// Forced extension (without the dot) for derived names
    pub suffix: Option<String>,
    pub use_parent_dir: bool,
}

/// Request to generate a tool settings file after the task ran
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SettingsDirective
{
    pub target: String,
    pub default_permission: String,
}

impl Default for SettingsDirective
{
    fn default() -> Self
    {
        Self {
            target: ".claude/settings.local.json".to_string(),
            default_permission: "allow".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task
{
    #[serde(default = "default_task_name")]
    pub name: String,
    #[serde(default)]
    pub distribute: Vec<DistributionUnit>,
    #[serde(default)]
    pub generate_settings: Option<SettingsDirective>,
}

fn default_task_name() -> String
{
    "unnamed".to_string()
}

/// Load and parse the rule document at `path`.
pub fn load_rules(path: &Path) -> Result<RulesConfig, ConfigError>
{
    if !path.is_file()
    {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let format = RulesFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_rules(&text, format).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse a rule document from text; the error is the parser's message.
pub fn parse_rules(
    text: &str,
    format: RulesFormat,
) -> Result<RulesConfig, String>
{
    match format
    {
        RulesFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        RulesFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        RulesFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    }
}
