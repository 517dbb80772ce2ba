//! **ruledist** - Distribute LLM-agent rule and skill documents into per-tool layouts
//!
//! One source tree, many destinations. Every task's target paths are
//! precomputed before any content is rewritten, so links between documents
//! can point at wherever the referenced document lands in another task.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Extended command handlers (run / plan)
pub mod cli_ext {
    pub mod dist_cmd;
}

/// Distribution engine - matching, filtering, renaming, rewriting
pub mod core {
    /// Normalized document identities
    pub mod identity;
    pub use identity::DocId;

    /// Source descriptor expansion
    pub mod matcher;
    pub use matcher::{Matched, Matcher};

    /// `---` header block access
    pub mod frontmatter;

    /// Filter predicates and rule scopes
    pub mod filter;

    /// Target names and paths
    pub mod rename;

    /// Path precomputation for all tasks
    pub mod plan;
    pub use plan::{PathLookup, PathTable, build_table};

    /// Content rule engine
    pub mod rules;
    pub use rules::TaskRules;

    /// Cross-task link rewriting
    pub mod links;

    /// Run orchestration and reports
    pub mod distribute;
    pub use distribute::{Distributor, RunReport, TaskReport};

    /// Tool settings generation hooks
    pub mod settings;
    pub use settings::{PermissionsHook, SettingsHook};
}

/// Infrastructure - Configuration, I/O, walking and logging
pub mod infra {
    /// Tool settings layered from file and environment
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Rule configuration document model and loader
    pub mod rules;
    pub use rules::{ConfigError, RulesConfig, load_rules};

    /// Deterministic directory walking
    pub mod walk;
    pub use walk::FileWalker;

    /// Document read/write helpers
    pub mod io;

    /// tracing subscriber setup
    pub mod logging;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{DocId, Distributor, PathTable, RunReport};
pub use infra::{Config, FileWalker, RulesConfig, load_config, load_rules};
