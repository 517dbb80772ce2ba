use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};

/// Tool settings, layered from an optional settings file and `RULEDIST_*`
/// environment variables. The rule document itself lives in `infra::rules`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Rule configuration document used when `--config` is not given
    pub rules_file: PathBuf,

    /// Default log filter (overridden by RUST_LOG)
    pub log_level: String,

    /// Extra globs pruned while enumerating source directories
    pub ignore_patterns: Vec<String>,

    /// Honour .gitignore/.ignore files inside source directories
    pub respect_ignore_files: bool,

    /// Follow symlinked source directories
    pub follow_symlinks: bool,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            rules_file: PathBuf::from("rules_config.json"),
            log_level: "info".to_string(),
            ignore_patterns: Vec::new(),
            respect_ignore_files: false,
            follow_symlinks: false,
        }
    }
}

/// Settings file names looked up in `dir`, first hit wins.
const CONFIG_FILES: [&str; 4] = ["ruledist.toml", "ruledist.yaml", "ruledist.json", ".ruledist.toml"];

pub fn load_config(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // RULEDIST_LOG_LEVEL, RULEDIST_RULES_FILE, RULEDIST_IGNORE_PATTERNS=a,b
    builder = builder.add_source(
        config::Environment::with_prefix("RULEDIST")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("ignore_patterns")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load settings")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse settings")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("ruledist.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
