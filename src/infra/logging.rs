use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::AppContext;

/// Pick the default filter from the configured level and the global flags.
/// `--quiet` wins over `-v`.
pub fn level_for(configured: &str, ctx: &AppContext) -> String {
    if ctx.quiet {
        return "warn".to_string();
    }
    match ctx.verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Initialize the logging system. `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, ctx: &AppContext) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(!ctx.no_color)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}
