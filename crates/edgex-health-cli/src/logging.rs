//! Global `tracing` subscriber setup.

use edgex_health_core::Configuration;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Filter directive: `RUST_LOG`, then `--log-level`, then `logger.level`.
pub fn filter_directive(config: &Configuration, level_override: Option<&str>) -> String {
    if let Ok(from_env) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !from_env.trim().is_empty() {
            return from_env;
        }
    }

    level_override
        .filter(|level| !level.trim().is_empty())
        .unwrap_or(&config.logger.level)
        .to_ascii_lowercase()
}

/// Installs the process-wide subscriber. Debug mode logs human-readable
/// lines to stderr; otherwise one JSON object per line.
pub fn init(config: &Configuration, level_override: Option<&str>) -> Result<(), CliError> {
    let directive = filter_directive(config, level_override);
    let filter =
        EnvFilter::try_new(&directive).map_err(|error| CliError::Logging(error.to_string()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.app.debug {
        builder.compact().try_init()
    } else {
        builder.json().with_current_span(true).try_init()
    };

    installed.map_err(|error| CliError::Logging(error.to_string()))
}
