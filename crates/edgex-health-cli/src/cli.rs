//! CLI argument definitions for the EdgeX health monitor.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Register with EdgeX, poll Consul, clean up on shutdown (default) |
//! | `health` | Query Consul once and print the health checks |
//! | `config` | Print the effective configuration |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | `config.json` if present | Configuration file (env `EDGEX_HEALTH_CONFIG`) |
//! | `--log-level` | `logger.level` | Log filter, e.g. `info` or `edgex_health_core=debug` |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Run the sidecar with the default configuration file
//! edgex-health
//!
//! # Check service health once
//! edgex-health --config /etc/edgex-health/config.json health --pretty
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// EdgeX health monitor sidecar.
///
/// Registers a device, its profile, service, addressable, value descriptor and
/// export clients with EdgeX, then polls Consul for failing services until
/// interrupted. Everything it registered is removed again on shutdown.
#[derive(Debug, Parser)]
#[command(name = "edgex-health", author, version, about)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, env = "EDGEX_HEALTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log filter overriding `logger.level` from the configuration.
    ///
    /// `RUST_LOG` takes precedence over both.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn selected_command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Register with EdgeX and monitor Consul until Ctrl-C or SIGTERM.
    Run,

    /// Query Consul once and print every health check as JSON.
    ///
    /// Exits with code 3 when any check is not passing.
    Health,

    /// Print the effective configuration as JSON.
    Config,
}
