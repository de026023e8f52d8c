mod health;
mod run;
mod show_config;

use std::path::Path;
use std::process::ExitCode;

use edgex_health_core::Configuration;
use serde::Serialize;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Read when `--config` and `EDGEX_HEALTH_CONFIG` are both absent.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let config = load_configuration(cli.config.as_deref())?;
    crate::logging::init(&config, cli.log_level.as_deref())?;

    match cli.selected_command() {
        Command::Run => run::run(config).await,
        Command::Health => health::run(config, cli.pretty).await,
        Command::Config => show_config::run(&config, cli.pretty),
    }
}

/// An explicit path must exist; the default file is optional and falls back
/// to built-in defaults.
pub fn load_configuration(path: Option<&Path>) -> Result<Configuration, CliError> {
    let config = match path {
        Some(path) => Configuration::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            Configuration::load(DEFAULT_CONFIG_FILE)?
        }
        None => {
            let config = Configuration::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

pub fn render_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"app":{{"name":"edge-01"}},"edgeXConnector":{{"timeoutMS":500}}}}"#
        )
        .expect("write");

        let config = load_configuration(Some(file.path())).expect("valid");

        assert_eq!(config.app.name, "edge-01");
        assert_eq!(config.edgex.timeout_ms, 500);
        assert_eq!(config.edgex.max_retries, 4);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_configuration(Some(dir.path().join("absent.json").as_path()))
            .expect_err("file does not exist");

        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn render_json_honours_pretty_flag() {
        let value = serde_json::json!({ "a": 1 });
        assert_eq!(render_json(&value, false).expect("json"), r#"{"a":1}"#);
        assert_eq!(render_json(&value, true).expect("json"), "{\n  \"a\": 1\n}");
    }
}
