use std::process::ExitCode;

use edgex_health_core::Configuration;

use crate::error::CliError;

use super::render_json;

pub fn run(config: &Configuration, pretty: bool) -> Result<ExitCode, CliError> {
    println!("{}", render_json(config, pretty)?);
    Ok(ExitCode::SUCCESS)
}
