use std::process::ExitCode;
use std::sync::Arc;

use edgex_health_core::{Configuration, ConsulStatus, EdgeXConnector, HealthPoller};

use crate::error::CliError;

use super::render_json;

/// Exit code when at least one check is not passing.
const UNHEALTHY: u8 = 3;

pub async fn run(config: Configuration, pretty: bool) -> Result<ExitCode, CliError> {
    let connector = EdgeXConnector::new(&config.edgex);
    let poller = HealthPoller::new(
        Arc::new(connector),
        config.edgex.consul.health.clone(),
        config.edgex.polling_interval(),
    );

    check(&poller, pretty).await
}

/// An unreachable or failing Consul is an error, never an empty healthy list.
async fn check(poller: &HealthPoller, pretty: bool) -> Result<ExitCode, CliError> {
    let checks = poller.try_query_consul().await?;
    println!("{}", render_json(&checks, pretty)?);

    Ok(ExitCode::from(exit_code_for(&checks)))
}

fn exit_code_for(checks: &[ConsulStatus]) -> u8 {
    if checks.iter().all(ConsulStatus::is_passing) {
        0
    } else {
        UNHEALTHY
    }
}
