use std::process::ExitCode;

use edgex_health_core::{Configuration, HealthMonitor};
use tracing::{error, info};

use crate::error::CliError;

/// Runs the sidecar until Ctrl-C or SIGTERM.
///
/// The signal listener is installed before the registration pass, so a
/// signal that arrives mid-registration is honoured once the pass finishes.
pub async fn run(config: Configuration) -> Result<ExitCode, CliError> {
    info!("current config: {}", serde_json::to_string_pretty(&config)?);

    let app_name = config.app.name.clone();
    let mut monitor = HealthMonitor::new(config)?;

    let shutdown = tokio::spawn(shutdown_signal());
    monitor.start().await;

    if let Err(err) = shutdown.await {
        error!(error = %err, "shutdown listener failed");
    }

    monitor.close().await;
    info!(app = %app_name, "exit app {app_name}");
    Ok(ExitCode::SUCCESS)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
