//! Lifecycle owner: registration at start, polling while running, teardown
//! at close.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::{ConfigError, Configuration};
use crate::connector::EdgeXConnector;
use crate::health::HealthPoller;
use crate::http_client::HttpClient;
use crate::registration::{Registrar, RegistrationOptions};

struct PollTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Keeps the monitor's resources registered with EdgeX and polls Consul.
///
/// `start` and `close` take `&mut self`, so a teardown can never overlap a
/// registration pass.
pub struct HealthMonitor {
    registrar: Registrar,
    poller: HealthPoller,
    poll_task: Option<PollTask>,
}

impl HealthMonitor {
    pub fn new(config: Configuration) -> Result<Self, ConfigError> {
        config.validate()?;
        let connector = EdgeXConnector::new(&config.edgex);
        Ok(Self::assemble(config, connector, RegistrationOptions::default()))
    }

    pub fn with_http_client(
        config: Configuration,
        http: Arc<dyn HttpClient>,
        options: RegistrationOptions,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let connector = EdgeXConnector::with_http_client(&config.edgex, http);
        Ok(Self::assemble(config, connector, options))
    }

    fn assemble(
        config: Configuration,
        connector: EdgeXConnector,
        options: RegistrationOptions,
    ) -> Self {
        let connector = Arc::new(connector);
        let poller = HealthPoller::new(
            Arc::clone(&connector),
            config.edgex.consul.health.clone(),
            config.edgex.polling_interval(),
        );
        let registrar = Registrar::with_options(connector, Arc::new(config), options);

        Self {
            registrar,
            poller,
            poll_task: None,
        }
    }

    pub fn registrar(&self) -> &Registrar {
        &self.registrar
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task.is_some()
    }

    /// Runs the registration pass, then starts the polling loop if it is not
    /// already running.
    pub async fn start(&mut self) {
        info!("starting health monitor");
        self.registrar.register_all_components().await;

        if self.poll_task.is_none() {
            let (shutdown, receiver) = watch::channel(false);
            let poller = self.poller.clone();
            let handle = tokio::spawn(async move { poller.run(receiver).await });
            self.poll_task = Some(PollTask { shutdown, handle });
        }
    }

    /// Stops polling, then removes everything the last start registered.
    pub async fn close(&mut self) {
        if let Some(task) = self.poll_task.take() {
            // the receiver may already be gone if the loop panicked
            let _ = task.shutdown.send(true);
            if let Err(err) = task.handle.await {
                error!(error = %err, "health poller task failed");
            }
        }

        self.registrar.remove_all_components().await;
        info!("health monitor closed");
    }
}
