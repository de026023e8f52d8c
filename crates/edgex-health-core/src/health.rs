use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::backend::BackendId;
use crate::client::RequestError;
use crate::connector::EdgeXConnector;
use crate::model::ConsulStatusResponse;

/// Polls Consul for the health of the EdgeX services.
#[derive(Clone)]
pub struct HealthPoller {
    connector: Arc<EdgeXConnector>,
    health_path: String,
    interval: Duration,
}

impl HealthPoller {
    pub fn new(
        connector: Arc<EdgeXConnector>,
        health_path: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            connector,
            health_path: health_path.into(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetches the current health checks, surfacing transport, status and
    /// decode failures.
    pub async fn try_query_consul(&self) -> Result<ConsulStatusResponse, RequestError> {
        let checks = self
            .connector
            .get_json::<ConsulStatusResponse>(BackendId::Consul, &self.health_path, None)
            .await?;
        debug!(checks = checks.len(), "consul health checks received");
        Ok(checks)
    }

    /// Fetches the current health checks. Errors are logged and yield an
    /// empty list.
    pub async fn query_consul(&self) -> ConsulStatusResponse {
        match self.try_query_consul().await {
            Ok(checks) => checks,
            Err(err) => {
                error!(error = %err, path = %self.health_path, "consul health query failed");
                ConsulStatusResponse::new()
            }
        }
    }

    /// One poll: logs every check that is not passing and returns how many
    /// there were.
    pub async fn poll_once(&self) -> usize {
        let checks = self.query_consul().await;
        let mut failing = 0;

        for check in checks.iter().filter(|check| !check.is_passing()) {
            failing += 1;
            warn!(
                node = %check.node,
                check_id = %check.check_id,
                service = %check.service_name,
                status = %check.status,
                output = %check.output,
                "service check is not passing"
            );
        }

        failing
    }

    /// Polls on the configured interval until `shutdown` turns `true` or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            "consul health poller started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("consul health poller stopped");
    }
}
