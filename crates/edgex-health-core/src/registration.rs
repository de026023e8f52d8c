//! Idempotent registration and removal of the monitor's EdgeX resources.
//!
//! Resources are created in dependency order (a resource is never created
//! before the resources it names). Removal deletes every resource before the
//! ones it names, with the value descriptor last. Each resource is looked up
//! by name first, so repeated passes only create what is missing. Failures
//! are logged and the pass moves on to the next resource; nothing is rolled
//! back.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::backend::BackendId;
use crate::config::Configuration;
use crate::connector::EdgeXConnector;
use crate::model::EdgeXComponents;

/// Resource types managed by the registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    DeviceProfile,
    Addressable,
    DeviceService,
    Device,
    ValueDescriptor,
    ExportClient,
}

impl ResourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceProfile => "device profile",
            Self::Addressable => "addressable",
            Self::DeviceService => "device service",
            Self::Device => "device",
            Self::ValueDescriptor => "value descriptor",
            Self::ExportClient => "export client",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
    /// The lookup failed for a reason other than "not found".
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOutcome {
    Created,
    AlreadyPresent,
    Deleted,
    NotPresent,
    Failed,
    /// Existence could not be established, so nothing was attempted.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentReport {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: ComponentOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationOptions {
    /// When an existence check fails with anything but "not found", treat
    /// the resource as absent (create it / skip its delete). When `false`
    /// the resource is left alone in both passes.
    pub treat_unknown_errors_as_absent: bool,
}

impl Default for RegistrationOptions {
    fn default() -> Self {
        Self {
            treat_unknown_errors_as_absent: true,
        }
    }
}

/// Per-resource operations. Holds no registration state.
struct ComponentOps {
    connector: Arc<EdgeXConnector>,
    config: Arc<Configuration>,
    options: RegistrationOptions,
}

impl ComponentOps {
    fn location(&self, kind: ResourceKind) -> (BackendId, &str) {
        let edgex = &self.config.edgex;
        match kind {
            ResourceKind::DeviceProfile => (BackendId::MetaData, &edgex.meta_data.device_profile),
            ResourceKind::Addressable => (BackendId::MetaData, &edgex.meta_data.addressable),
            ResourceKind::DeviceService => (BackendId::MetaData, &edgex.meta_data.device_service),
            ResourceKind::Device => (BackendId::MetaData, &edgex.meta_data.device),
            ResourceKind::ValueDescriptor => {
                (BackendId::CoreData, &edgex.core_data.value_descriptor)
            }
            ResourceKind::ExportClient => {
                (BackendId::ExportClient, &edgex.export_client.registration)
            }
        }
    }

    async fn component_exists(&self, kind: ResourceKind, name: &str, request_id: &str) -> Presence {
        let (backend, path) = self.location(kind);
        let named_path = named_path(path, name);

        match self
            .connector
            .get_request(backend, &named_path, Some(request_id))
            .await
        {
            Ok(()) => Presence::Present,
            Err(err) if err.is_not_found() => {
                info!(%kind, resource = name, %backend, "{name} not found on {backend}");
                Presence::Absent
            }
            Err(err) => {
                error!(%kind, resource = name, %backend, error = %err, "existence check failed");
                if self.options.treat_unknown_errors_as_absent {
                    Presence::Absent
                } else {
                    Presence::Indeterminate
                }
            }
        }
    }

    async fn register_component<T: Serialize + ?Sized>(
        &self,
        kind: ResourceKind,
        name: &str,
        component: &T,
        request_id: &str,
    ) -> ComponentReport {
        let (backend, path) = self.location(kind);

        let outcome = match self.component_exists(kind, name, request_id).await {
            Presence::Present => ComponentOutcome::AlreadyPresent,
            Presence::Indeterminate => {
                warn!(%kind, resource = name, %backend, "existence unknown; not creating");
                return report(kind, name, ComponentOutcome::Skipped);
            }
            Presence::Absent => {
                info!(%kind, resource = name, %backend, "creating {name} on {backend}");
                if let Err(err) = self
                    .connector
                    .post_request(backend, path, component, Some(request_id))
                    .await
                {
                    error!(
                        %kind,
                        resource = name,
                        %backend,
                        error = %err,
                        "failed to register component"
                    );
                    return report(kind, name, ComponentOutcome::Failed);
                }
                ComponentOutcome::Created
            }
        };

        info!(%kind, resource = name, "{name} registered");
        report(kind, name, outcome)
    }

    async fn remove_component(
        &self,
        kind: ResourceKind,
        name: &str,
        request_id: &str,
    ) -> ComponentReport {
        let (backend, path) = self.location(kind);

        let outcome = match self.component_exists(kind, name, request_id).await {
            Presence::Present => {
                match self
                    .connector
                    .delete_request(backend, &named_path(path, name), Some(request_id))
                    .await
                {
                    Ok(()) => {
                        info!(%kind, resource = name, %backend, "deleted {name} from {backend}");
                        ComponentOutcome::Deleted
                    }
                    Err(err) => {
                        error!(
                            %kind,
                            resource = name,
                            %backend,
                            error = %err,
                            "error while deleting {name} from {backend}"
                        );
                        ComponentOutcome::Failed
                    }
                }
            }
            Presence::Absent => {
                info!(
                    %kind,
                    resource = name,
                    %backend,
                    "{name} not present on {backend}; nothing to delete"
                );
                ComponentOutcome::NotPresent
            }
            Presence::Indeterminate => {
                warn!(%kind, resource = name, %backend, "existence unknown; not deleting");
                ComponentOutcome::Skipped
            }
        };

        report(kind, name, outcome)
    }
}

/// Owns the registered resource set between `start` and `close`.
pub struct Registrar {
    ops: ComponentOps,
    components: Option<EdgeXComponents>,
}

impl Registrar {
    pub fn new(connector: Arc<EdgeXConnector>, config: Arc<Configuration>) -> Self {
        Self::with_options(connector, config, RegistrationOptions::default())
    }

    pub fn with_options(
        connector: Arc<EdgeXConnector>,
        config: Arc<Configuration>,
        options: RegistrationOptions,
    ) -> Self {
        Self {
            ops: ComponentOps {
                connector,
                config,
                options,
            },
            components: None,
        }
    }

    /// The resource set retained by the last registration pass.
    pub fn components(&self) -> Option<&EdgeXComponents> {
        self.components.as_ref()
    }

    /// Builds the resource set from configuration, retains it, then
    /// registers each resource in dependency order.
    pub async fn register_all_components(&mut self) -> Vec<ComponentReport> {
        let pass_id = Uuid::new_v4().to_string();
        let span = info_span!("register_components", pass_id = %pass_id);

        let ops = &self.ops;
        let components = &*self
            .components
            .insert(EdgeXComponents::from_config(&ops.config));

        async move {
            match serde_json::to_string_pretty(components) {
                Ok(json) => debug!("components: {json}"),
                Err(err) => debug!(error = %err, "unable to render components"),
            }

            let mut reports = Vec::with_capacity(5 + components.export_clients.len());
            reports.push(
                ops.register_component(
                    ResourceKind::DeviceProfile,
                    &components.device_profile.name,
                    &components.device_profile,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.register_component(
                    ResourceKind::Addressable,
                    &components.default_addressable.name,
                    &components.default_addressable,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.register_component(
                    ResourceKind::DeviceService,
                    &components.device_service.name,
                    &components.device_service,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.register_component(
                    ResourceKind::Device,
                    &components.device.name,
                    &components.device,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.register_component(
                    ResourceKind::ValueDescriptor,
                    &components.value_descriptor.name,
                    &components.value_descriptor,
                    &pass_id,
                )
                .await,
            );
            for client in &components.export_clients {
                reports.push(
                    ops.register_component(
                        ResourceKind::ExportClient,
                        &client.name,
                        client,
                        &pass_id,
                    )
                    .await,
                );
            }

            log_summary("registration", &reports);
            reports
        }
        .instrument(span)
        .await
    }

    /// Removes the retained resource set and releases it: export clients in
    /// configuration order, then the device chain from the device down to its
    /// profile, and the value descriptor last. Without a retained set this is
    /// a no-op.
    pub async fn remove_all_components(&mut self) -> Vec<ComponentReport> {
        let Some(components) = self.components.take() else {
            info!("no registered components to remove");
            return Vec::new();
        };

        let pass_id = Uuid::new_v4().to_string();
        let span = info_span!("remove_components", pass_id = %pass_id);
        let ops = &self.ops;

        async move {
            let mut reports = Vec::with_capacity(5 + components.export_clients.len());
            for client in &components.export_clients {
                reports.push(
                    ops.remove_component(ResourceKind::ExportClient, &client.name, &pass_id)
                        .await,
                );
            }
            reports.push(
                ops.remove_component(ResourceKind::Device, &components.device.name, &pass_id)
                    .await,
            );
            reports.push(
                ops.remove_component(
                    ResourceKind::DeviceService,
                    &components.device_service.name,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.remove_component(
                    ResourceKind::Addressable,
                    &components.default_addressable.name,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.remove_component(
                    ResourceKind::DeviceProfile,
                    &components.device_profile.name,
                    &pass_id,
                )
                .await,
            );
            reports.push(
                ops.remove_component(
                    ResourceKind::ValueDescriptor,
                    &components.value_descriptor.name,
                    &pass_id,
                )
                .await,
            );

            log_summary("removal", &reports);
            reports
        }
        .instrument(span)
        .await
    }
}

fn named_path(path: &str, name: &str) -> String {
    format!("{path}/name/{}", urlencoding::encode(name))
}

fn report(kind: ResourceKind, name: &str, outcome: ComponentOutcome) -> ComponentReport {
    ComponentReport {
        kind,
        name: name.to_owned(),
        outcome,
    }
}

fn log_summary(pass: &str, reports: &[ComponentReport]) {
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, ComponentOutcome::Failed | ComponentOutcome::Skipped))
        .count();
    if failed == 0 {
        info!(components = reports.len(), "{pass} pass complete");
    } else {
        warn!(components = reports.len(), failed, "{pass} pass finished with failures");
    }
}
