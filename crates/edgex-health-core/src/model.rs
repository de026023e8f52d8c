//! EdgeX metadata resources and Consul health-check records.
//!
//! | Type | Backend | Referenced by name from |
//! |------|---------|-------------------------|
//! | [`DeviceProfile`] | MetaData | [`Device`] |
//! | [`Addressable`] | MetaData | [`DeviceService`] |
//! | [`DeviceService`] | MetaData | [`Device`] |
//! | [`Device`] | MetaData | [`ExportClient`] filter |
//! | [`ValueDescriptor`] | CoreData | |
//! | [`ExportClient`] | ExportClient | |

use serde::{Deserialize, Serialize};

use crate::config::{Configuration, ExportEndpoint};

const DEFAULT_LABEL: &str = "healthmonitor";
const DEVICE_NAME: &str = "healthmonitor";
const DEVICE_PROFILE_NAME: &str = "Health_monitor_profile";
const DEVICE_SERVICE_NAME: &str = "Health_Monitor_Device_Service";
const VALUE_DESCRIPTOR_NAME: &str = "servicefailure";
const EXPORT_PUBLISHER: &str = "EdgeXExportPublisher";

/// Back-reference to another resource by its unique name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedRef {
    pub name: String,
}

impl NamedRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Addressable {
    pub name: String,
    pub protocol: String,
    pub address: String,
    pub path: String,
    pub port: u16,
    pub method: String,
    pub publisher: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub model: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceService {
    pub name: String,
    pub description: String,
    pub labels: Vec<String>,
    pub admin_state: String,
    pub operating_state: String,
    pub addressable: NamedRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProtocols {
    #[serde(rename = "health monitor protocol")]
    pub protocol: NamedRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    pub name: String,
    pub description: String,
    pub admin_state: String,
    pub operating_state: String,
    pub labels: Vec<String>,
    pub service: NamedRef,
    pub profile: NamedRef,
    pub protocols: DeviceProtocols,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub default_value: String,
    pub formatting: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportFilter {
    pub device_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportClient {
    pub name: String,
    pub addressable: Addressable,
    pub filter: ExportFilter,
    pub format: String,
    pub enable: bool,
    pub destination: String,
}

/// The full resource set registered by one monitor instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeXComponents {
    pub device_profile: DeviceProfile,
    pub default_addressable: Addressable,
    pub device_service: DeviceService,
    pub device: Device,
    pub value_descriptor: ValueDescriptor,
    pub export_clients: Vec<ExportClient>,
}

impl EdgeXComponents {
    /// Builds every resource from configuration. Deterministic: the same
    /// configuration always yields the same names and payloads.
    pub fn from_config(config: &Configuration) -> Self {
        let addressable = default_addressable(&config.app.name);
        let device_profile = device_profile();
        let device_service = device_service(&addressable.name);
        let device = device(&device_service.name, &device_profile.name);
        let export_clients = config
            .export_endpoints
            .iter()
            .map(|endpoint| export_client(endpoint, &device.name))
            .collect();

        Self {
            device_profile,
            default_addressable: addressable,
            device_service,
            device,
            value_descriptor: value_descriptor(VALUE_DESCRIPTOR_NAME),
            export_clients,
        }
    }
}

fn default_labels() -> Vec<String> {
    vec![String::from(DEFAULT_LABEL)]
}

fn default_addressable(app_name: &str) -> Addressable {
    Addressable {
        name: format!("{app_name}Addressable"),
        protocol: String::from("HTTP"),
        address: String::from("localhost"),
        path: String::from("/"),
        port: 8000,
        method: String::from("POST"),
        publisher: String::new(),
    }
}

fn device_profile() -> DeviceProfile {
    DeviceProfile {
        name: String::from(DEVICE_PROFILE_NAME),
        labels: default_labels(),
        ..DeviceProfile::default()
    }
}

fn device_service(addressable_name: &str) -> DeviceService {
    DeviceService {
        name: String::from(DEVICE_SERVICE_NAME),
        description: String::from("Monitor health of EdgeX services and alert when services fail"),
        labels: default_labels(),
        admin_state: String::from("unlocked"),
        operating_state: String::from("enabled"),
        addressable: NamedRef::new(addressable_name),
    }
}

fn device(device_service_name: &str, device_profile_name: &str) -> Device {
    Device {
        name: String::from(DEVICE_NAME),
        description: String::new(),
        admin_state: String::from("unlocked"),
        operating_state: String::from("enabled"),
        labels: default_labels(),
        service: NamedRef::new(device_service_name),
        profile: NamedRef::new(device_profile_name),
        protocols: DeviceProtocols {
            protocol: NamedRef::new("default"),
        },
    }
}

fn value_descriptor(name: &str) -> ValueDescriptor {
    ValueDescriptor {
        name: name.to_owned(),
        description: String::from("name of a failing service"),
        value_type: String::from("S"),
        default_value: String::new(),
        formatting: String::from("%s"),
        labels: default_labels(),
    }
}

fn export_client(endpoint: &ExportEndpoint, device_name: &str) -> ExportClient {
    ExportClient {
        name: format!("{}ExportClient", endpoint.name),
        addressable: Addressable {
            name: endpoint.name.clone(),
            protocol: endpoint.protocol.clone(),
            address: endpoint.address.clone(),
            path: endpoint.path.clone(),
            port: endpoint.port,
            method: String::from("POST"),
            publisher: String::from(EXPORT_PUBLISHER),
        },
        filter: ExportFilter {
            device_identifiers: vec![device_name.to_owned()],
        },
        format: String::from("JSON"),
        enable: true,
        destination: String::from("REST_ENDPOINT"),
    }
}

/// One Consul health check as returned by `/v1/health/...`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulStatus {
    #[serde(rename = "Node")]
    pub node: String,
    #[serde(rename = "CheckID")]
    pub check_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Output")]
    pub output: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    #[serde(rename = "ServiceName")]
    pub service_name: String,
    #[serde(rename = "ServiceTags")]
    pub service_tags: Option<Vec<String>>,
    #[serde(rename = "Definition")]
    pub definition: serde_json::Value,
    #[serde(rename = "CreateIndex")]
    pub create_index: u64,
    #[serde(rename = "ModifyIndex")]
    pub modify_index: u64,
}

impl ConsulStatus {
    pub fn is_passing(&self) -> bool {
        self.status.eq_ignore_ascii_case("passing")
    }
}

pub type ConsulStatusResponse = Vec<ConsulStatus>;
