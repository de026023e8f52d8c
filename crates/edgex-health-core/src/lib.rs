//! # EdgeX Health Core
//!
//! Keeps a fixed set of metadata resources registered with EdgeX and watches
//! the health of the EdgeX services through Consul.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`fault`] | Fault taxonomy and HTTP status classification |
//! | [`http_client`] | Single-attempt transport trait, reqwest transport, auth hook |
//! | [`retry`] | Retry policy and backoff |
//! | [`client`] | Retrying, fault-classifying client for one backend |
//! | [`backend`] | Backend identifiers |
//! | [`connector`] | One client per EdgeX backend |
//! | [`model`] | EdgeX resources and Consul health checks |
//! | [`registration`] | Ordered, idempotent registration and removal |
//! | [`health`] | Consul health polling |
//! | [`monitor`] | `start`/`close` lifecycle |
//! | [`config`] | Configuration file format and validation |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐
//! │  HealthMonitor  │────▶│  HealthPoller    │
//! └────────┬────────┘     └────────┬─────────┘
//!          │                       │
//!          ▼                       │
//! ┌─────────────────┐              │
//! │   Registrar     │              │
//! └────────┬────────┘              │
//!          ▼                       ▼
//! ┌──────────────────────────────────────────┐
//! │ EdgeXConnector (Consul, CoreData,        │
//! │   ExportClient, MetaData)                │
//! └────────┬─────────────────────────────────┘
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ BackendClient   │────▶│ HttpClient       │
//! │ (retry, faults) │     │ (reqwest/fake)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Client calls return [`RequestError`], which is either a classified
//! [`Fault`] or a JSON encode/decode error:
//!
//! ```rust
//! use edgex_health_core::{RequestError, Status};
//!
//! fn is_missing(error: &RequestError) -> bool {
//!     error.status() == Some(Status::NotFound)
//! }
//! ```
//!
//! The registrar and poller log failures and carry on; `start` and `close`
//! never fail.

pub mod backend;
pub mod client;
pub mod config;
pub mod connector;
pub mod fault;
pub mod health;
pub mod http_client;
pub mod model;
pub mod monitor;
pub mod registration;
pub mod retry;

pub use backend::BackendId;

pub use client::{
    BackendClient, RequestContext, RequestError, RequestOptions, DEADLINE_EXCEEDED_CODE,
    TRANSPORT_ERROR_CODE, UNEXPECTED_STATUS_CODE, USER_AGENT,
};

pub use config::{ConfigError, Configuration, ExportEndpoint};

pub use connector::EdgeXConnector;

pub use fault::{Fault, Status};

pub use health::HealthPoller;

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient, RequestAuthenticator,
};

pub use model::{
    Addressable, ConsulStatus, ConsulStatusResponse, Device, DeviceProfile, DeviceService,
    EdgeXComponents, ExportClient, ValueDescriptor,
};

pub use monitor::HealthMonitor;

pub use registration::{
    ComponentOutcome, ComponentReport, Presence, Registrar, RegistrationOptions, ResourceKind,
};

pub use retry::{Backoff, RetryConfig};
