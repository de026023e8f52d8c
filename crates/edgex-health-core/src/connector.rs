//! One retrying client per EdgeX backend.
//!
//! Each backend's base URL is the configured EdgeX endpoint followed by the
//! backend's path prefix, e.g. `http://localhost` + `:48081/api/v1`.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::backend::BackendId;
use crate::client::{BackendClient, RequestContext, RequestError, RequestOptions};
use crate::config::EdgeXConnectorConfig;
use crate::http_client::{HttpClient, ReqwestHttpClient, RequestAuthenticator};

#[derive(Clone)]
struct Backends {
    consul: BackendClient,
    core_data: BackendClient,
    export_client: BackendClient,
    meta_data: BackendClient,
}

/// Routes REST calls to the Consul, CoreData, ExportClient and MetaData APIs.
#[derive(Clone)]
pub struct EdgeXConnector {
    backends: Backends,
    timeout: Duration,
}

impl EdgeXConnector {
    /// Connector using the reqwest transport.
    pub fn new(config: &EdgeXConnectorConfig) -> Self {
        Self::with_http_client(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn with_http_client(config: &EdgeXConnectorConfig, http: Arc<dyn HttpClient>) -> Self {
        let retry = config.retry_config();
        let client = |base_path: &str| {
            BackendClient::new(
                format!("{}{}", config.base_url, base_path),
                Arc::clone(&http),
                retry.clone(),
            )
        };

        Self {
            backends: Backends {
                consul: client(&config.consul.base_path),
                core_data: client(&config.core_data.base_path),
                export_client: client(&config.export_client.base_path),
                meta_data: client(&config.meta_data.base_path),
            },
            timeout: config.timeout(),
        }
    }

    /// Installs the same auth hook on every backend.
    pub fn with_authenticator(mut self, auth: Arc<dyn RequestAuthenticator>) -> Self {
        for id in BackendId::ALL {
            let client = self.client_mut(id);
            *client = client.clone().with_authenticator(Arc::clone(&auth));
        }
        self
    }

    pub fn client(&self, backend: BackendId) -> &BackendClient {
        match backend {
            BackendId::Consul => &self.backends.consul,
            BackendId::CoreData => &self.backends.core_data,
            BackendId::ExportClient => &self.backends.export_client,
            BackendId::MetaData => &self.backends.meta_data,
        }
    }

    fn client_mut(&mut self, backend: BackendId) -> &mut BackendClient {
        match backend {
            BackendId::Consul => &mut self.backends.consul,
            BackendId::CoreData => &mut self.backends.core_data,
            BackendId::ExportClient => &mut self.backends.export_client,
            BackendId::MetaData => &mut self.backends.meta_data,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn context(&self, request_id: Option<&str>) -> RequestContext {
        RequestContext::with_timeout(self.timeout).maybe_request_id(request_id)
    }

    /// GET expecting 200, ignoring the body.
    pub async fn get_request(
        &self,
        backend: BackendId,
        path: &str,
        request_id: Option<&str>,
    ) -> Result<(), RequestError> {
        let ctx = self.context(request_id);
        self.client(backend)
            .get(&ctx, path, &RequestOptions::new())
            .await
    }

    /// GET expecting 200 and decode the body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        backend: BackendId,
        path: &str,
        request_id: Option<&str>,
    ) -> Result<T, RequestError> {
        let ctx = self.context(request_id);
        self.client(backend)
            .get_json(&ctx, path, &RequestOptions::new())
            .await
    }

    pub async fn post_request<B: Serialize + ?Sized>(
        &self,
        backend: BackendId,
        path: &str,
        body: &B,
        request_id: Option<&str>,
    ) -> Result<(), RequestError> {
        let options = RequestOptions::new().with_json_body(body)?;
        let ctx = self.context(request_id);
        self.client(backend).post(&ctx, path, &options).await
    }

    pub async fn delete_request(
        &self,
        backend: BackendId,
        path: &str,
        request_id: Option<&str>,
    ) -> Result<(), RequestError> {
        let ctx = self.context(request_id);
        self.client(backend)
            .delete(&ctx, path, &RequestOptions::new())
            .await
    }
}
