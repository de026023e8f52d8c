#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use edgex_health_core::{
    Configuration, ExportEndpoint, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
};

pub const META_DATA: &str = "http://localhost:48081/api/v1";
pub const CORE_DATA: &str = "http://localhost:48080/api/v1";
pub const EXPORT_CLIENT: &str = "http://localhost:48071/api/v1";
pub const CONSUL: &str = "http://localhost:8500/v1";

/// Default configuration with the given export endpoints and no retries.
pub fn test_config(endpoints: &[&str]) -> Configuration {
    let mut config = Configuration::default();
    config.edgex.max_retries = 0;
    config.edgex.retry_wait_min_ms = 0;
    config.edgex.retry_wait_max_ms = 0;
    config.export_endpoints = endpoints
        .iter()
        .map(|name| ExportEndpoint {
            name: (*name).to_owned(),
            ..ExportEndpoint::default()
        })
        .collect();
    config
}

#[derive(Default)]
struct FakeState {
    existing: BTreeSet<String>,
    requests: Vec<HttpRequest>,
    lookup_failure: Option<u16>,
    failing_collections: HashSet<String>,
    consul_status: u16,
    consul_body: String,
}

/// In-memory stand-in for the EdgeX REST services and Consul.
///
/// Resources live under `<collection>/name/<encoded name>`; a POST to the
/// collection creates one, a GET on the named URL finds it, a DELETE on the
/// named URL removes it.
pub struct EdgeXFake {
    state: Mutex<FakeState>,
}

impl EdgeXFake {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                consul_status: 200,
                consul_body: String::from("[]"),
                ..FakeState::default()
            }),
        })
    }

    pub fn named_url(collection: &str, name: &str) -> String {
        format!("{collection}/name/{}", urlencoding::encode(name))
    }

    pub fn insert(&self, collection: &str, name: &str) {
        self.lock().existing.insert(Self::named_url(collection, name));
    }

    pub fn remove(&self, collection: &str, name: &str) {
        self.lock().existing.remove(&Self::named_url(collection, name));
    }

    /// Every existence check answers with `status` instead of 200/404.
    pub fn fail_lookups_with(&self, status: u16) {
        self.lock().lookup_failure = Some(status);
    }

    pub fn fail_creates_in(&self, collection: &str) {
        self.lock().failing_collections.insert(collection.to_owned());
    }

    pub fn set_consul_response(&self, status: u16, body: &str) {
        let mut state = self.lock();
        state.consul_status = status;
        state.consul_body = body.to_owned();
    }

    pub fn existing(&self) -> BTreeSet<String> {
        self.lock().existing.clone()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn urls_for(&self, method: HttpMethod) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method)
            .map(|request| request.url.clone())
            .collect()
    }

    pub fn edgex_requests(&self) -> Vec<HttpRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|request| !request.url.starts_with(CONSUL))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state lock")
    }

    fn respond(&self, request: HttpRequest) -> HttpResponse {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if request.url.starts_with(CONSUL) {
            return HttpResponse::new(state.consul_status, state.consul_body.clone());
        }

        match request.method {
            HttpMethod::Get => {
                if let Some(status) = state.lookup_failure {
                    return HttpResponse::new(status, "");
                }
                if state.existing.contains(&request.url) {
                    HttpResponse::ok_json("{}")
                } else {
                    HttpResponse::new(404, "")
                }
            }
            HttpMethod::Post => {
                if state.failing_collections.contains(&request.url) {
                    return HttpResponse::new(500, "");
                }
                let name = request
                    .body
                    .as_deref()
                    .and_then(|body| serde_json::from_str::<serde_json::Value>(body).ok())
                    .and_then(|value| value["name"].as_str().map(str::to_owned))
                    .unwrap_or_default();
                state.existing.insert(Self::named_url(&request.url, &name));
                HttpResponse::ok_json("\"id\"")
            }
            HttpMethod::Delete => {
                if state.existing.remove(&request.url) {
                    HttpResponse::new(200, "")
                } else {
                    HttpResponse::new(404, "")
                }
            }
            HttpMethod::Patch => HttpResponse::new(200, ""),
        }
    }
}

impl HttpClient for EdgeXFake {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.respond(request)) })
    }
}
