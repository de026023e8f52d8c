use std::sync::Arc;
use std::time::Duration;

use edgex_health_core::{
    BackendClient, Configuration, EdgeXConnector, ExportEndpoint, HealthPoller, HttpClient,
    Registrar, RequestContext, RequestOptions, ReqwestHttpClient, RetryConfig, Status,
    TRANSPORT_ERROR_CODE, USER_AGENT,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reqwest_client(base_url: &str, max_retries: u32) -> BackendClient {
    BackendClient::new(
        base_url,
        Arc::new(ReqwestHttpClient::new()) as Arc<dyn HttpClient>,
        RetryConfig::fixed(Duration::from_millis(10), max_retries),
    )
}

fn ctx() -> RequestContext {
    RequestContext::with_timeout(Duration::from_secs(5))
}

/// Points every backend at the mock server under a distinct prefix.
fn config_for(server: &MockServer) -> Configuration {
    let mut config = Configuration::default();
    config.edgex.base_url = server.uri();
    config.edgex.consul.base_path = String::from("/consul/v1");
    config.edgex.core_data.base_path = String::from("/coredata/api/v1");
    config.edgex.export_client.base_path = String::from("/export/api/v1");
    config.edgex.meta_data.base_path = String::from("/metadata/api/v1");
    config.edgex.max_retries = 0;
    config.export_endpoints = vec![ExportEndpoint {
        name: String::from("alerts"),
        ..ExportEndpoint::default()
    }];
    config
}

#[tokio::test]
async fn test_retries_unavailable_backend_over_http() {
    // Given: one 503, then success
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/device/name/healthmonitor"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/device/name/healthmonitor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "healthmonitor" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest_client(&format!("{}/api/v1", server.uri()), 3);

    // When
    let result = client
        .get(&ctx(), "device/name/healthmonitor", &RequestOptions::new())
        .await;

    // Then
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_sends_request_id_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ping"))
        .and(header("x-request-id", "pass-42"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest_client(&format!("{}/api/v1", server.uri()), 0);

    client
        .get(&ctx().request_id("pass-42"), "ping", &RequestOptions::new())
        .await
        .expect("headers matched");
}

#[tokio::test]
async fn test_error_body_is_decoded_into_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deviceprofile/name/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "error": { "detail": "profile missing not found", "message": "profile_not_found" }
        })))
        .mount(&server)
        .await;

    let client = reqwest_client(&format!("{}/api/v1", server.uri()), 3);

    let error = client
        .get(&ctx(), "deviceprofile/name/missing", &RequestOptions::new())
        .await
        .expect_err("not found");

    let fault = error.fault().expect("fault");
    assert_eq!(fault.status(), Status::NotFound);
    assert_eq!(fault.code(), "profile_not_found");
    assert_eq!(fault.message(), "profile missing not found");
}

#[tokio::test]
async fn test_posts_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/device"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({ "name": "healthmonitor" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("5c1f3"))
        .expect(1)
        .mount(&server)
        .await;

    let client = reqwest_client(&format!("{}/api/v1", server.uri()), 0);
    let options = RequestOptions::new()
        .with_json_body(&json!({ "name": "healthmonitor", "labels": ["healthmonitor"] }))
        .expect("serializable");

    client.post(&ctx(), "device", &options).await.expect("created");
}

#[tokio::test]
async fn test_slow_backend_hits_the_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/device"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = reqwest_client(&format!("{}/api/v1", server.uri()), 3);
    let ctx = RequestContext::with_timeout(Duration::from_millis(200));

    let error = client
        .get(&ctx, "device", &RequestOptions::new())
        .await
        .expect_err("deadline");

    assert_eq!(error.status(), Some(Status::DeadlineExceeded));
}

#[tokio::test]
async fn test_refused_connection_surfaces_unavailable() {
    let client = reqwest_client("http://127.0.0.1:1/api/v1", 1);

    let error = client
        .get(&ctx(), "device", &RequestOptions::new())
        .await
        .expect_err("nothing listens on port 1");

    let fault = error.fault().expect("fault");
    assert_eq!(fault.status(), Status::Unavailable);
    assert_eq!(fault.code(), TRANSPORT_ERROR_CODE);
}

#[tokio::test]
async fn test_registration_pass_over_http() {
    // Given: an empty EdgeX installation
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(6)
        .mount(&server)
        .await;
    for collection in [
        "/metadata/api/v1/deviceprofile",
        "/metadata/api/v1/addressable",
        "/metadata/api/v1/deviceservice",
        "/metadata/api/v1/device",
        "/coredata/api/v1/valuedescriptor",
        "/export/api/v1/registration",
    ] {
        Mock::given(method("POST"))
            .and(path(collection))
            .respond_with(ResponseTemplate::new(200).set_body_string("new-id"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = config_for(&server);
    let connector = EdgeXConnector::new(&config.edgex);
    let mut registrar = Registrar::new(Arc::new(connector), Arc::new(config));

    // When
    let reports = registrar.register_all_components().await;

    // Then: mock expectations are verified when the server drops
    assert_eq!(reports.len(), 6);
    let received = server.received_requests().await.expect("recording enabled");
    let lookup = &received[2];
    assert_eq!(
        lookup.url.path(),
        "/metadata/api/v1/addressable/name/Health%20monitorAddressable"
    );
}

#[tokio::test]
async fn test_consul_query_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/consul/v1/health/state/any"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"Node":"n1","CheckID":"svc:1","Name":"Service Check","Status":"critical","ServiceName":"core-data"}
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let connector = EdgeXConnector::new(&config.edgex);
    let poller = HealthPoller::new(
        Arc::new(connector),
        config.edgex.consul.health.clone(),
        config.edgex.polling_interval(),
    );

    let checks = poller.query_consul().await;

    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].service_name, "core-data");
}
