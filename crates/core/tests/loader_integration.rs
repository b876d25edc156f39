//! Integration tests for the data loader
//!
//! Exercises the loader against wiremock servers: token acquisition on
//! demand, coalescing of concurrent requests into one authorization, and
//! the single 401-triggered retry with token invalidation.

use std::sync::Arc;
use std::time::Duration;

use authrelay_core::{
    Authorizer, ClientConfig, DataLoader, GrantType, HttpMethod, HttpTransport, WireRequest,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn server_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        client_id: Some("abc".to_string()),
        client_secret: Some("def".to_string()),
        token_url: Some(Url::parse(&format!("{}/token", server.uri())).unwrap()),
        ..ClientConfig::default()
    }
}

fn api_request(server: &MockServer, path: &str) -> WireRequest {
    WireRequest {
        method: HttpMethod::Get,
        url: Url::parse(&format!("{}{path}", server.uri())).unwrap(),
        headers: Vec::new(),
        body: None,
    }
}

fn loader_for(server: &MockServer) -> Arc<DataLoader<HttpTransport>> {
    let authorizer = Arc::new(Authorizer::new(
        GrantType::ClientCredentials,
        server_config(server),
        HttpTransport::new(),
    ));
    Arc::new(DataLoader::new(authorizer))
}

fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600
    }))
}

/// Validates that two concurrent requests with no token on hand trigger
/// exactly one authorization.
///
/// The token endpoint is scripted with `expect(1)` and a delay long enough
/// that both requests are queued while the acquisition is in flight; both
/// must then complete carrying the shared token.
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_requests_single_authorization() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("shared-token").set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("Authorization", "Bearer shared-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader_for(&server);
    let (a, b) = tokio::join!(
        loader.perform(api_request(&server, "/things")),
        loader.perform(api_request(&server, "/things"))
    );

    assert_eq!(a.unwrap().status, 200);
    assert_eq!(b.unwrap().status, 200);
    // expectations (1 token request, 2 API requests) verified on drop
}

/// Validates the 401-triggered retry.
///
/// The first API attempt carries a token the server no longer accepts; the
/// loader must invalidate it, acquire a fresh one, and retry exactly once.
#[tokio::test(flavor = "multi_thread")]
async fn test_unauthorized_response_triggers_one_retry() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("first-token"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("second-token"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("Authorization", "Bearer first-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("Authorization", "Bearer second-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let loader = loader_for(&server);
    let response = loader.perform(api_request(&server, "/things")).await.unwrap();
    assert_eq!(response.status, 200);
}

/// Validates that a request that stays unauthorized is surfaced after the
/// single retry instead of looping.
#[tokio::test(flavor = "multi_thread")]
async fn test_persistent_unauthorized_is_surfaced() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("any-token"))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let loader = loader_for(&server);
    let response = loader.perform(api_request(&server, "/things")).await.unwrap();
    assert_eq!(response.status, 401);
}

/// Validates that a request with a usable token on hand goes out
/// immediately, with no token endpoint round trip.
#[tokio::test(flavor = "multi_thread")]
async fn test_existing_token_is_attached_directly() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("only-token"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("Authorization", "Bearer only-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(3)
        .mount(&server)
        .await;

    let loader = loader_for(&server);
    for _ in 0..3 {
        let response = loader.perform(api_request(&server, "/things")).await.unwrap();
        assert_eq!(response.status, 200);
    }
}
