//! Transport seam between the engine and an HTTP client
//!
//! The engine never talks to the network directly: every request goes
//! through the [`Transport`] trait, which keeps the protocol layer testable
//! and client-library agnostic. [`HttpTransport`] is the stock reqwest-based
//! implementation. Transport owns timeouts; a timeout surfaces as a plain
//! network error, which the engine classifies as retryable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AuthError, AuthResult};
use crate::request::{HttpMethod, WireRequest};
use crate::token::RawParams;

/// Response handed back by a transport.
#[derive(Debug, Clone)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Whether the status is below 400.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// Decode the body as a JSON object.
    ///
    /// An empty or non-object body raises `NoDataInResponse`; error bodies
    /// that are not JSON should use [`Self::json_map_or_empty`] instead.
    pub fn json_map(&self) -> AuthResult<RawParams> {
        if self.body.is_empty() {
            return Err(AuthError::NoDataInResponse);
        }
        match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            _ => Err(AuthError::NoDataInResponse),
        }
    }

    /// Decode the body as a JSON object, tolerating anything that isn't
    /// one. Used on failure statuses where the body is advisory.
    #[must_use]
    pub fn json_map_or_empty(&self) -> RawParams {
        self.json_map().unwrap_or_default()
    }
}

/// Asynchronous request dispatch.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the response, whatever its status.
    /// Errors are reserved for failures to obtain a response at all.
    async fn send(&self, request: WireRequest) -> AuthResult<WireResponse>;
}

/// reqwest-backed transport with a 30 second timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default client configuration.
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// Wrap an existing reqwest client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> AuthResult<WireResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?
            .to_vec();

        Ok(WireResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for response decoding.
    use super::*;

    /// Validates `WireResponse::json_map` behavior for the decoding
    /// scenarios.
    ///
    /// Assertions:
    /// - Ensures a JSON object body decodes.
    /// - Ensures empty and non-object bodies raise `NoDataInResponse`.
    /// - Ensures the tolerant variant returns an empty map instead.
    #[test]
    fn test_json_decoding() {
        let ok = WireResponse { status: 200, body: br#"{"access_token":"abc"}"#.to_vec() };
        assert_eq!(ok.json_map().unwrap().get("access_token").unwrap(), "abc");

        let empty = WireResponse { status: 200, body: Vec::new() };
        assert!(matches!(empty.json_map(), Err(AuthError::NoDataInResponse)));

        let html = WireResponse { status: 502, body: b"<html>bad gateway</html>".to_vec() };
        assert!(matches!(html.json_map(), Err(AuthError::NoDataInResponse)));
        assert!(html.json_map_or_empty().is_empty());
        assert!(!html.is_success());
    }
}
