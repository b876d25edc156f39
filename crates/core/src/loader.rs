//! Authorized request dispatch
//!
//! [`DataLoader`] wraps arbitrary outgoing API requests that need a bearer
//! token. It attaches a usable token when one exists; otherwise it starts
//! (or joins) a single shared authorization and sends the request once that
//! settles. Concurrent requests arriving during an in-flight authorization
//! all share its outcome: one network round trip, however many callers.
//!
//! A request answered with 401 is treated as "token invalidated": the
//! stored access token is dropped, a fresh one is acquired, and the request
//! is retried exactly once before the response is surfaced as-is.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{AuthError, AuthResult};
use crate::flow::{Authorizer, AuthorizeParams};
use crate::request::WireRequest;
use crate::transport::{Transport, WireResponse};

type SharedAuthorize = Shared<BoxFuture<'static, Result<String, AuthError>>>;

/// Attach a bearer token to a request, replacing any previous
/// `Authorization` header.
pub fn attach_bearer(request: &mut WireRequest, token: &str) {
    request.set_header("Authorization", format!("Bearer {token}"));
}

/// Dispatcher for API requests that require authorization.
///
/// Holds a non-owning handle to the [`Authorizer`] to query and acquire
/// tokens, and sends requests over the authorizer's transport.
pub struct DataLoader<T: Transport + 'static> {
    authorizer: Arc<Authorizer<T>>,
    params: AuthorizeParams,
    in_flight: Mutex<Option<SharedAuthorize>>,
}

impl<T: Transport + 'static> DataLoader<T> {
    /// Create a loader on top of an authorizer.
    #[must_use]
    pub fn new(authorizer: Arc<Authorizer<T>>) -> Self {
        Self { authorizer, params: AuthorizeParams::default(), in_flight: Mutex::new(None) }
    }

    /// Authorization inputs used when the loader has to trigger an
    /// acquisition itself (e.g. password-grant credentials).
    #[must_use]
    pub fn with_authorize_params(mut self, params: AuthorizeParams) -> Self {
        self.params = params;
        self
    }

    /// Send a request with a valid bearer token attached.
    ///
    /// Acquires a token first when necessary, retries once on 401, and
    /// otherwise returns the response untouched; status interpretation
    /// beyond the retry is the caller's business.
    pub async fn perform(&self, request: WireRequest) -> AuthResult<WireResponse> {
        let transport = self.authorizer.transport();
        let mut retried = false;

        loop {
            let token = self.ensure_token().await?;
            let mut outgoing = request.clone();
            attach_bearer(&mut outgoing, &token);

            let response = transport.send(outgoing).await?;
            if response.status == 401 && !retried {
                retried = true;
                warn!(url = %request.url, "request unauthorized; invalidating token and retrying");
                self.authorizer.invalidate_access_token().await;
                continue;
            }
            return Ok(response);
        }
    }

    /// Return a usable access token, joining the in-flight authorization if
    /// one is already running.
    async fn ensure_token(&self) -> AuthResult<String> {
        if let Some(token) = self.authorizer.usable_access_token().await {
            return Ok(token);
        }

        let shared = {
            let mut slot = self.in_flight.lock().await;
            // The previous holder may have finished while we waited for the
            // slot.
            if let Some(token) = self.authorizer.usable_access_token().await {
                return Ok(token);
            }
            match slot.as_ref() {
                Some(shared) => {
                    debug!("joining in-flight authorization");
                    shared.clone()
                }
                None => {
                    let authorizer = self.authorizer.clone();
                    let params = self.params.clone();
                    let shared = async move {
                        authorizer.authorize(&params).await.map(|record| record.access_token)
                    }
                    .boxed()
                    .shared();
                    *slot = Some(shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&shared)) {
            *slot = None;
        }
        result
    }
}

impl<T: Transport + 'static> std::fmt::Debug for DataLoader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLoader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the loader against the scripted transport; the
    //! wiremock end-to-end variants live in the integration tests.
    use serde_json::json;
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;
    use crate::grant::GrantType;
    use crate::testing::MockTransport;

    fn config() -> ClientConfig {
        ClientConfig {
            client_id: Some("abc".to_string()),
            client_secret: Some("def".to_string()),
            token_url: Some(Url::parse("https://auth.ful.io/token").unwrap()),
            ..ClientConfig::default()
        }
    }

    fn api_request() -> WireRequest {
        WireRequest {
            method: crate::request::HttpMethod::Get,
            url: Url::parse("https://api.ful.io/things").unwrap(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn loader_with(transport: MockTransport) -> DataLoader<MockTransport> {
        let authorizer =
            Arc::new(Authorizer::new(GrantType::ClientCredentials, config(), transport));
        DataLoader::new(authorizer)
    }

    /// Validates `DataLoader::perform` behavior for the missing token
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the loader acquires a token before sending.
    /// - Ensures the API request carries the resulting bearer token.
    #[tokio::test]
    async fn test_acquires_token_before_sending() {
        let transport = MockTransport::new();
        transport.enqueue_json(
            200,
            json!({ "access_token": "tok", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(200, json!({ "ok": true }));

        let loader = loader_with(transport);
        let response = loader.perform(api_request()).await.unwrap();
        assert_eq!(response.status, 200);

        let sent = loader.authorizer.transport().sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url.path(), "/token");
        assert_eq!(sent[1].header("Authorization"), Some("Bearer tok"));
    }

    /// Validates `DataLoader::perform` behavior for the 401 retry scenario.
    ///
    /// Assertions:
    /// - Ensures a 401 clears the token, re-authorizes, and retries once
    ///   with the fresh token.
    /// - Ensures a persistent 401 is surfaced after the single retry.
    #[tokio::test]
    async fn test_retries_once_on_unauthorized() {
        let transport = MockTransport::new();
        // First acquisition, then 401, then re-acquisition, then success.
        transport.enqueue_json(
            200,
            json!({ "access_token": "stale", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(401, json!({ "error": "invalid_token" }));
        transport.enqueue_json(
            200,
            json!({ "access_token": "fresh", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(200, json!({ "ok": true }));

        let loader = loader_with(transport);
        let response = loader.perform(api_request()).await.unwrap();
        assert_eq!(response.status, 200);

        let sent = loader.authorizer.transport().sent();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1].header("Authorization"), Some("Bearer stale"));
        assert_eq!(sent[3].header("Authorization"), Some("Bearer fresh"));

        // A request that stays unauthorized comes back as the final 401.
        let transport = MockTransport::new();
        transport.enqueue_json(
            200,
            json!({ "access_token": "t1", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(401, json!({}));
        transport.enqueue_json(
            200,
            json!({ "access_token": "t2", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(401, json!({}));

        let loader = loader_with(transport);
        let response = loader.perform(api_request()).await.unwrap();
        assert_eq!(response.status, 401);
        assert_eq!(loader.authorizer.transport().request_count(), 4);
    }

    /// Validates `DataLoader::perform` behavior for the concurrent request
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures two concurrent requests trigger exactly one token
    ///   acquisition.
    /// - Ensures both requests complete with the shared token attached.
    #[tokio::test]
    async fn test_concurrent_requests_share_one_authorization() {
        let transport = MockTransport::new();
        transport.enqueue_json(
            200,
            json!({ "access_token": "tok", "token_type": "bearer", "expires_in": 3600 }),
        );
        transport.enqueue_json(200, json!({ "first": true }));
        transport.enqueue_json(200, json!({ "second": true }));

        let loader = Arc::new(loader_with(transport));
        let (a, b) = tokio::join!(loader.perform(api_request()), loader.perform(api_request()));
        assert_eq!(a.unwrap().status, 200);
        assert_eq!(b.unwrap().status, 200);

        let sent = loader.authorizer.transport().sent();
        let token_requests = sent.iter().filter(|r| r.url.path() == "/token").count();
        assert_eq!(token_requests, 1);
        for request in sent.iter().filter(|r| r.url.path() != "/token") {
            assert_eq!(request.header("Authorization"), Some("Bearer tok"));
        }
    }

    /// Validates `DataLoader::perform` behavior for the shared failure
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures concurrent requests fail with the same authorization
    ///   error when acquisition fails.
    #[tokio::test]
    async fn test_concurrent_requests_share_failure() {
        let transport = MockTransport::new();
        // Scripted twice: requests that join the in-flight authorization
        // share the first outcome and leave the second unconsumed.
        transport.enqueue_json(403, json!({}));
        transport.enqueue_json(403, json!({}));

        let loader = Arc::new(loader_with(transport));
        let (a, b) = tokio::join!(loader.perform(api_request()), loader.perform(api_request()));

        let errors = [a.unwrap_err(), b.unwrap_err()];
        for error in errors {
            assert_eq!(error, AuthError::Forbidden);
        }
    }
}
