//! Mock implementations of the transport and presentation seams.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;

use crate::error::{AuthError, AuthResult};
use crate::flow::AuthorizationPresenter;
use crate::request::WireRequest;
use crate::transport::{Transport, WireResponse};

/// Transport double that plays back scripted responses in order and keeps
/// every request it was asked to send.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<AuthResult<WireResponse>>>,
    requests: Mutex<Vec<WireRequest>>,
}

impl MockTransport {
    /// Create an empty transport; sending without a scripted response
    /// yields a network error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response with the given status and JSON body.
    pub fn enqueue_json(&self, status: u16, body: serde_json::Value) {
        let body = body.to_string().into_bytes();
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(WireResponse { status, body }));
    }

    /// Script a raw response.
    pub fn enqueue_raw(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(WireResponse { status, body: body.into() }));
    }

    /// Script a transport failure.
    pub fn enqueue_error(&self, error: AuthError) {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner).push_back(Err(error));
    }

    /// Every request sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<WireRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: WireRequest) -> AuthResult<WireResponse> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(AuthError::Network("no scripted response left".to_string()))
            })
    }
}

/// Presenter double that fabricates the redirect a user's browser would
/// come back with, derived from the authorize URL it was shown.
pub struct RedirectPresenter {
    respond: Box<dyn Fn(&Url) -> AuthResult<Url> + Send + Sync>,
}

impl RedirectPresenter {
    /// Create a presenter from a redirect-computing closure. The closure
    /// typically extracts the `state` query parameter and echoes it back.
    pub fn new(respond: impl Fn(&Url) -> AuthResult<Url> + Send + Sync + 'static) -> Self {
        Self { respond: Box::new(respond) }
    }

    /// A presenter that simulates the user cancelling the flow.
    #[must_use]
    pub fn cancelling() -> Self {
        Self::new(|_| Err(AuthError::RequestCancelled))
    }
}

impl std::fmt::Debug for RedirectPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectPresenter").finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthorizationPresenter for RedirectPresenter {
    async fn present(&self, authorize_url: Url) -> AuthResult<Url> {
        (self.respond)(&authorize_url)
    }
}

/// Pull a query parameter out of an authorize URL; mock presenters use
/// this to echo the `state` back in the fabricated redirect.
#[must_use]
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs().find(|(k, _)| k == name).map(|(_, v)| v.into_owned())
}
