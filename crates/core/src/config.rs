//! Client configuration for OAuth 2.0 authorization servers
//!
//! [`ClientConfig`] is the single source of truth for client credentials,
//! endpoint URLs, and request-shaping policy. It is owned and mutated
//! exclusively by the [`Authorizer`](crate::flow::Authorizer): dynamic
//! registration fills in the client id/secret, token responses never touch
//! it.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{AuthError, AuthResult};

/// Out-of-band redirect value used by manual/installed-app flows.
pub const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// OAuth client configuration.
///
/// All endpoint URLs must be `https` except loopback addresses, which are
/// exempt so that local development servers and installed-app callback
/// listeners keep working.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// OAuth client id. `None` until configured or dynamically registered.
    pub client_id: Option<String>,

    /// OAuth client secret. Public clients have none.
    pub client_secret: Option<String>,

    /// Authorization endpoint.
    pub authorize_url: Option<Url>,

    /// Token endpoint. Falls back to `authorize_url` when absent.
    pub token_url: Option<Url>,

    /// Dynamic client registration endpoint (RFC 7591).
    pub registration_url: Option<Url>,

    /// Scopes to request (space-separated).
    pub scope: Option<String>,

    /// Registered redirect URIs; the first one is the default redirect.
    pub redirect_uris: Vec<String>,

    /// Extra parameters appended to every authorize and token request.
    pub custom_parameters: BTreeMap<String, String>,

    /// Send `client_id`/`client_secret` in the request body instead of an
    /// HTTP Basic `Authorization` header.
    pub secret_in_body: bool,

    /// Treat an access token without an expiry as still valid.
    pub assume_unexpired: bool,

    /// Reject token responses that omit `token_type`. Some providers leave
    /// it out; set to `false` to tolerate them.
    pub require_token_type: bool,

    /// Client name sent during dynamic registration.
    pub client_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: None,
            token_url: None,
            registration_url: None,
            scope: None,
            redirect_uris: Vec::new(),
            custom_parameters: BTreeMap::new(),
            secret_in_body: false,
            assume_unexpired: true,
            require_token_type: true,
            client_name: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a pre-provisioned client.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self { client_id: Some(client_id.into()), ..Self::default() }
    }

    /// The client id, if one is configured and non-empty.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.is_empty())
    }

    /// The client secret, if one is configured and non-empty.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// The client id, or `AuthError::NoClientId`.
    pub fn require_client_id(&self) -> AuthResult<&str> {
        self.client_id().ok_or(AuthError::NoClientId)
    }

    /// The endpoint used for token requests: `token_url`, falling back to
    /// `authorize_url`.
    pub fn resolved_token_url(&self) -> AuthResult<Url> {
        self.token_url
            .clone()
            .or_else(|| self.authorize_url.clone())
            .ok_or(AuthError::NoTokenUrl)
    }

    /// Resolve the redirect to use: explicit argument first, else the first
    /// configured redirect URI.
    pub fn resolved_redirect(&self, explicit: Option<&str>) -> AuthResult<String> {
        explicit
            .filter(|r| !r.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| self.redirect_uris.first().cloned())
            .ok_or(AuthError::NoRedirectUrl)
    }
}

/// Refuse non-TLS endpoints, with a loopback exemption for local callback
/// listeners and development servers.
pub fn enforce_tls(url: &Url) -> AuthResult<()> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback_host(url) => Ok(()),
        _ => Err(AuthError::NotUsingTls(url.to_string())),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]" | "::1"))
}
