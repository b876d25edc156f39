//! Error types for the OAuth 2.0 client engine
//!
//! Every failure path in the engine surfaces as an [`AuthError`]. Errors are
//! terminal for the operation that raised them; the only built-in recovery
//! paths are the refresh-then-reauthorize fallback in the authorizer and the
//! single 401-triggered retry in the data loader, both of which are bounded.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised by the OAuth 2.0 client engine.
///
/// Variants mirror the failure domains of the protocol: local
/// misconfiguration (missing client id, missing endpoint URLs), security
/// violations (plaintext endpoints, CSRF state mismatch), malformed or
/// hostile server responses, and plain network trouble.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// No client id has been configured or registered.
    #[error("no client id")]
    NoClientId,

    /// The active grant requires a client secret and none is configured.
    #[error("no client secret")]
    NoClientSecret,

    /// No authorization endpoint URL is configured.
    #[error("no authorize URL")]
    NoAuthorizeUrl,

    /// No token endpoint URL is configured (and no authorize URL to fall
    /// back to).
    #[error("no token URL")]
    NoTokenUrl,

    /// No redirect URL could be resolved, or no authorization attempt is
    /// pending for an incoming redirect.
    #[error("no redirect URL")]
    NoRedirectUrl,

    /// The redirect URL received from the server could not be interpreted.
    #[error("invalid redirect URL: {0}")]
    InvalidRedirectUrl(String),

    /// A refresh was requested but no refresh token is available.
    #[error("no refresh token")]
    NoRefreshToken,

    /// The token response carried no `token_type` and the configuration
    /// does not tolerate that.
    #[error("no token type in response")]
    NoTokenType,

    /// The token response declared a token type other than `bearer`.
    #[error("unsupported token type: {0}")]
    UnsupportedTokenType(String),

    /// Refused to talk to a non-TLS endpoint.
    #[error("not using TLS: {0}")]
    NotUsingTls(String),

    /// The `state` parameter in the redirect did not match the pending
    /// authorization attempt (CSRF).
    #[error("state parameter mismatch")]
    InvalidState,

    /// The redirect carried no `state` parameter at all.
    #[error("no state parameter in redirect")]
    MissingState,

    /// Dynamic registration was needed but no registration URL is
    /// configured.
    #[error("no registration URL")]
    NoRegistrationUrl,

    /// The password grant requires a username and none was supplied.
    #[error("no username")]
    NoUsername,

    /// The password grant requires a password and none was supplied.
    #[error("no password")]
    NoPassword,

    /// The authorization server rejected the supplied resource-owner
    /// credentials.
    #[error("wrong username or password")]
    WrongUsernamePassword,

    /// The server answered 403 to a token request.
    #[error("forbidden")]
    Forbidden,

    /// The resource owner or authorization server denied the request.
    #[error("access denied")]
    AccessDenied,

    /// The server returned an explicit OAuth error response.
    #[error("{0}")]
    Response(String),

    /// The response carried no usable payload.
    #[error("no data in response")]
    NoDataInResponse,

    /// No way to present the authorization UI: an interactive grant was
    /// started without a presenter.
    #[error("no authorization context to present from")]
    NoAuthorizationContext,

    /// The transport failed before a response was received. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// The token store failed to persist or load credentials.
    #[error("storage error: {0}")]
    Storage(String),

    /// The in-flight authorization was cancelled by the caller.
    #[error("request cancelled")]
    RequestCancelled,

    /// Anything else, including bare HTTP status codes.
    #[error("{0}")]
    Generic(String),
}

impl AuthError {
    /// Map a standard OAuth 2.0 error code (RFC 6749 §4.1.2.1 / §5.2) to a
    /// typed error, preferring the server-supplied description when one is
    /// present.
    #[must_use]
    pub fn from_oauth_code(code: &str, description: Option<&str>) -> Self {
        if code == "access_denied" {
            return Self::AccessDenied;
        }
        let text = description
            .filter(|d| !d.is_empty())
            .map(ToOwned::to_owned)
            .or_else(|| standard_code_description(code).map(ToOwned::to_owned))
            .unwrap_or_else(|| code.to_owned());
        Self::Response(text)
    }

    /// Whether retrying the same operation can reasonably succeed.
    ///
    /// Only transport-level failures qualify; protocol and configuration
    /// errors are deterministic.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// Human-readable descriptions for the standard OAuth 2.0 error codes.
fn standard_code_description(code: &str) -> Option<&'static str> {
    match code {
        "invalid_request" => {
            Some("The request is missing a parameter or is otherwise malformed")
        }
        "invalid_client" => Some("Client authentication failed"),
        "invalid_grant" => {
            Some("The provided authorization grant or refresh token is invalid")
        }
        "unauthorized_client" => {
            Some("The client is not authorized to use this grant type")
        }
        "unsupported_grant_type" => {
            Some("The authorization server does not support this grant type")
        }
        "unsupported_response_type" => {
            Some("The authorization server does not support this response type")
        }
        "invalid_scope" => Some("The requested scope is invalid, unknown, or malformed"),
        "server_error" => {
            Some("The authorization server encountered an unexpected condition")
        }
        "temporarily_unavailable" => {
            Some("The authorization server is temporarily unable to handle the request")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error mapping.
    use super::*;

    /// Validates `AuthError::from_oauth_code` behavior for the access denied
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `access_denied` maps to `AuthError::AccessDenied` with and
    ///   without a description.
    #[test]
    fn test_access_denied_mapping() {
        assert_eq!(AuthError::from_oauth_code("access_denied", None), AuthError::AccessDenied);
        assert_eq!(
            AuthError::from_oauth_code("access_denied", Some("user said no")),
            AuthError::AccessDenied
        );
    }

    /// Validates `AuthError::from_oauth_code` behavior for the description
    /// precedence scenario.
    ///
    /// Assertions:
    /// - Ensures a server-supplied description wins over the standard text.
    /// - Ensures a known code without a description falls back to the
    ///   standard text.
    /// - Ensures an unknown code without a description echoes the code.
    #[test]
    fn test_response_error_description() {
        assert_eq!(
            AuthError::from_oauth_code("invalid_scope", Some("scope 'x' is unknown")),
            AuthError::Response("scope 'x' is unknown".to_string())
        );
        assert_eq!(
            AuthError::from_oauth_code("invalid_scope", None),
            AuthError::Response(
                "The requested scope is invalid, unknown, or malformed".to_string()
            )
        );
        assert_eq!(
            AuthError::from_oauth_code("rate_limited", None),
            AuthError::Response("rate_limited".to_string())
        );
    }

    /// Validates `AuthError::is_retryable` behavior for the classification
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `AuthError::Network` is retryable.
    /// - Ensures protocol errors are not retryable.
    #[test]
    fn test_retryability() {
        assert!(AuthError::Network("timeout".to_string()).is_retryable());
        assert!(!AuthError::InvalidState.is_retryable());
        assert!(!AuthError::Forbidden.is_retryable());
    }
}
