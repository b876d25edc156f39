//! Resource-owner password credentials grant
//!
//! Exchanges a username/password pair for a token in a single POST. No
//! browser redirect is involved, so there is no authorize URL and no
//! `response_type` in this flow.

use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};
use crate::request::AuthRequest;

/// Build the password-grant token request.
///
/// Both credentials must be non-empty. `client_id` rides along in the body
/// for public clients; confidential clients authenticate through the shared
/// builder placement instead.
pub fn access_token_request(
    config: &ClientConfig,
    username: &str,
    password: &str,
) -> AuthResult<AuthRequest> {
    if username.is_empty() {
        return Err(AuthError::NoUsername);
    }
    if password.is_empty() {
        return Err(AuthError::NoPassword);
    }

    let mut request = AuthRequest::post(config.resolved_token_url()?);
    request.set_param("grant_type", "password");
    request.set_param("username", username);
    request.set_param("password", password);
    if let Some(scope) = config.scope.as_deref().filter(|s| !s.is_empty()) {
        request.set_param("scope", scope);
    }
    if config.client_secret().is_none() {
        if let Some(client_id) = config.client_id() {
            request.set_param("client_id", client_id.to_owned());
        }
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    //! Unit tests for the password strategy.
    use url::Url;

    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            client_id: Some("abc".to_string()),
            token_url: Some(Url::parse("https://auth.ful.io/token").unwrap()),
            scope: Some("profile".to_string()),
            ..ClientConfig::default()
        }
    }

    /// Validates `access_token_request` behavior for the missing credential
    /// scenarios.
    ///
    /// Assertions:
    /// - Ensures an empty username raises `NoUsername`.
    /// - Ensures an empty password raises `NoPassword`.
    #[test]
    fn test_credentials_required() {
        let config = config();
        assert!(matches!(
            access_token_request(&config, "", "secret"),
            Err(AuthError::NoUsername)
        ));
        assert!(matches!(
            access_token_request(&config, "alice", ""),
            Err(AuthError::NoPassword)
        ));
    }

    /// Validates `access_token_request` behavior for the request shape
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the body carries `grant_type=password`, both credentials,
    ///   the configured scope, and the public client id.
    #[test]
    fn test_request_shape() {
        let config = config();
        let request = access_token_request(&config, "alice", "s3cret").unwrap();
        let wire = request.into_wire(&config).unwrap();
        let body = String::from_utf8(wire.body.unwrap()).unwrap();

        assert!(body.contains("grant_type=password"));
        assert!(body.contains("username=alice"));
        assert!(body.contains("password=s3cret"));
        assert!(body.contains("scope=profile"));
        assert!(body.contains("client_id=abc"));
    }
}
