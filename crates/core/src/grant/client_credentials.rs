//! Client-credentials grant
//!
//! The client trades its own id/secret for a token; no resource owner is
//! involved. Both credentials are mandatory, which makes this the one grant
//! that can never run as a public client.

use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};
use crate::request::AuthRequest;

/// Build the client-credentials token request.
pub fn access_token_request(config: &ClientConfig) -> AuthResult<AuthRequest> {
    config.require_client_id()?;
    if config.client_secret().is_none() {
        return Err(AuthError::NoClientSecret);
    }

    let mut request = AuthRequest::post(config.resolved_token_url()?);
    request.set_param("grant_type", "client_credentials");
    if let Some(scope) = config.scope.as_deref().filter(|s| !s.is_empty()) {
        request.set_param("scope", scope);
    }
    Ok(request)
}
