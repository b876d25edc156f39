//! Authorization-code grant: exchanging a redirect code for a token
//!
//! The browser round trip is driven by the authorizer; this module builds
//! the follow-up token request once a code has been extracted from the
//! redirect query and validated against the pending context.

use crate::config::{enforce_tls, ClientConfig};
use crate::context::AuthContext;
use crate::error::{AuthError, AuthResult};
use crate::request::AuthRequest;

/// Build the code-for-token exchange request.
///
/// The `redirect_uri` must echo the redirect the authorization attempt was
/// started with; a context without one means no attempt is pending and the
/// exchange refuses to run. The token endpoint must be TLS.
pub fn access_token_request(
    config: &ClientConfig,
    context: &AuthContext,
    code: &str,
) -> AuthResult<AuthRequest> {
    let client_id = config.require_client_id()?.to_owned();
    let redirect = context
        .redirect_url
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or(AuthError::NoRedirectUrl)?;

    let token_url = config.resolved_token_url()?;
    enforce_tls(&token_url)?;

    let mut request = AuthRequest::post(token_url);
    request.set_param("grant_type", "authorization_code");
    request.set_param("code", code);
    request.set_param("redirect_uri", redirect);
    if let Some(verifier) = context.code_verifier.as_deref() {
        request.set_param("code_verifier", verifier);
    }
    if config.client_secret().is_none() {
        // Public client: no Basic header will identify us, the body must.
        request.set_param("client_id", client_id);
    }
    Ok(request)
}
