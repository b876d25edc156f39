//! Dynamic client registration (RFC 7591)
//!
//! Lets a client obtain its `client_id`/`client_secret` from the server at
//! runtime instead of being pre-provisioned. The authorizer invokes this
//! when it reaches the grant step of the ladder without a client id; the
//! returned credentials are fed back into the client configuration.

use serde_json::{json, Value};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{AuthError, AuthResult};
use crate::grant::GrantType;
use crate::request::AuthRequest;
use crate::transport::{Transport, WireResponse};

/// Credentials returned by a successful registration.
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    /// Issued client id.
    pub client_id: String,
    /// Issued client secret, absent for public clients.
    pub client_secret: Option<String>,
}

/// Build the JSON registration request for the active grant.
///
/// `token_endpoint_auth_method` mirrors the engine's own credential
/// placement policy, so the server registers the client the way the client
/// will actually authenticate.
pub fn registration_request(config: &ClientConfig, grant: GrantType) -> AuthResult<AuthRequest> {
    let url = config.registration_url.clone().ok_or(AuthError::NoRegistrationUrl)?;

    let auth_method =
        if config.secret_in_body { "client_secret_post" } else { "client_secret_basic" };

    let mut body = json!({
        "token_endpoint_auth_method": auth_method,
        "grant_types": [grant.registration_grant_type()],
    });
    if let Some(response_type) = grant.response_type() {
        body["response_types"] = json!([response_type]);
    }
    if !config.redirect_uris.is_empty() {
        body["redirect_uris"] = json!(config.redirect_uris);
    }
    if let Some(scope) = config.scope.as_deref().filter(|s| !s.is_empty()) {
        body["scope"] = json!(scope);
    }
    if let Some(name) = config.client_name.as_deref().filter(|n| !n.is_empty()) {
        body["client_name"] = json!(name);
    }

    Ok(AuthRequest::post_json(url, body))
}

/// Extract the issued credentials from a registration response.
pub fn parse_registration_response(response: &WireResponse) -> AuthResult<RegisteredClient> {
    if !response.is_success() {
        let params = response.json_map_or_empty();
        if let Some(code) = params.get("error").and_then(Value::as_str) {
            let description = params.get("error_description").and_then(Value::as_str);
            return Err(AuthError::from_oauth_code(code, description));
        }
        return Err(AuthError::Generic(response.status.to_string()));
    }

    let params = response.json_map()?;
    let client_id = params
        .get("client_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            AuthError::Generic("registration response contains no client_id".to_string())
        })?
        .to_owned();
    let client_secret = params
        .get("client_secret")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned);

    Ok(RegisteredClient { client_id, client_secret })
}

/// Register the client against the configured registration endpoint.
pub async fn register_client(
    transport: &dyn Transport,
    config: &ClientConfig,
    grant: GrantType,
) -> AuthResult<RegisteredClient> {
    let request = registration_request(config, grant)?;
    let response = transport.send(request.into_wire(config)?).await?;
    let registered = parse_registration_response(&response)?;

    info!(client_id = %registered.client_id, "dynamic client registration completed");
    Ok(registered)
}

#[cfg(test)]
mod tests {
    //! Unit tests for registration request/response handling.
    use url::Url;

    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            registration_url: Some(Url::parse("https://auth.ful.io/register").unwrap()),
            redirect_uris: vec!["oauth2://callback".to_string()],
            scope: Some("login".to_string()),
            client_name: Some("AuthRelay".to_string()),
            ..ClientConfig::default()
        }
    }

    fn request_json(config: &ClientConfig, grant: GrantType) -> Value {
        let wire = registration_request(config, grant).unwrap().into_wire(config).unwrap();
        serde_json::from_slice(&wire.body.unwrap()).unwrap()
    }

    /// Validates `registration_request` behavior for the request shape
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures grant/response types are derived from the active grant.
    /// - Ensures redirect URIs, scope, and client name are advertised.
    /// - Ensures the auth method follows the secret placement policy.
    #[test]
    fn test_request_shape() {
        let config = config();
        let body = request_json(&config, GrantType::AuthorizationCode);

        assert_eq!(body["grant_types"], json!(["authorization_code"]));
        assert_eq!(body["response_types"], json!(["code"]));
        assert_eq!(body["redirect_uris"], json!(["oauth2://callback"]));
        assert_eq!(body["scope"], json!("login"));
        assert_eq!(body["client_name"], json!("AuthRelay"));
        assert_eq!(body["token_endpoint_auth_method"], json!("client_secret_basic"));

        let mut config = config;
        config.secret_in_body = true;
        let body = request_json(&config, GrantType::ClientCredentials);
        assert_eq!(body["token_endpoint_auth_method"], json!("client_secret_post"));
        assert!(body.get("response_types").is_none());
    }

    /// Validates `registration_request` behavior for the missing endpoint
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `NoRegistrationUrl` when no endpoint is configured.
    #[test]
    fn test_missing_registration_url() {
        let config = ClientConfig::default();
        let result = registration_request(&config, GrantType::ClientCredentials);
        assert!(matches!(result, Err(AuthError::NoRegistrationUrl)));
    }

    /// Validates `parse_registration_response` behavior for the response
    /// scenarios.
    ///
    /// Assertions:
    /// - Ensures issued credentials are extracted.
    /// - Ensures a response without `client_id` fails.
    /// - Ensures an OAuth error body maps to a typed error.
    #[test]
    fn test_response_parsing() {
        let ok = WireResponse {
            status: 201,
            body: br#"{"client_id":"generated","client_secret":"s3cret"}"#.to_vec(),
        };
        let registered = parse_registration_response(&ok).unwrap();
        assert_eq!(registered.client_id, "generated");
        assert_eq!(registered.client_secret.as_deref(), Some("s3cret"));

        let missing = WireResponse { status: 201, body: br#"{"ok":true}"#.to_vec() };
        assert!(matches!(
            parse_registration_response(&missing),
            Err(AuthError::Generic(_))
        ));

        let denied = WireResponse {
            status: 400,
            body: br#"{"error":"invalid_redirect_uri","error_description":"bad uri"}"#.to_vec(),
        };
        assert_eq!(
            parse_registration_response(&denied).unwrap_err(),
            AuthError::Response("bad uri".to_string())
        );
    }
}
