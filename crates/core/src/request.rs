//! Abstract auth requests and their wire encoding
//!
//! An [`AuthRequest`] is the grant-agnostic description of a token,
//! authorize, or registration request: method, URL, unique-keyed parameters,
//! caller headers, and body encoding. [`AuthRequest::into_wire`] turns it
//! into a transport-level [`WireRequest`], enforcing TLS and applying client
//! authentication in exactly one place so every grant shares the same
//! placement rules:
//!
//! - secret configured, `secret_in_body` off → HTTP Basic `Authorization`
//!   header, nothing in the body
//! - secret configured, `secret_in_body` on → `client_id` + `client_secret`
//!   body parameters
//! - no secret, `secret_in_body` on → `client_id` alone in the body
//!
//! Caller-set headers always win over computed ones.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use url::Url;

use crate::config::{enforce_tls, ClientConfig};
use crate::error::{AuthError, AuthResult};

/// HTTP methods the engine issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Parameters end up in the URL query; no body.
    Get,
    /// Parameters end up in the request body.
    Post,
}

impl HttpMethod {
    /// Wire name of the method.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// How a POST body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// `application/x-www-form-urlencoded`, spaces encoded as `+`.
    WwwForm,
    /// `application/json`.
    Json,
}

/// A fully resolved request ready for the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Target URL, including any encoded query.
    pub url: Url,
    /// Final header list, caller overrides already applied.
    pub headers: Vec<(String, String)>,
    /// Encoded body, absent for GET.
    pub body: Option<Vec<u8>>,
}

impl WireRequest {
    /// Look up a header value case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace or insert a header, matching names case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }
}

/// An abstract request to an OAuth endpoint, consumed once to produce a
/// [`WireRequest`].
#[derive(Debug, Clone)]
pub struct AuthRequest {
    method: HttpMethod,
    url: Url,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    encoding: BodyEncoding,
    json: Option<Value>,
    client_auth: bool,
}

impl AuthRequest {
    /// A form-encoded POST carrying client authentication: the shape of
    /// every token endpoint request.
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            params: Vec::new(),
            headers: Vec::new(),
            encoding: BodyEncoding::WwwForm,
            json: None,
            client_auth: true,
        }
    }

    /// A GET whose parameters are encoded into the URL query. The client
    /// identifies itself with plain parameters, never a secret.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            params: Vec::new(),
            headers: Vec::new(),
            encoding: BodyEncoding::WwwForm,
            json: None,
            client_auth: false,
        }
    }

    /// A JSON POST without client authentication: the shape of a dynamic
    /// registration request.
    #[must_use]
    pub fn post_json(url: Url, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            params: Vec::new(),
            headers: Vec::new(),
            encoding: BodyEncoding::Json,
            json: Some(body),
            client_auth: false,
        }
    }

    /// Set a parameter, replacing any existing value for the same key.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.params.retain(|(k, _)| *k != key);
        self.params.push((key, value.into()));
    }

    /// Set several parameters at once.
    pub fn set_params<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in pairs {
            self.set_param(k, v);
        }
    }

    /// Set a caller header. Caller headers take precedence over anything
    /// the builder computes, including `Authorization`.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Encode into a transport-level request, applying TLS enforcement and
    /// client authentication against the given configuration.
    pub fn into_wire(mut self, config: &ClientConfig) -> AuthResult<WireRequest> {
        enforce_tls(&self.url)?;

        let mut computed_headers: Vec<(String, String)> = Vec::new();
        computed_headers.push(("Accept".to_owned(), "application/json".to_owned()));

        if self.client_auth {
            self.apply_client_auth(config, &mut computed_headers)?;
            for (key, value) in &config.custom_parameters {
                self.set_param(key.clone(), value.clone());
            }
        }

        let mut url = self.url;
        let body = match self.method {
            HttpMethod::Get => {
                if !self.params.is_empty() {
                    url.query_pairs_mut().extend_pairs(
                        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                    );
                }
                None
            }
            HttpMethod::Post => match self.encoding {
                BodyEncoding::WwwForm => {
                    computed_headers.push((
                        "Content-Type".to_owned(),
                        "application/x-www-form-urlencoded; charset=utf-8".to_owned(),
                    ));
                    Some(encode_form(&self.params).into_bytes())
                }
                BodyEncoding::Json => {
                    computed_headers
                        .push(("Content-Type".to_owned(), "application/json".to_owned()));
                    let value = self.json.take().unwrap_or(Value::Null);
                    Some(serde_json::to_vec(&value).map_err(|e| {
                        AuthError::Generic(format!("failed to encode JSON body: {e}"))
                    })?)
                }
            },
        };

        // Caller-set headers win over computed ones.
        let mut headers: Vec<(String, String)> = computed_headers
            .into_iter()
            .filter(|(name, _)| {
                !self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
            })
            .collect();
        headers.extend(self.headers);

        Ok(WireRequest { method: self.method, url, headers, body })
    }

    /// Place client credentials per configuration: Basic header or body
    /// parameters, never both.
    fn apply_client_auth(
        &mut self,
        config: &ClientConfig,
        computed_headers: &mut Vec<(String, String)>,
    ) -> AuthResult<()> {
        match (config.client_secret(), config.secret_in_body) {
            (Some(secret), false) => {
                let client_id = config.require_client_id()?;
                let credentials = STANDARD.encode(format!("{client_id}:{secret}"));
                computed_headers
                    .push(("Authorization".to_owned(), format!("Basic {credentials}")));
            }
            (Some(secret), true) => {
                let client_id = config.require_client_id()?.to_owned();
                let secret = secret.to_owned();
                self.set_param("client_id", client_id);
                self.set_param("client_secret", secret);
            }
            (None, true) => {
                let client_id = config.require_client_id()?.to_owned();
                self.set_param("client_id", client_id);
            }
            (None, false) => {}
        }
        Ok(())
    }
}

/// Build a refresh-token request for the configured token endpoint.
///
/// Requires a client id and a non-empty refresh token. `client_id` is placed
/// in the body only when credentials are not carried in a Basic
/// `Authorization` header.
pub fn token_refresh_request(
    config: &ClientConfig,
    refresh_token: &str,
) -> AuthResult<AuthRequest> {
    config.require_client_id()?;
    if refresh_token.is_empty() {
        return Err(AuthError::NoRefreshToken);
    }

    let mut request = AuthRequest::post(config.resolved_token_url()?);
    request.set_param("grant_type", "refresh_token");
    request.set_param("refresh_token", refresh_token);
    if config.client_secret().is_none() {
        // Public client: no Basic header will be emitted, so the body must
        // carry the client id itself.
        if let Some(client_id) = config.client_id() {
            request.set_param("client_id", client_id.to_owned());
        }
    }
    Ok(request)
}

/// `application/x-www-form-urlencoded` with spaces as `+`, preserving
/// insertion order.
fn encode_form(params: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}
