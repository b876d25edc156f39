//! Access token records and token endpoint response parsing
//!
//! Defines the normalized [`TokenRecord`] the engine works with and the
//! validation rules for turning a raw token endpoint response into one.
//! Parsing is deterministic: the same payload always yields the same record,
//! modulo the clock used to compute the absolute expiry.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AuthError, AuthResult};
use crate::grant::GrantType;

/// Raw key/value payload of a token or redirect response.
pub type RawParams = Map<String, Value>;

/// The only token type this engine issues requests with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Opaque token presented as `Authorization: Bearer <token>`.
    Bearer,
}

/// A normalized access token with its lifecycle metadata.
///
/// Created by [`parse_token_response`], owned by the authorizer, replaced on
/// refresh or re-authorization, and destroyed on logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token itself. Never empty.
    pub access_token: String,

    /// Declared token type.
    pub token_type: TokenType,

    /// Absolute expiry computed from `expires_in` at parse time. `None`
    /// when the server declared no lifetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Refresh token, when the server issued one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Verbatim passthrough of every field the response carried.
    #[serde(default)]
    pub raw: RawParams,
}

impl TokenRecord {
    /// Whether the access token can still be attached to requests.
    ///
    /// True when the token is non-empty and either unexpired, or carries no
    /// expiry while `assume_unexpired` is set.
    #[must_use]
    pub fn is_usable(&self, assume_unexpired: bool) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => Utc::now() < expires_at,
            None => assume_unexpired,
        }
    }

    /// Seconds until expiry, or `None` when no expiry is set.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|at| (at - Utc::now()).num_seconds())
    }

    /// Refresh token, if present and non-empty.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Validate and decode a token endpoint (or implicit redirect) payload.
///
/// Rules:
/// - an `error` field wins over everything else and surfaces as the mapped
///   OAuth error
/// - `access_token` must be present and non-empty
/// - `token_type` must be present unless `require_token_type` is `false`,
///   and must equal `bearer` case-insensitively when present
/// - `expires_in` (number, or numeric string) becomes an absolute expiry
/// - every field is preserved verbatim in the record's `raw` map
pub fn parse_token_response(
    params: &RawParams,
    require_token_type: bool,
) -> AuthResult<TokenRecord> {
    if let Some(code) = params.get("error").and_then(Value::as_str) {
        let description = params.get("error_description").and_then(Value::as_str);
        return Err(AuthError::from_oauth_code(code, description));
    }

    let access_token = params
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::NoDataInResponse)?
        .to_owned();

    let token_type = match params.get("token_type") {
        None => {
            if require_token_type {
                return Err(AuthError::NoTokenType);
            }
            TokenType::Bearer
        }
        Some(value) => {
            let declared = value.as_str().unwrap_or_default();
            if declared.eq_ignore_ascii_case("bearer") {
                TokenType::Bearer
            } else {
                return Err(AuthError::UnsupportedTokenType(declared.to_owned()));
            }
        }
    };

    let expires_at =
        params.get("expires_in").and_then(expires_in_seconds).map(|seconds| {
            Utc::now() + Duration::seconds(seconds)
        });

    let refresh_token = params
        .get("refresh_token")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned);

    Ok(TokenRecord { access_token, token_type, expires_at, refresh_token, raw: params.clone() })
}

/// `expires_in` arrives as a JSON number from well-behaved servers and as a
/// numeric string from the rest.
fn expires_in_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse::<i64>().ok().or_else(|| {
            s.parse::<f64>().ok().map(|f| f as i64)
        }),
        _ => None,
    }
}

/// Map a failed (≥ 400) token endpoint response to a typed error.
///
/// A 401 or 403 on the password grant means the resource-owner credentials
/// were wrong; for other grants 403 is a plain `Forbidden`. An explicit
/// OAuth error in the body is preferred over the bare status code.
#[must_use]
pub fn error_for_status(status: u16, grant: GrantType, params: &RawParams) -> AuthError {
    if grant == GrantType::Password && matches!(status, 401 | 403) {
        return AuthError::WrongUsernamePassword;
    }

    if let Some(code) = params.get("error").and_then(Value::as_str) {
        let description = params.get("error_description").and_then(Value::as_str);
        return AuthError::from_oauth_code(code, description);
    }

    if status == 403 {
        AuthError::Forbidden
    } else {
        AuthError::Generic(status.to_string())
    }
}
