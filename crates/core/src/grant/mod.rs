//! OAuth 2.0 grant types and per-grant request strategies
//!
//! The engine models the four supported grants as a closed enum instead of a
//! class hierarchy: the authorizer holds one [`GrantType`] and dispatches
//! through it, so the compiler enforces exhaustiveness wherever grant
//! behaviour differs. Each variant's request-building logic lives in its own
//! submodule:
//!
//! - [`authorization_code`]: code-for-token exchange after a browser redirect
//! - [`implicit`]: token delivered directly in the redirect fragment
//! - [`password`]: resource-owner username/password exchange
//! - [`client_credentials`]: client id/secret exchange, no user involved

pub mod authorization_code;
pub mod client_credentials;
pub mod implicit;
pub mod password;

use std::collections::BTreeMap;

use url::Url;

use crate::error::{AuthError, AuthResult};

/// The OAuth 2.0 grant types this engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    /// Authorization-code grant (RFC 6749 §4.1).
    AuthorizationCode,
    /// Implicit grant (RFC 6749 §4.2).
    Implicit,
    /// Resource-owner password credentials grant (RFC 6749 §4.3).
    Password,
    /// Client-credentials grant (RFC 6749 §4.4).
    ClientCredentials,
}

/// Where a redirect URL carries its grant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLocation {
    /// Payload in the query component (authorization-code grant).
    Query,
    /// Payload in the fragment component (implicit grant).
    Fragment,
}

impl GrantType {
    /// Wire value for the `grant_type` parameter of a token request, when
    /// the grant uses the token endpoint at all.
    #[must_use]
    pub fn token_grant_type(self) -> Option<&'static str> {
        match self {
            Self::AuthorizationCode => Some("authorization_code"),
            Self::Implicit => None,
            Self::Password => Some("password"),
            Self::ClientCredentials => Some("client_credentials"),
        }
    }

    /// Wire value for the `response_type` parameter of an authorize URL.
    /// Grants without a browser redirect define none.
    #[must_use]
    pub fn response_type(self) -> Option<&'static str> {
        match self {
            Self::AuthorizationCode => Some("code"),
            Self::Implicit => Some("token"),
            Self::Password | Self::ClientCredentials => None,
        }
    }

    /// Value advertised in the `grant_types` array of a dynamic
    /// registration request.
    #[must_use]
    pub fn registration_grant_type(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::Implicit => "implicit",
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
        }
    }

    /// Whether the grant needs a browser round trip through the
    /// authorization endpoint.
    #[must_use]
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::AuthorizationCode | Self::Implicit)
    }

    /// Which redirect component carries the grant payload, for interactive
    /// grants.
    #[must_use]
    pub fn payload_location(self) -> Option<PayloadLocation> {
        match self {
            Self::AuthorizationCode => Some(PayloadLocation::Query),
            Self::Implicit => Some(PayloadLocation::Fragment),
            Self::Password | Self::ClientCredentials => None,
        }
    }
}

/// Decode the form-encoded grant payload from a redirect URL.
///
/// Authorization-code responses arrive in the query; implicit responses in
/// the fragment. An implicit redirect without a fragment is malformed.
pub(crate) fn payload_params(
    url: &Url,
    location: PayloadLocation,
) -> AuthResult<BTreeMap<String, String>> {
    let raw = match location {
        PayloadLocation::Query => url.query().unwrap_or(""),
        PayloadLocation::Fragment => url
            .fragment()
            .ok_or_else(|| AuthError::InvalidRedirectUrl(url.to_string()))?,
    };

    Ok(url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

#[cfg(test)]
mod tests {
    //! Unit tests for grant dispatch.
    use super::*;

    /// Validates `GrantType` wire values for every variant.
    ///
    /// Assertions:
    /// - Confirms `token_grant_type` / `response_type` pairs per grant.
    /// - Ensures only interactive grants have a payload location.
    #[test]
    fn test_wire_values() {
        assert_eq!(GrantType::AuthorizationCode.token_grant_type(), Some("authorization_code"));
        assert_eq!(GrantType::AuthorizationCode.response_type(), Some("code"));
        assert_eq!(GrantType::Implicit.token_grant_type(), None);
        assert_eq!(GrantType::Implicit.response_type(), Some("token"));
        assert_eq!(GrantType::Password.token_grant_type(), Some("password"));
        assert_eq!(GrantType::Password.response_type(), None);
        assert_eq!(GrantType::ClientCredentials.token_grant_type(), Some("client_credentials"));
        assert_eq!(GrantType::ClientCredentials.response_type(), None);

        assert!(GrantType::AuthorizationCode.is_interactive());
        assert!(GrantType::Implicit.is_interactive());
        assert!(!GrantType::Password.is_interactive());
        assert_eq!(GrantType::Password.payload_location(), None);
    }

    /// Validates `payload_params` behavior for the query and fragment
    /// scenarios.
    ///
    /// Assertions:
    /// - Ensures query payloads decode with percent-decoding applied.
    /// - Ensures fragment payloads decode.
    /// - Ensures a missing fragment raises `InvalidRedirectUrl`.
    #[test]
    fn test_payload_extraction() {
        let url = Url::parse("oauth2://cb?code=a%20b&state=xyz").unwrap();
        let params = payload_params(&url, PayloadLocation::Query).unwrap();
        assert_eq!(params.get("code").map(String::as_str), Some("a b"));
        assert_eq!(params.get("state").map(String::as_str), Some("xyz"));

        let url = Url::parse("https://app.example.com/cb#access_token=abc&state=s").unwrap();
        let params = payload_params(&url, PayloadLocation::Fragment).unwrap();
        assert_eq!(params.get("access_token").map(String::as_str), Some("abc"));

        let url = Url::parse("https://app.example.com/cb").unwrap();
        let result = payload_params(&url, PayloadLocation::Fragment);
        assert!(matches!(result, Err(AuthError::InvalidRedirectUrl(_))));
    }
}
