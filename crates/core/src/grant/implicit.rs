//! Implicit grant: token delivered directly in the redirect fragment
//!
//! There is no token endpoint request in this flow. The access token and
//! its metadata arrive form-encoded in the redirect's fragment component and
//! go straight through the shared response parser, so validation (bearer
//! type, expiry computation, passthrough) is identical to the other grants.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::AuthResult;
use crate::token::{parse_token_response, RawParams, TokenRecord};

/// Decode a validated fragment payload into a token record.
///
/// The caller has already checked the `state` parameter; everything else,
/// including an embedded `error`, is handled by the response parser.
pub fn token_from_payload(
    payload: &BTreeMap<String, String>,
    require_token_type: bool,
) -> AuthResult<TokenRecord> {
    let raw: RawParams = payload
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    parse_token_response(&raw, require_token_type)
}
