//! Per-attempt authorization context
//!
//! An [`AuthContext`] is created for every `authorize_url` invocation and
//! consumed exactly once when the matching redirect arrives. It carries the
//! CSRF `state` token, the redirect the attempt was started with, and an
//! opaque PKCE verifier when the caller supplied one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;

/// State snapshot of a single in-flight authorization attempt.
///
/// Ownership rule: the authorizer holds at most one context at a time; the
/// context is `take()`n when a redirect is validated or the attempt is
/// aborted, so a stale or replayed redirect can never complete a flow.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Random CSRF protection token, round-tripped through the redirect.
    pub state: String,

    /// The redirect URL this attempt was started with; echoed as
    /// `redirect_uri` during the code exchange.
    pub redirect_url: Option<String>,

    /// Opaque PKCE code verifier, sent as `code_verifier` on exchange.
    pub code_verifier: Option<String>,
}

impl AuthContext {
    /// Create a fresh context with a newly generated `state`.
    #[must_use]
    pub fn new() -> Self {
        Self { state: generate_state(), redirect_url: None, code_verifier: None }
    }

    /// Whether `candidate` matches this attempt's `state` exactly.
    #[must_use]
    pub fn matches_state(&self, candidate: &str) -> bool {
        self.state == candidate
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a random state token for CSRF protection.
///
/// Returns a URL-safe base64-encoded random string of 32 bytes (43
/// characters), well above the 8-character minimum the protocol layer
/// requires.
#[must_use]
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    //! Unit tests for context.
    use super::*;

    /// Validates `generate_state` behavior for the entropy scenario.
    ///
    /// Assertions:
    /// - Ensures generated state is at least 8 characters (43 in practice).
    /// - Ensures successive calls differ.
    /// - Ensures the encoding is URL-safe without padding.
    #[test]
    fn test_state_generation() {
        let first = generate_state();
        let second = generate_state();

        assert!(first.len() >= 8);
        assert_eq!(first.len(), 43);
        assert_ne!(first, second);
        assert!(!first.contains('=') && !first.contains('+') && !first.contains('/'));
    }

    /// Validates `AuthContext::matches_state` behavior for the exact match
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the stored state matches itself.
    /// - Ensures prefixes and other values do not match.
    #[test]
    fn test_state_matching() {
        let context = AuthContext::new();
        let state = context.state.clone();

        assert!(context.matches_state(&state));
        assert!(!context.matches_state(&state[..state.len() - 1]));
        assert!(!context.matches_state("something-else"));
    }

    /// Validates `AuthContext::new` behavior for the fresh context scenario.
    ///
    /// Assertions:
    /// - Ensures each context starts without a redirect or verifier.
    /// - Ensures two contexts never share a state.
    #[test]
    fn test_fresh_context_per_attempt() {
        let a = AuthContext::new();
        let b = AuthContext::new();

        assert!(a.redirect_url.is_none());
        assert!(a.code_verifier.is_none());
        assert_ne!(a.state, b.state);
    }
}
