//! OAuth 2.0 client engine
//!
//! This crate acquires, stores, validates, refreshes, and attaches bearer
//! tokens to outgoing API requests. It supports the authorization-code,
//! implicit, resource-owner password, and client-credentials grants, plus
//! dynamic client registration (RFC 7591).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │  DataLoader  │  Authorized request dispatch + 401 retry
//! └──────┬───────┘
//!        │
//! ┌──────▼───────┐
//! │  Authorizer  │  Acquisition ladder: reuse → refresh → grant → register
//! └──────┬───────┘
//!        │
//!        ├──► AuthFlow          (synchronous decision state machine)
//!        ├──► grant::*          (per-grant request strategies)
//!        ├──► AuthRequest       (wire encoding + client authentication)
//!        ├──► parse_token_response
//!        ├──► Transport         (HTTP seam, reqwest by default)
//!        └──► TokenStore        (persistence seam, keyring by default)
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use authrelay_core::{
//!     Authorizer, AuthorizeParams, ClientConfig, DataLoader, GrantType, HttpTransport,
//!     KeyringTokenStore,
//! };
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         client_id: Some("your_client_id".to_string()),
//!         client_secret: Some("your_client_secret".to_string()),
//!         authorize_url: Some(Url::parse("https://auth.example.com/authorize")?),
//!         token_url: Some(Url::parse("https://auth.example.com/token")?),
//!         scope: Some("read write".to_string()),
//!         ..ClientConfig::default()
//!     };
//!
//!     let store = Arc::new(KeyringTokenStore::new("MyApp.oauth", "main"));
//!     let authorizer = Arc::new(
//!         Authorizer::new(GrantType::ClientCredentials, config, HttpTransport::new())
//!             .with_store(store),
//!     );
//!
//!     // Restore tokens persisted by a previous run.
//!     authorizer.load_stored_tokens().await?;
//!
//!     // Obtain a token explicitly…
//!     let record = authorizer.authorize(&AuthorizeParams::default()).await?;
//!     println!("access token expires in {:?} seconds", record.seconds_until_expiry());
//!
//!     // …or let the loader handle tokens per request.
//!     let _loader = DataLoader::new(authorizer);
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - **[`config`]**: client credentials, endpoints, and request policy
//! - **[`context`]**: per-attempt CSRF state and redirect bookkeeping
//! - **[`token`]**: token records and response parsing
//! - **[`request`]**: wire encoding and client-authentication placement
//! - **[`grant`]**: the four grant strategies
//! - **[`flow`]**: the authorization state machine and orchestrator
//! - **[`registration`]**: dynamic client registration
//! - **[`loader`]**: authorized API request dispatch
//! - **[`transport`] / [`storage`]**: collaborator seams and default impls
//! - **[`testing`]**: transport/presenter doubles for tests
//!
//! # Security Notes
//!
//! - Endpoints must be TLS; only loopback hosts are exempt.
//! - A fresh CSRF `state` is generated per authorization attempt and
//!   validated by exact match; the attempt context is consumed on first
//!   use, so redirects cannot be replayed and aborted flows cannot be
//!   completed by a stale redirect.
//! - Client secrets travel either in an HTTP Basic header or in the
//!   request body, never both.
//! - PKCE verifier/challenge values pass through opaquely; generation
//!   policy is the caller's.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod grant;
pub mod loader;
pub mod registration;
pub mod request;
pub mod storage;
pub mod testing;
pub mod token;
pub mod transport;

// Re-export commonly used types for convenience
// ------------------------------
pub use config::{enforce_tls, ClientConfig, OOB_REDIRECT};
pub use context::{generate_state, AuthContext};
pub use error::{AuthError, AuthResult};
pub use flow::{
    AuthFlow, AuthorizationPresenter, AuthorizeParams, Authorizer, FlowEvent, FlowFacts,
    FlowState, FlowStep,
};
pub use grant::GrantType;
pub use loader::{attach_bearer, DataLoader};
pub use registration::RegisteredClient;
pub use request::{AuthRequest, BodyEncoding, HttpMethod, WireRequest};
pub use storage::{KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use token::{parse_token_response, TokenRecord, TokenType};
pub use transport::{HttpTransport, Transport, WireResponse};
