//! Authorization orchestration
//!
//! [`Authorizer`] owns the client configuration and the current token record
//! and decides how to obtain a valid access token: reuse what it has,
//! refresh it, register the client dynamically, or run the active grant from
//! scratch.
//!
//! The decision logic itself lives in [`AuthFlow`], a synchronous state
//! machine with named states and a single transition function; it performs
//! no IO and is tested without a network. The async methods on `Authorizer`
//! are a thin adapter: they feed facts and outcomes into the machine and
//! execute whatever step it asks for next.
//!
//! Concurrency: an internal gate guarantees at most one token-acquisition
//! attempt in flight per authorizer. A second `authorize()` arriving while
//! one is running waits, re-checks the (by then usually fresh) token, and
//! returns without a duplicate network round trip.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{enforce_tls, ClientConfig};
use crate::context::AuthContext;
use crate::error::{AuthError, AuthResult};
use crate::grant::{self, GrantType};
use crate::registration;
use crate::request::{token_refresh_request, AuthRequest};
use crate::storage::TokenStore;
use crate::token::{error_for_status, parse_token_response, TokenRecord};
use crate::transport::{HttpTransport, Transport};

/// Per-call authorization inputs.
///
/// Everything is optional; the configuration provides defaults where one
/// exists (scope, redirect). The password grant reads its credentials from
/// here, and PKCE values pass through opaquely.
#[derive(Debug, Clone, Default)]
pub struct AuthorizeParams {
    /// Scope override for this attempt.
    pub scope: Option<String>,
    /// Redirect override for this attempt.
    pub redirect: Option<String>,
    /// Resource-owner username (password grant).
    pub username: Option<String>,
    /// Resource-owner password (password grant).
    pub password: Option<String>,
    /// Opaque PKCE code verifier, sent during the code exchange.
    pub code_verifier: Option<String>,
    /// Opaque PKCE code challenge, sent in the authorize URL.
    pub code_challenge: Option<String>,
    /// PKCE challenge method accompanying `code_challenge`.
    pub code_challenge_method: Option<String>,
    /// Additional authorize URL parameters for this attempt.
    pub extra: BTreeMap<String, String>,
}

/// Presentation collaborator for interactive grants.
///
/// Given an authorize URL, an implementation shows it to the user (system
/// browser, embedded web view, test double) and resolves with the redirect
/// URL the authorization server sent the user back to. A user cancellation
/// resolves with [`AuthError::RequestCancelled`].
#[async_trait::async_trait]
pub trait AuthorizationPresenter: Send + Sync {
    /// Present the authorization UI and return the captured redirect.
    async fn present(&self, authorize_url: Url) -> AuthResult<Url>;
}

// ---------------------------------------------------------------------------
// Synchronous flow state machine
// ---------------------------------------------------------------------------

/// Named states of one authorization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No attempt started.
    Idle,
    /// Evaluating whether the existing token is still usable.
    CheckingToken,
    /// A refresh request is in flight.
    Refreshing,
    /// A dynamic registration request is in flight.
    Registering,
    /// Waiting for the user to complete the browser round trip.
    AwaitingRedirect,
    /// A token request or code exchange is in flight.
    ExchangingToken,
    /// The attempt produced a usable token.
    Done,
    /// The attempt failed terminally.
    Failed,
}

/// Facts about the authorizer's state, captured when an attempt begins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowFacts {
    /// The current access token is usable as-is.
    pub token_usable: bool,
    /// A refresh token is available.
    pub has_refresh_token: bool,
    /// A client id is configured or registered.
    pub has_client_id: bool,
    /// A dynamic registration endpoint is configured.
    pub has_registration_url: bool,
}

/// Outcomes the driver reports back into the machine.
#[derive(Debug)]
pub enum FlowEvent {
    /// Start an attempt with the given facts.
    Begin(FlowFacts),
    /// The refresh request finished.
    RefreshFinished {
        /// Whether a fresh token was installed.
        success: bool,
    },
    /// The registration request finished.
    RegistrationFinished {
        /// Terminal error, if registration failed.
        error: Option<AuthError>,
    },
    /// The browser round trip finished and the redirect was validated.
    RedirectFinished {
        /// Terminal error, if presentation or validation failed.
        error: Option<AuthError>,
    },
    /// The token request or code exchange finished.
    TokenFinished {
        /// Terminal error, if the exchange failed.
        error: Option<AuthError>,
    },
}

/// The next action the driver must execute.
#[derive(Debug)]
pub enum FlowStep {
    /// The attempt is complete; hand the current token to the caller.
    Succeed,
    /// The attempt failed; hand the error to the caller.
    Fail(AuthError),
    /// Attempt a refresh-token exchange.
    Refresh,
    /// Attempt dynamic client registration.
    Register,
    /// Build and send the grant's token request (non-interactive grants).
    RequestToken,
    /// Run the browser round trip (interactive grants).
    AwaitRedirect,
    /// Exchange the received authorization code for a token.
    Exchange,
}

/// The decision core of one authorization attempt.
///
/// Encodes the acquisition ladder: reuse → refresh → grant → registration →
/// fail. Every attempt walks `Idle` to either `Done` or `Failed`; outcomes
/// of asynchronous work re-enter through [`AuthFlow::step`].
#[derive(Debug)]
pub struct AuthFlow {
    grant: GrantType,
    state: FlowState,
    facts: FlowFacts,
}

impl AuthFlow {
    /// A fresh machine for one attempt.
    #[must_use]
    pub fn new(grant: GrantType) -> Self {
        Self { grant, state: FlowState::Idle, facts: FlowFacts::default() }
    }

    /// Current state, for observation and tests.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// The single transition function: feed an event, get the next step.
    pub fn step(&mut self, event: FlowEvent) -> FlowStep {
        match (self.state, event) {
            (FlowState::Idle, FlowEvent::Begin(facts)) => {
                self.facts = facts;
                self.state = FlowState::CheckingToken;
                if facts.token_usable {
                    self.finish()
                } else if facts.has_refresh_token {
                    self.state = FlowState::Refreshing;
                    FlowStep::Refresh
                } else {
                    self.acquire()
                }
            }
            (FlowState::Refreshing, FlowEvent::RefreshFinished { success: true }) => {
                self.finish()
            }
            (FlowState::Refreshing, FlowEvent::RefreshFinished { success: false }) => {
                self.acquire()
            }
            (FlowState::Registering, FlowEvent::RegistrationFinished { error: None }) => {
                self.facts.has_client_id = true;
                self.acquire()
            }
            (FlowState::Registering, FlowEvent::RegistrationFinished { error: Some(e) }) => {
                self.fail(e)
            }
            (FlowState::AwaitingRedirect, FlowEvent::RedirectFinished { error: None }) => {
                match self.grant {
                    GrantType::AuthorizationCode => {
                        self.state = FlowState::ExchangingToken;
                        FlowStep::Exchange
                    }
                    // Implicit: the token came straight out of the fragment.
                    _ => self.finish(),
                }
            }
            (FlowState::AwaitingRedirect, FlowEvent::RedirectFinished { error: Some(e) }) => {
                self.fail(e)
            }
            (FlowState::ExchangingToken, FlowEvent::TokenFinished { error: None }) => {
                self.finish()
            }
            (FlowState::ExchangingToken, FlowEvent::TokenFinished { error: Some(e) }) => {
                self.fail(e)
            }
            (state, event) => self.fail(AuthError::Generic(format!(
                "invalid flow transition from {state:?} on {event:?}"
            ))),
        }
    }

    /// Decide how to acquire a token once reuse and refresh are off the
    /// table.
    fn acquire(&mut self) -> FlowStep {
        if self.facts.has_client_id {
            if self.grant.is_interactive() {
                self.state = FlowState::AwaitingRedirect;
                FlowStep::AwaitRedirect
            } else {
                self.state = FlowState::ExchangingToken;
                FlowStep::RequestToken
            }
        } else if self.facts.has_registration_url {
            self.state = FlowState::Registering;
            FlowStep::Register
        } else {
            self.fail(AuthError::NoClientId)
        }
    }

    fn finish(&mut self) -> FlowStep {
        self.state = FlowState::Done;
        FlowStep::Succeed
    }

    fn fail(&mut self, error: AuthError) -> FlowStep {
        self.state = FlowState::Failed;
        FlowStep::Fail(error)
    }
}

// ---------------------------------------------------------------------------
// Async orchestrator
// ---------------------------------------------------------------------------

/// Outcome of a validated redirect.
enum RedirectOutcome {
    /// Authorization code ready for exchange, with the context it belongs
    /// to.
    Code { code: String, context: AuthContext },
    /// Implicit grant: the token was parsed and installed directly.
    ImplicitToken(TokenRecord),
}

/// The OAuth 2.0 authorization orchestrator.
///
/// One instance drives one client configuration with one grant type. The
/// configuration and token record are owned here exclusively; collaborators
/// reach them only through this type's methods.
pub struct Authorizer<T: Transport = HttpTransport> {
    grant: GrantType,
    transport: Arc<T>,
    config: RwLock<ClientConfig>,
    token: RwLock<Option<TokenRecord>>,
    context: Mutex<Option<AuthContext>>,
    store: Option<Arc<dyn TokenStore>>,
    presenter: Option<Arc<dyn AuthorizationPresenter>>,
    acquire_gate: Mutex<()>,
}

impl<T: Transport> Authorizer<T> {
    /// Create an authorizer for the given grant and configuration.
    #[must_use]
    pub fn new(grant: GrantType, config: ClientConfig, transport: T) -> Self {
        Self {
            grant,
            transport: Arc::new(transport),
            config: RwLock::new(config),
            token: RwLock::new(None),
            context: Mutex::new(None),
            store: None,
            presenter: None,
            acquire_gate: Mutex::new(()),
        }
    }

    /// Attach a token store; tokens are written through on every update and
    /// can be seeded back via [`Self::load_stored_tokens`].
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach the presentation collaborator used by interactive grants.
    #[must_use]
    pub fn with_presenter(mut self, presenter: Arc<dyn AuthorizationPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// The active grant type.
    #[must_use]
    pub fn grant(&self) -> GrantType {
        self.grant
    }

    /// Shared handle to the transport, for collaborators that send their
    /// own requests (the data loader).
    #[must_use]
    pub fn transport(&self) -> Arc<T> {
        self.transport.clone()
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> ClientConfig {
        self.config.read().await.clone()
    }

    /// Snapshot of the current token record.
    pub async fn token(&self) -> Option<TokenRecord> {
        self.token.read().await.clone()
    }

    /// Whether the stored access token can be used without any network
    /// action.
    pub async fn has_unexpired_access_token(&self) -> bool {
        let assume = self.config.read().await.assume_unexpired;
        self.token.read().await.as_ref().is_some_and(|t| t.is_usable(assume))
    }

    /// The access token, if it is currently usable.
    pub async fn usable_access_token(&self) -> Option<String> {
        let assume = self.config.read().await.assume_unexpired;
        self.token
            .read()
            .await
            .as_ref()
            .filter(|t| t.is_usable(assume))
            .map(|t| t.access_token.clone())
    }

    /// Seed the in-memory token record from the attached store.
    ///
    /// Returns `true` when a record was loaded. Call on startup.
    pub async fn load_stored_tokens(&self) -> AuthResult<bool> {
        let Some(store) = &self.store else { return Ok(false) };
        match store.load().await? {
            Some(record) => {
                *self.token.write().await = Some(record);
                info!("restored token record from storage");
                Ok(true)
            }
            None => {
                debug!("no stored token record found");
                Ok(false)
            }
        }
    }

    /// Adopt a token record obtained elsewhere, persisting it if a store is
    /// attached. A refresh token already held is kept when the new record
    /// carries none.
    pub async fn store_token(&self, record: TokenRecord) -> AuthResult<()> {
        self.install_token(record).await.map(|_| ())
    }

    /// Drop all tokens, in memory and in storage.
    pub async fn forget_tokens(&self) -> AuthResult<()> {
        *self.token.write().await = None;
        if let Some(store) = &self.store {
            store.clear().await?;
        }
        info!("tokens forgotten");
        Ok(())
    }

    /// Drop the client credentials, e.g. to force a fresh dynamic
    /// registration.
    pub async fn forget_client(&self) {
        let mut config = self.config.write().await;
        config.client_id = None;
        config.client_secret = None;
        info!("client credentials forgotten");
    }

    /// Invalidate the access token while keeping any refresh token, so the
    /// next acquisition can try the cheap path first. Used when a resource
    /// server answers 401.
    pub async fn invalidate_access_token(&self) {
        if let Some(record) = self.token.write().await.as_mut() {
            record.access_token.clear();
            record.expires_at = None;
        }
    }

    /// Abort the pending authorization attempt.
    ///
    /// Invalidates the stored context, so a redirect arriving for the
    /// aborted attempt fails with `NoRedirectUrl` instead of completing a
    /// cancelled flow.
    pub async fn abort_authorization(&self) {
        if self.context.lock().await.take().is_some() {
            info!("authorization attempt aborted");
        }
    }

    /// Obtain a valid access token, executing the acquisition ladder:
    ///
    /// 1. reuse the stored token if it is unexpired
    /// 2. otherwise try a refresh-token exchange
    /// 3. otherwise run the active grant (registering the client first when
    ///    it has no id but a registration endpoint is configured)
    ///
    /// Exactly one outcome is produced per call: the new token record or a
    /// typed error. At most one acquisition runs at a time; concurrent
    /// callers wait and share the freshly installed token.
    pub async fn authorize(&self, params: &AuthorizeParams) -> AuthResult<TokenRecord> {
        let _in_flight = self.acquire_gate.lock().await;

        let facts = self.flow_facts().await;
        let mut flow = AuthFlow::new(self.grant);
        let mut step = flow.step(FlowEvent::Begin(facts));
        let mut pending_exchange: Option<(String, AuthContext)> = None;

        loop {
            step = match step {
                FlowStep::Succeed => {
                    return self.token.read().await.clone().ok_or_else(|| {
                        AuthError::Generic("authorization finished without a token".to_string())
                    });
                }
                FlowStep::Fail(error) => {
                    warn!(%error, "authorization failed");
                    return Err(error);
                }
                FlowStep::Refresh => {
                    let success = match self.try_refresh().await {
                        Ok(_) => true,
                        Err(error) => {
                            debug!(%error, "refresh failed; falling back to full authorization");
                            false
                        }
                    };
                    flow.step(FlowEvent::RefreshFinished { success })
                }
                FlowStep::Register => {
                    let error = self.register_client_if_needed().await.err();
                    flow.step(FlowEvent::RegistrationFinished { error })
                }
                FlowStep::RequestToken => {
                    let error = self.request_token(params).await.err();
                    flow.step(FlowEvent::TokenFinished { error })
                }
                FlowStep::AwaitRedirect => match self.run_presentation(params).await {
                    Ok(RedirectOutcome::Code { code, context }) => {
                        pending_exchange = Some((code, context));
                        flow.step(FlowEvent::RedirectFinished { error: None })
                    }
                    Ok(RedirectOutcome::ImplicitToken(_)) => {
                        flow.step(FlowEvent::RedirectFinished { error: None })
                    }
                    Err(error) => flow.step(FlowEvent::RedirectFinished { error: Some(error) }),
                },
                FlowStep::Exchange => {
                    let error = match pending_exchange.take() {
                        Some((code, context)) => {
                            self.exchange_code(&code, &context).await.err()
                        }
                        None => Some(AuthError::Generic(
                            "no authorization code to exchange".to_string(),
                        )),
                    };
                    flow.step(FlowEvent::TokenFinished { error })
                }
            };
        }
    }

    /// Build the authorization endpoint URL and record the attempt context.
    ///
    /// Requires a TLS authorize endpoint, a client id, and a resolvable
    /// redirect. A fresh CSRF `state` is generated per call and kept for
    /// validation; `response_type` is added only for grants that define one.
    pub async fn authorize_url(&self, params: &AuthorizeParams) -> AuthResult<Url> {
        let config = self.config.read().await.clone();
        let mut url = config.authorize_url.clone().ok_or(AuthError::NoAuthorizeUrl)?;
        enforce_tls(&url)?;
        let client_id = config.require_client_id()?.to_owned();
        let redirect = config.resolved_redirect(params.redirect.as_deref())?;

        let mut context = AuthContext::new();
        context.redirect_url = Some(redirect.clone());
        context.code_verifier = params.code_verifier.clone();

        let mut pairs: Vec<(String, String)> = Vec::new();
        set_pair(&mut pairs, "client_id", client_id);
        set_pair(&mut pairs, "redirect_uri", redirect);
        set_pair(&mut pairs, "state", context.state.clone());
        if let Some(scope) = params
            .scope
            .clone()
            .or_else(|| config.scope.clone())
            .filter(|s| !s.is_empty())
        {
            set_pair(&mut pairs, "scope", scope);
        }
        if let Some(response_type) = self.grant.response_type() {
            set_pair(&mut pairs, "response_type", response_type.to_owned());
        }
        if let Some(challenge) = params.code_challenge.clone() {
            set_pair(&mut pairs, "code_challenge", challenge);
            set_pair(
                &mut pairs,
                "code_challenge_method",
                params.code_challenge_method.clone().unwrap_or_else(|| "S256".to_owned()),
            );
        }
        for (key, value) in &config.custom_parameters {
            set_pair(&mut pairs, key.clone(), value.clone());
        }
        for (key, value) in &params.extra {
            set_pair(&mut pairs, key.clone(), value.clone());
        }

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));

        *self.context.lock().await = Some(context);
        info!("generated authorization URL");

        Ok(url)
    }

    /// Handle the redirect the authorization server sent the user back to.
    ///
    /// Validates the CSRF `state` against the pending context, surfaces
    /// explicit server errors, and completes the grant: code exchange for
    /// the authorization-code grant, direct fragment parsing for implicit.
    /// The pending context is consumed whatever the outcome, so a redirect
    /// can never be replayed.
    pub async fn handle_redirect_url(&self, redirect: &Url) -> AuthResult<TokenRecord> {
        match self.consume_redirect(redirect).await? {
            RedirectOutcome::Code { code, context } => {
                self.exchange_code(&code, &context).await
            }
            RedirectOutcome::ImplicitToken(record) => Ok(record),
        }
    }

    /// Exchange the stored refresh token for a fresh access token.
    pub async fn refresh_tokens(&self) -> AuthResult<TokenRecord> {
        self.try_refresh().await
    }

    /// Run dynamic client registration when no client id is configured.
    ///
    /// Returns `false` when registration was unnecessary, `true` when new
    /// credentials were obtained and stored in the configuration. Fails
    /// with `NoRegistrationUrl` when registration is needed but no endpoint
    /// is configured.
    pub async fn register_client_if_needed(&self) -> AuthResult<bool> {
        let config = self.config.read().await.clone();
        if config.client_id().is_some() {
            debug!("client id present; skipping registration");
            return Ok(false);
        }

        let registered =
            registration::register_client(self.transport.as_ref(), &config, self.grant).await?;

        let mut config = self.config.write().await;
        config.client_id = Some(registered.client_id);
        if registered.client_secret.is_some() {
            config.client_secret = registered.client_secret;
        }
        Ok(true)
    }

    // -- internal ----------------------------------------------------------

    async fn flow_facts(&self) -> FlowFacts {
        let config = self.config.read().await;
        let token = self.token.read().await;
        FlowFacts {
            token_usable: token.as_ref().is_some_and(|t| t.is_usable(config.assume_unexpired)),
            has_refresh_token: token.as_ref().and_then(|t| t.refresh_token()).is_some(),
            has_client_id: config.client_id().is_some(),
            has_registration_url: config.registration_url.is_some(),
        }
    }

    async fn try_refresh(&self) -> AuthResult<TokenRecord> {
        let refresh_token = self
            .token
            .read()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token().map(ToOwned::to_owned))
            .ok_or(AuthError::NoRefreshToken)?;

        let config = self.config.read().await.clone();
        let request = token_refresh_request(&config, &refresh_token)?;
        let record = self.send_token_request(request).await?;
        info!("access token refreshed");
        Ok(record)
    }

    /// Build and send the active grant's token request (non-interactive
    /// grants only).
    async fn request_token(&self, params: &AuthorizeParams) -> AuthResult<TokenRecord> {
        let config = self.config.read().await.clone();
        let mut request = match self.grant {
            GrantType::Password => grant::password::access_token_request(
                &config,
                params.username.as_deref().unwrap_or_default(),
                params.password.as_deref().unwrap_or_default(),
            )?,
            GrantType::ClientCredentials => {
                grant::client_credentials::access_token_request(&config)?
            }
            GrantType::AuthorizationCode | GrantType::Implicit => {
                return Err(AuthError::Generic(
                    "interactive grant cannot request a token without a redirect".to_string(),
                ))
            }
        };
        if let Some(scope) = params.scope.as_deref().filter(|s| !s.is_empty()) {
            request.set_param("scope", scope);
        }
        self.send_token_request(request).await
    }

    /// Run the browser round trip through the attached presenter and
    /// validate the captured redirect.
    async fn run_presentation(&self, params: &AuthorizeParams) -> AuthResult<RedirectOutcome> {
        let presenter =
            self.presenter.clone().ok_or(AuthError::NoAuthorizationContext)?;
        let url = self.authorize_url(params).await?;
        let redirect = presenter.present(url).await?;
        self.consume_redirect(&redirect).await
    }

    /// Validate a redirect against the pending context and extract its
    /// payload. Consumes the context exactly once.
    async fn consume_redirect(&self, redirect: &Url) -> AuthResult<RedirectOutcome> {
        let location = self.grant.payload_location().ok_or_else(|| {
            AuthError::Generic("active grant does not use a redirect".to_string())
        })?;
        let context = self.context.lock().await.take().ok_or(AuthError::NoRedirectUrl)?;
        let payload = grant::payload_params(redirect, location)?;

        if let Some(code) = payload.get("error") {
            let description = payload.get("error_description").map(String::as_str);
            return Err(AuthError::from_oauth_code(code, description));
        }

        let returned_state = payload.get("state").ok_or(AuthError::MissingState)?;
        if !context.matches_state(returned_state) {
            warn!("redirect state does not match the pending attempt");
            return Err(AuthError::InvalidState);
        }

        match self.grant {
            GrantType::AuthorizationCode => {
                let code = payload
                    .get("code")
                    .filter(|c| !c.is_empty())
                    .cloned()
                    .ok_or_else(|| AuthError::InvalidRedirectUrl(redirect.to_string()))?;
                Ok(RedirectOutcome::Code { code, context })
            }
            GrantType::Implicit => {
                let require_token_type = self.config.read().await.require_token_type;
                let record = grant::implicit::token_from_payload(&payload, require_token_type)?;
                let record = self.install_token(record).await?;
                Ok(RedirectOutcome::ImplicitToken(record))
            }
            GrantType::Password | GrantType::ClientCredentials => Err(AuthError::Generic(
                "active grant does not use a redirect".to_string(),
            )),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        context: &AuthContext,
    ) -> AuthResult<TokenRecord> {
        let config = self.config.read().await.clone();
        let request = grant::authorization_code::access_token_request(&config, context, code)?;
        self.send_token_request(request).await
    }

    /// Send a token request and install the parsed record.
    async fn send_token_request(&self, request: AuthRequest) -> AuthResult<TokenRecord> {
        let config = self.config.read().await.clone();
        let wire = request.into_wire(&config)?;
        debug!(url = %wire.url, "sending token request");

        let response = self.transport.send(wire).await?;
        if !response.is_success() {
            let params = response.json_map_or_empty();
            return Err(error_for_status(response.status, self.grant, &params));
        }

        let params = response.json_map()?;
        let record = parse_token_response(&params, config.require_token_type)?;
        self.install_token(record).await
    }

    /// Install a fresh token record: carry over a refresh token the
    /// response did not replace, cache in memory, write through to storage.
    async fn install_token(&self, mut record: TokenRecord) -> AuthResult<TokenRecord> {
        {
            let mut slot = self.token.write().await;
            if record.refresh_token.is_none() {
                if let Some(previous) =
                    slot.as_ref().and_then(|t| t.refresh_token().map(ToOwned::to_owned))
                {
                    record.refresh_token = Some(previous);
                }
            }
            *slot = Some(record.clone());
        }
        if let Some(store) = &self.store {
            store.store(&record).await?;
        }
        info!("access token updated");
        Ok(record)
    }
}

impl<T: Transport> std::fmt::Debug for Authorizer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer").field("grant", &self.grant).finish_non_exhaustive()
    }
}

/// Append or replace a query pair, keeping keys unique.
fn set_pair(pairs: &mut Vec<(String, String)>, key: impl Into<String>, value: String) {
    let key = key.into();
    pairs.retain(|(k, _)| *k != key);
    pairs.push((key, value));
}
