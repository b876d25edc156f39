//! Token persistence seam
//!
//! The engine persists tokens through the [`TokenStore`] trait and never
//! depends on the storage mechanism behind it. [`KeyringTokenStore`] keeps
//! records in the platform credential store (macOS Keychain, Windows
//! Credential Manager, Linux Secret Service); [`MemoryTokenStore`] backs
//! tests and short-lived processes.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::token::TokenRecord;

/// Durable storage for a single client's token record.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist the record, replacing any previous one.
    async fn store(&self, record: &TokenRecord) -> AuthResult<()>;

    /// Load the stored record, or `None` when nothing is stored.
    async fn load(&self) -> AuthResult<Option<TokenRecord>>;

    /// Remove the stored record. Removing an absent record is not an error.
    async fn clear(&self) -> AuthResult<()>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn store(&self, record: &TokenRecord) -> AuthResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(record.clone());
        Ok(())
    }

    async fn load(&self) -> AuthResult<Option<TokenRecord>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn clear(&self) -> AuthResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Platform credential-store backed persistence via the `keyring` crate.
///
/// The whole record is stored as one JSON secret under a service/account
/// pair, so access and refresh tokens never diverge.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
    account: String,
}

impl KeyringTokenStore {
    /// Create a store addressing `service`/`account` in the platform
    /// credential store.
    #[must_use]
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self { service: service.into(), account: account.into() }
    }

    fn entry(&self) -> AuthResult<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| AuthError::Storage(e.to_string()))
    }
}

#[async_trait]
impl TokenStore for KeyringTokenStore {
    async fn store(&self, record: &TokenRecord) -> AuthResult<()> {
        let payload =
            serde_json::to_string(record).map_err(|e| AuthError::Storage(e.to_string()))?;
        self.entry()?
            .set_password(&payload)
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        debug!(account = %self.account, "token record stored");
        Ok(())
    }

    async fn load(&self) -> AuthResult<Option<TokenRecord>> {
        match self.entry()?.get_password() {
            Ok(payload) => {
                let record = serde_json::from_str(&payload)
                    .map_err(|e| AuthError::Storage(e.to_string()))?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(other) => Err(AuthError::Storage(other.to_string())),
        }
    }

    async fn clear(&self) -> AuthResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(other) => Err(AuthError::Storage(other.to_string())),
        }
    }
}
