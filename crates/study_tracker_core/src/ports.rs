//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) the tracker consumes.
//! These traits form the boundary of the hexagonal architecture: the identity
//! provider and the document store are black boxes reached only through them.

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;

use crate::domain::{Account, AccountEvent, ProfileUpdate, SignedIn};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Stream of sign-in / sign-out transitions.
pub type AccountEventStream = Pin<Box<dyn Stream<Item = AccountEvent> + Send>>;

//=========================================================================================
// Document store
//=========================================================================================

/// The per-account collections kept in the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Sessions,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Sessions => "sessions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as listed from the store, before it is parsed into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub body: Value,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document and returns the id the store assigned to it.
    async fn add(&self, account: &Account, collection: Collection, body: Value)
        -> PortResult<String>;

    /// Lists the full collection; no ordering is guaranteed.
    async fn list(&self, account: &Account, collection: Collection) -> PortResult<Vec<RawDocument>>;

    /// Merges the top-level keys of `patch` into the stored document.
    async fn update(
        &self,
        account: &Account,
        collection: Collection,
        id: &str,
        patch: Value,
    ) -> PortResult<()>;

    async fn delete(&self, account: &Account, collection: Collection, id: &str) -> PortResult<()>;
}

//=========================================================================================
// Identity provider
//=========================================================================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<SignedIn>;

    async fn login(&self, email: &str, password: &str) -> PortResult<SignedIn>;

    async fn logout(&self, token: &str) -> PortResult<()>;

    /// Issues a password reset token for the account. Delivery is not handled here.
    async fn reset_password(&self, email: &str) -> PortResult<String>;

    async fn confirm_password_reset(&self, reset_token: &str, new_password: &str) -> PortResult<()>;

    async fn update_profile(&self, account: &Account, update: ProfileUpdate) -> PortResult<Account>;

    async fn change_password(
        &self,
        account: &Account,
        current_password: &str,
        new_password: &str,
    ) -> PortResult<()>;

    /// Resolves a sign-in token to its account, if the token is still valid.
    async fn current_account(&self, token: &str) -> PortResult<Option<Account>>;

    fn subscribe(&self) -> AccountEventStream;
}
