//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chrono::Duration;
use std::sync::Arc;
use study_tracker_core::{DocumentStore, IdentityProvider, StudyTracker};

use crate::adapters::{InMemoryDocumentStore, InMemoryIdentityProvider};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub tracker: StudyTracker,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>, config: Arc<Config>) -> Self {
        Self {
            tracker: StudyTracker::new(store),
            identity,
            config,
        }
    }

    /// State backed entirely by the in-memory adapters.
    pub fn in_memory(config: Config) -> Self {
        let session_ttl = Duration::days(config.auth_session_days);
        Self::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(InMemoryIdentityProvider::new(session_ttl)),
            Arc::new(config),
        )
    }
}
