//! services/api/src/adapters/memory.rs
//!
//! In-memory implementations of the `DocumentStore` and `IdentityProvider`
//! ports.
//!
//! Purpose
//! - Run the service and its tests without a database.
//!
//! Responsibilities
//! - Keep documents per account and collection.
//! - Mirror the PostgreSQL adapter's semantics: merge updates, NotFound on
//!   unknown ids, Conflict on duplicate emails, expiring sign-in tokens.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use study_tracker_core::{
    Account, AccountEvent, AccountEventStream, Collection, DocumentStore, IdentityProvider, PortError,
    PortResult, ProfileUpdate, RawDocument, SignedIn,
};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::adapters::events::AccountEvents;
use crate::adapters::password::{hash_password, verify_password};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

//=========================================================================================
// Document store
//=========================================================================================

type CollectionKey = (Uuid, Collection);

#[derive(Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<HashMap<CollectionKey, Vec<RawDocument>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(collection: Collection, id: &str) -> PortError {
    PortError::NotFound(format!("{} document {} not found", collection, id))
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn add(&self, account: &Account, collection: Collection, body: Value) -> PortResult<String> {
        if !body.is_object() {
            return Err(PortError::Unexpected("documents must be JSON objects".to_string()));
        }
        let id = Uuid::new_v4().to_string();
        let mut guard = self.inner.write().await;
        guard
            .entry((account.id, collection))
            .or_default()
            .push(RawDocument { id: id.clone(), body });
        Ok(id)
    }

    async fn list(&self, account: &Account, collection: Collection) -> PortResult<Vec<RawDocument>> {
        let guard = self.inner.read().await;
        Ok(guard.get(&(account.id, collection)).cloned().unwrap_or_default())
    }

    async fn update(&self, account: &Account, collection: Collection, id: &str, patch: Value) -> PortResult<()> {
        let Value::Object(fields) = patch else {
            return Err(PortError::Unexpected("patches must be JSON objects".to_string()));
        };
        let mut guard = self.inner.write().await;
        let doc = guard
            .get_mut(&(account.id, collection))
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| not_found(collection, id))?;
        if let Value::Object(target) = &mut doc.body {
            target.extend(fields);
        }
        Ok(())
    }

    async fn delete(&self, account: &Account, collection: Collection, id: &str) -> PortResult<()> {
        let mut guard = self.inner.write().await;
        let docs = guard
            .get_mut(&(account.id, collection))
            .ok_or_else(|| not_found(collection, id))?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(not_found(collection, id));
        }
        Ok(())
    }
}

//=========================================================================================
// Identity provider
//=========================================================================================

struct StoredAccount {
    account: Account,
    password_hash: String,
}

struct Grant {
    account_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<Uuid, StoredAccount>,
    by_email: HashMap<String, Uuid>,
    auth_sessions: HashMap<String, Grant>,
    password_resets: HashMap<String, Grant>,
}

impl Grant {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

impl IdentityState {
    /// Drops expired sign-in and reset grants.
    fn prune_expired(&mut self, now: DateTime<Utc>) {
        self.auth_sessions.retain(|_, grant| grant.is_live(now));
        self.password_resets.retain(|_, grant| grant.is_live(now));
    }

    fn sign_in(&mut self, account_id: Uuid, ttl: Duration) -> String {
        self.prune_expired(Utc::now());
        let token = Uuid::new_v4().to_string();
        self.auth_sessions.insert(
            token.clone(),
            Grant {
                account_id,
                expires_at: Utc::now() + ttl,
            },
        );
        token
    }

    fn stored(&self, account_id: Uuid) -> PortResult<&StoredAccount> {
        self.accounts
            .get(&account_id)
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", account_id)))
    }

    fn stored_mut(&mut self, account_id: Uuid) -> PortResult<&mut StoredAccount> {
        self.accounts
            .get_mut(&account_id)
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", account_id)))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub struct InMemoryIdentityProvider {
    state: RwLock<IdentityState>,
    events: AccountEvents,
    session_ttl: Duration,
}

impl InMemoryIdentityProvider {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            state: RwLock::new(IdentityState::default()),
            events: AccountEvents::default(),
            session_ttl,
        }
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<SignedIn> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let mut state = self.state.write().await;
        if state.by_email.contains_key(&email) {
            return Err(PortError::Conflict(format!("An account for {} already exists", email)));
        }

        let account = Account {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: email.clone(),
        };
        state.by_email.insert(email, account.id);
        state.accounts.insert(
            account.id,
            StoredAccount {
                account: account.clone(),
                password_hash,
            },
        );
        let token = state.sign_in(account.id, self.session_ttl);
        drop(state);

        self.events.publish(AccountEvent::SignedIn(account.clone()));
        Ok(SignedIn { account, token })
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<SignedIn> {
        let (account, password_hash) = {
            let state = self.state.read().await;
            let account_id = *state
                .by_email
                .get(&normalize_email(email))
                .ok_or(PortError::Unauthorized)?;
            let stored = state.stored(account_id)?;
            (stored.account.clone(), stored.password_hash.clone())
        };
        if !verify_password(password, &password_hash)? {
            return Err(PortError::Unauthorized);
        }
        let token = self.state.write().await.sign_in(account.id, self.session_ttl);

        self.events.publish(AccountEvent::SignedIn(account.clone()));
        Ok(SignedIn { account, token })
    }

    async fn logout(&self, token: &str) -> PortResult<()> {
        let grant = self
            .state
            .write()
            .await
            .auth_sessions
            .remove(token)
            .ok_or(PortError::Unauthorized)?;
        self.events.publish(AccountEvent::SignedOut(grant.account_id));
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> PortResult<String> {
        let email = normalize_email(email);
        let mut state = self.state.write().await;
        state.prune_expired(Utc::now());
        let account_id = *state
            .by_email
            .get(&email)
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;
        let token = Uuid::new_v4().to_string();
        state.password_resets.insert(
            token.clone(),
            Grant {
                account_id,
                expires_at: Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS),
            },
        );
        info!("Password reset issued for account {}", account_id);
        Ok(token)
    }

    async fn confirm_password_reset(&self, reset_token: &str, new_password: &str) -> PortResult<()> {
        let password_hash = hash_password(new_password)?;
        let mut state = self.state.write().await;
        let grant = state
            .password_resets
            .remove(reset_token)
            .filter(|g| g.is_live(Utc::now()))
            .ok_or(PortError::Unauthorized)?;
        state.stored_mut(grant.account_id)?.password_hash = password_hash;
        Ok(())
    }

    async fn update_profile(&self, account: &Account, update: ProfileUpdate) -> PortResult<Account> {
        let mut state = self.state.write().await;
        let stored = state.stored_mut(account.id)?;
        if let Some(name) = update.name {
            stored.account.name = name.trim().to_string();
        }
        Ok(stored.account.clone())
    }

    async fn change_password(&self, account: &Account, current_password: &str, new_password: &str) -> PortResult<()> {
        let current_hash = self.state.read().await.stored(account.id)?.password_hash.clone();
        if !verify_password(current_password, &current_hash)? {
            return Err(PortError::Unauthorized);
        }
        let new_hash = hash_password(new_password)?;
        self.state.write().await.stored_mut(account.id)?.password_hash = new_hash;
        Ok(())
    }

    async fn current_account(&self, token: &str) -> PortResult<Option<Account>> {
        let now = Utc::now();
        {
            let state = self.state.read().await;
            match state.auth_sessions.get(token) {
                None => return Ok(None),
                Some(grant) if grant.is_live(now) => {
                    return Ok(state.accounts.get(&grant.account_id).map(|s| s.account.clone()));
                }
                Some(_) => {}
            }
        }
        // Expired: forget it so it cannot be looked up again.
        self.state.write().await.auth_sessions.remove(token);
        Ok(None)
    }

    fn subscribe(&self) -> AccountEventStream {
        self.events.stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            email: "ana@school.edu".into(),
        }
    }

    #[tokio::test]
    async fn documents_are_scoped_per_account_and_collection() {
        let store = InMemoryDocumentStore::new();
        let (ana, ben) = (account(), account());

        store.add(&ana, Collection::Tasks, json!({"title": "A"})).await.unwrap();
        store.add(&ana, Collection::Sessions, json!({"title": "S"})).await.unwrap();

        assert_eq!(store.list(&ana, Collection::Tasks).await.unwrap().len(), 1);
        assert_eq!(store.list(&ana, Collection::Sessions).await.unwrap().len(), 1);
        assert!(store.list(&ben, Collection::Tasks).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_and_delete_removes() {
        let store = InMemoryDocumentStore::new();
        let ana = account();
        let id = store
            .add(&ana, Collection::Tasks, json!({"title": "A", "subject": "Math"}))
            .await
            .unwrap();

        store
            .update(&ana, Collection::Tasks, &id, json!({"subject": null, "completed": true}))
            .await
            .unwrap();
        let docs = store.list(&ana, Collection::Tasks).await.unwrap();
        assert_eq!(docs[0].body, json!({"title": "A", "subject": null, "completed": true}));

        store.delete(&ana, Collection::Tasks, &id).await.unwrap();
        assert!(matches!(
            store.delete(&ana, Collection::Tasks, &id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            store.update(&ana, Collection::Tasks, &id, json!({})).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn register_login_logout_cycle_emits_events() {
        let identity = InMemoryIdentityProvider::new(Duration::days(30));
        let mut events = identity.subscribe();

        let signed_up = identity.register("Ana", "Ana@School.edu ", "secret1").await.unwrap();
        assert_eq!(signed_up.account.email, "ana@school.edu");
        assert_eq!(
            events.next().await,
            Some(AccountEvent::SignedIn(signed_up.account.clone()))
        );

        let again = identity.register("Ana", "ana@school.edu", "secret1").await;
        assert!(matches!(again, Err(PortError::Conflict(_))));

        let wrong = identity.login("ana@school.edu", "nope").await;
        assert!(matches!(wrong, Err(PortError::Unauthorized)));

        let logged_in = identity.login("ana@school.edu", "secret1").await.unwrap();
        assert_eq!(events.next().await, Some(AccountEvent::SignedIn(logged_in.account.clone())));
        assert_eq!(
            identity.current_account(&logged_in.token).await.unwrap(),
            Some(logged_in.account.clone())
        );

        identity.logout(&logged_in.token).await.unwrap();
        assert_eq!(events.next().await, Some(AccountEvent::SignedOut(logged_in.account.id)));
        assert_eq!(identity.current_account(&logged_in.token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_tokens_resolve_to_nobody() {
        let identity = InMemoryIdentityProvider::new(Duration::seconds(-1));
        let signed_in = identity.register("Ana", "ana@school.edu", "secret1").await.unwrap();
        assert_eq!(identity.current_account(&signed_in.token).await.unwrap(), None);
        assert!(identity.state.read().await.auth_sessions.is_empty());
    }

    #[tokio::test]
    async fn signing_in_drops_grants_that_already_expired() {
        let identity = InMemoryIdentityProvider::new(Duration::days(1));
        let ana = identity.register("Ana", "ana@school.edu", "secret1").await.unwrap();
        {
            let mut state = identity.state.write().await;
            for grant in state.auth_sessions.values_mut() {
                grant.expires_at = Utc::now() - Duration::minutes(1);
            }
            state.password_resets.insert(
                "stale-reset".to_string(),
                Grant { account_id: ana.account.id, expires_at: Utc::now() - Duration::minutes(1) },
            );
        }

        let fresh = identity.login("ana@school.edu", "secret1").await.unwrap();
        let state = identity.state.read().await;
        assert_eq!(state.auth_sessions.keys().collect::<Vec<_>>(), vec![&fresh.token]);
        assert!(state.password_resets.is_empty());
    }

    #[tokio::test]
    async fn password_reset_and_change() {
        let identity = InMemoryIdentityProvider::new(Duration::days(1));
        let ana = identity.register("Ana", "ana@school.edu", "secret1").await.unwrap().account;

        let token = identity.reset_password("ana@school.edu").await.unwrap();
        identity.confirm_password_reset(&token, "secret2").await.unwrap();
        assert!(matches!(
            identity.confirm_password_reset(&token, "secret3").await,
            Err(PortError::Unauthorized)
        ));
        assert!(identity.login("ana@school.edu", "secret2").await.is_ok());

        assert!(matches!(
            identity.change_password(&ana, "secret1", "secret4").await,
            Err(PortError::Unauthorized)
        ));
        identity.change_password(&ana, "secret2", "secret4").await.unwrap();
        assert!(identity.login("ana@school.edu", "secret4").await.is_ok());

        let renamed = identity
            .update_profile(&ana, ProfileUpdate { name: Some(" Ana B ".into()) })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ana B");
        assert!(matches!(
            identity.reset_password("nobody@school.edu").await,
            Err(PortError::NotFound(_))
        ));
    }
}
