//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` and `IdentityProvider` ports from the `core` crate. It
//! handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use study_tracker_core::{
    Account, AccountEvent, AccountEventStream, Collection, DocumentStore, IdentityProvider, PortError,
    PortResult, ProfileUpdate, RawDocument, SignedIn,
};
use tracing::info;
use uuid::Uuid;

use crate::adapters::events::AccountEvents;
use crate::adapters::password::{hash_password, verify_password};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` and `IdentityProvider` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    events: AccountEvents,
    session_ttl: Duration,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool, session_ttl: Duration) -> Self {
        Self {
            pool,
            events: AccountEvents::default(),
            session_ttl,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn create_auth_session(&self, account_id: Uuid) -> PortResult<String> {
        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO auth_sessions (id, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(account_id)
            .bind(Utc::now() + self.session_ttl)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(token)
    }

    async fn account_by_id(&self, account_id: Uuid) -> PortResult<AccountRecord> {
        sqlx::query_as::<_, AccountRecord>(
            "SELECT id, name, email, password_hash FROM accounts WHERE id = $1",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Account {} not found", account_id)),
            _ => unexpected(e),
        })
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

/// Ids the store did not issue can never match a row.
fn document_id(collection: Collection, id: &str) -> PortResult<Uuid> {
    Uuid::parse_str(id)
        .map_err(|_| PortError::NotFound(format!("{} document {} not found", collection, id)))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
}
impl AccountRecord {
    fn to_domain(self) -> Account {
        Account {
            id: self.id,
            name: self.name,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    body: Value,
}
impl DocumentRecord {
    fn to_domain(self) -> RawDocument {
        RawDocument {
            id: self.id.to_string(),
            body: self.body,
        }
    }
}

#[derive(FromRow)]
struct GrantRecord {
    account_id: Uuid,
    expires_at: DateTime<Utc>,
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn add(&self, account: &Account, collection: Collection, body: Value) -> PortResult<String> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, account_id, collection, body) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(account.id)
            .bind(collection.as_str())
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(id.to_string())
    }

    async fn list(&self, account: &Account, collection: Collection) -> PortResult<Vec<RawDocument>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, body FROM documents WHERE account_id = $1 AND collection = $2",
        )
        .bind(account.id)
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update(&self, account: &Account, collection: Collection, id: &str, patch: Value) -> PortResult<()> {
        let doc_id = document_id(collection, id)?;
        let result = sqlx::query(
            "UPDATE documents SET body = body || $1, updated_at = now() \
             WHERE id = $2 AND account_id = $3 AND collection = $4",
        )
        .bind(patch)
        .bind(doc_id)
        .bind(account.id)
        .bind(collection.as_str())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("{} document {} not found", collection, id)));
        }
        Ok(())
    }

    async fn delete(&self, account: &Account, collection: Collection, id: &str) -> PortResult<()> {
        let doc_id = document_id(collection, id)?;
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND account_id = $2 AND collection = $3")
            .bind(doc_id)
            .bind(account.id)
            .bind(collection.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("{} document {} not found", collection, id)));
        }
        Ok(())
    }
}

//=========================================================================================
// `IdentityProvider` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for DbAdapter {
    async fn register(&self, name: &str, email: &str, password: &str) -> PortResult<SignedIn> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (id, name, email, password_hash) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, password_hash",
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(&email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                PortError::Conflict(format!("An account for {} already exists", email))
            } else {
                unexpected(e)
            }
        })?;

        let account = record.to_domain();
        let token = self.create_auth_session(account.id).await?;
        self.events.publish(AccountEvent::SignedIn(account.clone()));
        Ok(SignedIn { account, token })
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<SignedIn> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT id, name, email, password_hash FROM accounts WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if !verify_password(password, &record.password_hash)? {
            return Err(PortError::Unauthorized);
        }

        let account = record.to_domain();
        let token = self.create_auth_session(account.id).await?;
        self.events.publish(AccountEvent::SignedIn(account.clone()));
        Ok(SignedIn { account, token })
    }

    async fn logout(&self, token: &str) -> PortResult<()> {
        let account_id: Uuid = sqlx::query_scalar::<_, Uuid>("DELETE FROM auth_sessions WHERE id = $1 RETURNING account_id")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or(PortError::Unauthorized)?;

        self.events.publish(AccountEvent::SignedOut(account_id));
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> PortResult<String> {
        let email = normalize_email(email);
        let account_id: Uuid = sqlx::query_scalar::<_, Uuid>("SELECT id FROM accounts WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("No account for {}", email)))?;

        let token = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO password_resets (token, account_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(account_id)
            .bind(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS))
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        info!("Password reset issued for account {}", account_id);
        Ok(token)
    }

    async fn confirm_password_reset(&self, reset_token: &str, new_password: &str) -> PortResult<()> {
        let grant = sqlx::query_as::<_, GrantRecord>(
            "DELETE FROM password_resets WHERE token = $1 RETURNING account_id, expires_at",
        )
        .bind(reset_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .filter(|g| g.expires_at > Utc::now())
        .ok_or(PortError::Unauthorized)?;

        sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
            .bind(hash_password(new_password)?)
            .bind(grant.account_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn update_profile(&self, account: &Account, update: ProfileUpdate) -> PortResult<Account> {
        if let Some(name) = update.name {
            sqlx::query("UPDATE accounts SET name = $1 WHERE id = $2")
                .bind(name.trim())
                .bind(account.id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        }
        Ok(self.account_by_id(account.id).await?.to_domain())
    }

    async fn change_password(&self, account: &Account, current_password: &str, new_password: &str) -> PortResult<()> {
        let record = self.account_by_id(account.id).await?;
        if !verify_password(current_password, &record.password_hash)? {
            return Err(PortError::Unauthorized);
        }
        sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
            .bind(hash_password(new_password)?)
            .bind(account.id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn current_account(&self, token: &str) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(
            "SELECT a.id, a.name, a.email, a.password_hash FROM auth_sessions s \
             JOIN accounts a ON a.id = s.account_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(AccountRecord::to_domain))
    }

    fn subscribe(&self) -> AccountEventStream {
        self.events.stream()
    }
}
