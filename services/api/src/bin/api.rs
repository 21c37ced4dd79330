//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, InMemoryDocumentStore, InMemoryIdentityProvider},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{router, state::AppState},
};
use chrono::Duration;
use futures::StreamExt;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use study_tracker_core::{AccountEvent, AccountEventStream, DocumentStore, IdentityProvider};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logs sign-in state changes until the server shuts down.
async fn watch_account_events(mut events: AccountEventStream, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.next() => match event {
                Some(AccountEvent::SignedIn(account)) => info!("Account {} signed in", account.id),
                Some(AccountEvent::SignedOut(account_id)) => info!("Account {} signed out", account_id),
                None => break,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Store & Identity Adapters ---
    let session_ttl = Duration::days(config.auth_session_days);
    let (store, identity) = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool, session_ttl));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            let store: Arc<dyn DocumentStore> = db_adapter.clone();
            let identity: Arc<dyn IdentityProvider> = db_adapter;
            (store, identity)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
            let identity: Arc<dyn IdentityProvider> = Arc::new(InMemoryIdentityProvider::new(session_ttl));
            (store, identity)
        }
    };

    // --- 3. Build the Shared AppState ---
    let shutdown = CancellationToken::new();
    let watcher = tokio::spawn(watch_account_events(identity.subscribe(), shutdown.clone()));
    let app_state = Arc::new(AppState::new(store, identity, config.clone()));

    // --- 4. Create the Web Router ---
    let app = router(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = watcher.await {
        warn!("Account event watcher ended abnormally: {}", e);
    }
    Ok(())
}
