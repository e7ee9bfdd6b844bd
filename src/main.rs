//! # Passkey Todo Server
//!
//! Entry point: loads configuration, opens the database, starts the
//! background tasks and serves the HTTP API.

use passkey_todo_server::config::Config;
use passkey_todo_server::db::ChallengeStore;
use passkey_todo_server::reminders::LogNotifier;
use passkey_todo_server::router;
use passkey_todo_server::state::AppState;
use std::sync::Arc;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main application entry point
///
/// 1. Sets up logging
/// 2. Loads configuration from the environment
/// 3. Opens the database and builds the services
/// 4. Spawns challenge cleanup and reminder polling
/// 5. Serves the router with SQLite-backed sessions
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: info for dependencies, debug for this crate; RUST_LOG overrides
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_todo_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let app_state = AppState::new(&config, Arc::new(LogNotifier)).await?;
    tracing::info!(
        rp_id = %config.rp_id,
        counter_policy = %config.counter_policy,
        require_user_verification = config.require_user_verification,
        "Application state initialized"
    );

    // Login challenges live for minutes; sweep the abandoned ones every 10
    let cleanup_store = app_state.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            tracing::debug!("Running challenge cleanup task");
            match cleanup_store.cleanup_expired_challenges(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Expired challenges removed"),
                Err(e) => tracing::error!("Challenge cleanup failed: {:?}", e),
            }
        }
    });

    let reminders = app_state.reminders.clone();
    if !reminders.request_permission().await {
        tracing::info!("Server-side reminders idle; clients poll /api/notifications/check");
    }
    tokio::spawn(reminders.run());

    let session_store = SqliteStore::new(app_state.db.clone());
    session_store.migrate().await?;

    let app = router(app_state, session_store);

    let bind_addr = config.bind_address();
    tracing::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
