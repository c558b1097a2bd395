//! brew-server entry point
//!
//! Long-running HTTP service:
//! - Prices and admits customer orders (idempotency-key deduplication)
//! - Charges the payment provider before any order row exists
//! - Drives the order status state machine and dispatches notifications

use brew_server::api;
use brew_server::config::Config;
use brew_server::db;
use brew_server::state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Sweep interval for expired idempotency records
const PURGE_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brew_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting brew-server (env: {})", config.environment);

    // Initialize application state (pool, migrations, gateway clients)
    let state = AppState::new(&config).await?;

    // Periodic purge of expired idempotency records. Lazy per-key purging in
    // the admission path keeps the unique index satisfiable; this sweep only
    // bounds table growth.
    let purge_pool = state.pool.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match db::idempotency::purge_expired(&purge_pool).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(purged = n, "expired idempotency records removed"),
                Err(e) => tracing::error!("idempotency purge error: {e}"),
            }
        }
    });

    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("brew-server HTTP listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
