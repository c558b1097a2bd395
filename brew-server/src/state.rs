//! Application state for brew-server

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::config::Config;
use crate::gateway::{
    HttpNotificationGateway, HttpPaymentGateway, NotificationGateway, PaymentGateway,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Payment provider client
    pub payment: Arc<dyn PaymentGateway>,
    /// Notification provider client
    pub notifier: Arc<dyn NotificationGateway>,
    /// Time-to-live for idempotency records
    pub idempotency_ttl: chrono::Duration,
}

impl AppState {
    /// Create a new AppState: connect the pool, run migrations, build the
    /// timeout-bounded gateway clients.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let payment = HttpPaymentGateway::new(
            config.payment_service_url.clone(),
            Duration::from_millis(config.payment_timeout_ms),
        )?;
        let notifier = HttpNotificationGateway::new(
            config.notification_service_url.clone(),
            Duration::from_millis(config.notification_timeout_ms),
        )?;

        Ok(Self {
            pool,
            payment: Arc::new(payment),
            notifier: Arc::new(notifier),
            idempotency_ttl: chrono::Duration::hours(config.idempotency_ttl_hours),
        })
    }

    /// Assemble a state from pre-built parts (tests inject mock gateways here).
    pub fn with_parts(
        pool: PgPool,
        payment: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationGateway>,
        idempotency_ttl: chrono::Duration,
    ) -> Self {
        Self {
            pool,
            payment,
            notifier,
            idempotency_ttl,
        }
    }
}
