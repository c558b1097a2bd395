//! Service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Payment provider endpoint
    pub payment_service_url: String,
    /// Notification provider endpoint
    pub notification_service_url: String,
    /// Payment call timeout (milliseconds); a timeout is a declined charge
    pub payment_timeout_ms: u64,
    /// Notification call timeout (milliseconds)
    pub notification_timeout_ms: u64,
    /// Idempotency record time-to-live (hours)
    pub idempotency_ttl_hours: i64,
    /// Environment: development | staging | production
    pub environment: String,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT", 8080),
            payment_service_url: std::env::var("PAYMENT_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:9470/api/v1/payment".into()),
            notification_service_url: std::env::var("NOTIFICATION_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:9470/api/v1/notification".into()),
            payment_timeout_ms: env_parse("PAYMENT_TIMEOUT_MS", 10_000),
            notification_timeout_ms: env_parse("NOTIFICATION_TIMEOUT_MS", 5_000),
            idempotency_ttl_hours: env_parse("IDEMPOTENCY_TTL_HOURS", 24),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        })
    }
}
