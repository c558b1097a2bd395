//! External collaborator clients: payment and notification gateways
//!
//! Both gateways are modeled as traits so the admission engine and the
//! lifecycle machine can be exercised against counting/failing mocks. The
//! HTTP implementations are reqwest clients with a per-call timeout.

mod notify;
mod payment;
pub mod redact;

pub use notify::HttpNotificationGateway;
pub use payment::HttpPaymentGateway;

use async_trait::async_trait;

/// Raw outcome of a gateway call: the provider's HTTP status plus its JSON
/// body. Transport failures (connect errors, timeouts) fold into a synthetic
/// non-success response with `status` 0, so the audit trail always has
/// something to record and a timeout can never be mistaken for success.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl GatewayResponse {
    /// Any 2xx provider status counts as success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Synthetic failure for transport-level errors (no provider response).
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: serde_json::json!({ "error": message.into() }),
        }
    }

    /// Provider status as a nullable audit column value (0 means "no
    /// response was received").
    pub fn status_code(&self) -> Option<i32> {
        (self.status != 0).then_some(i32::from(self.status))
    }
}

/// Payment provider: charges an amount in minor currency units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge `amount_cents`. Implementations must fold transport errors and
    /// timeouts into a non-success [`GatewayResponse`] — the admission engine
    /// treats anything but 2xx as a declined charge.
    async fn charge(&self, amount_cents: i64) -> GatewayResponse;
}

/// Notification provider: fire-and-forget status announcements.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn notify(&self, status: &str) -> GatewayResponse;
}
