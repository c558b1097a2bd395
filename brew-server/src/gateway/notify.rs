//! Notification gateway client
//!
//! Fire-and-forget: the caller records whatever comes back but never fails
//! the triggering request because of this gateway.

use std::time::Duration;

use async_trait::async_trait;

use super::{GatewayResponse, NotificationGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Announces a status change with `POST {url}` and body `{"status": "..."}`.
pub struct HttpNotificationGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpNotificationGateway {
    pub fn new(url: String, timeout: Duration) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationGateway for HttpNotificationGateway {
    async fn notify(&self, status: &str) -> GatewayResponse {
        let payload = serde_json::json!({ "status": status });
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let body = resp
                    .json()
                    .await
                    .unwrap_or_else(|_| serde_json::json!({}));
                tracing::info!(status_code, order_status = status, "notification gateway responded");
                GatewayResponse {
                    status: status_code,
                    body,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, order_status = status, "notification gateway request failed");
                GatewayResponse::transport_failure(e.to_string())
            }
        }
    }
}
