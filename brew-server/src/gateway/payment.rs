//! Payment gateway client (REST, no SDK dependency)

use std::time::Duration;

use async_trait::async_trait;

use super::{GatewayResponse, PaymentGateway};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Charges the payment provider with `POST {url}` and body
/// `{"value": <amount in minor units>}`.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpPaymentGateway {
    pub fn new(url: String, timeout: Duration) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, amount_cents: i64) -> GatewayResponse {
        let payload = serde_json::json!({ "value": amount_cents });
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp
                    .json()
                    .await
                    .unwrap_or_else(|_| serde_json::json!({}));
                tracing::info!(status, amount_cents, "payment gateway responded");
                GatewayResponse { status, body }
            }
            Err(e) => {
                // A timeout is a declined charge, never an ambiguous success.
                tracing::warn!(error = %e, amount_cents, "payment gateway request failed");
                GatewayResponse::transport_failure(e.to_string())
            }
        }
    }
}
