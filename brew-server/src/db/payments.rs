//! Payment audit rows — one per order, created atomically with it

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub request_payload: Option<serde_json::Value>,
    pub response_status_code: Option<i32>,
    pub response_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Payloads must already be redacted by the caller; this function stores
/// them verbatim.
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    amount_cents: i64,
    request_payload: &serde_json::Value,
    response_status_code: Option<i32>,
    response_payload: &serde_json::Value,
) -> Result<Payment, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO payments (id, order_id, amount_cents, request_payload, response_status_code, response_payload)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(amount_cents)
    .bind(request_payload)
    .bind(response_status_code)
    .bind(response_payload)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_order(pool: &PgPool, order_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(pool)
        .await
}
