//! Notification audit log — append-only, one row per status-change attempt
//!
//! Failed attempts are recorded here too; nothing in the request path ever
//! retries them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub response_status_code: Option<i32>,
    pub response_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    pool: &PgPool,
    order_id: Uuid,
    status: &str,
    response_status_code: Option<i32>,
    response_payload: &serde_json::Value,
) -> Result<NotificationRecord, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO notifications (id, order_id, status, response_status_code, response_payload)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(status)
    .bind(response_status_code)
    .bind(response_payload)
    .fetch_one(pool)
    .await
}

pub async fn list_for_order(
    pool: &PgPool,
    order_id: Uuid,
) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM notifications WHERE order_id = $1 ORDER BY created_at")
        .bind(order_id)
        .fetch_all(pool)
        .await
}
