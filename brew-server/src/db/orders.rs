//! Order and order-item rows
//!
//! Writes happen inside the admission/lifecycle transactions; reads go
//! straight to the pool.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::OrderStatus;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    customer_id: Uuid,
    total_cents: i64,
    metadata: &serde_json::Value,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO orders (id, customer_id, status, total_cents, metadata)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(id)
    .bind(customer_id)
    .bind(OrderStatus::Waiting)
    .bind(total_cents)
    .bind(metadata)
    .fetch_one(&mut **tx)
    .await
}

pub async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    product_id: Uuid,
    variation_id: Uuid,
    quantity: i32,
    unit_price_cents: i64,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO order_items (id, order_id, product_id, variation_id, quantity, unit_price_cents)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(product_id)
    .bind(variation_id)
    .bind(quantity)
    .bind(unit_price_cents)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_customer(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
}

pub async fn items_for_order(pool: &PgPool, order_id: Uuid) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY created_at")
        .bind(order_id)
        .fetch_all(pool)
        .await
}

/// Lock the order row for a read-modify-write (`SELECT ... FOR UPDATE`).
/// Only this row is locked; plain readers are not blocked.
pub async fn lock_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    status: OrderStatus,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_one(&mut **tx)
    .await
}
