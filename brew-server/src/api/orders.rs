//! Order API handlers
//!
//! POST  /api/orders             — place order (Idempotency-Key header; 201 new, 200 replay)
//! GET   /api/orders             — list a customer's orders
//! GET   /api/orders/{id}        — order detail with items and payment
//! PATCH /api/orders/{id}/status — advance the status machine

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{ORDER_STATUS_FLOW, OrderStatus};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::error::ServiceError;
use crate::orders::{self, DraftItem, OrderDraft, admission::MAX_ITEM_QUANTITY};
use crate::state::AppState;

// ── Request / Response types ──

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemCreate {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    #[validate(range(min = 1, max = 100))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderCreate {
    pub customer_id: Uuid,
    #[validate(length(min = 1), nested)]
    pub items: Vec<OrderItemCreate>,
    pub metadata: Option<serde_json::Value>,
    /// Optional client-asserted total; if present it must match exactly.
    pub total_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub customer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub amount_cents: i64,
    pub response_status_code: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub metadata: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<OrderItemView>,
    pub payment: Option<PaymentView>,
}

// ── Helpers ──

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_status(raw: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = ORDER_STATUS_FLOW.iter().map(|s| s.as_str()).collect();
        AppError::validation(format!(
            "invalid status: {raw}. Allowed: {}",
            allowed.join(", ")
        ))
    })
}

async fn order_view(pool: &PgPool, order: db::orders::Order) -> Result<OrderView, ServiceError> {
    let (items, payment) = tokio::try_join!(
        db::orders::items_for_order(pool, order.id),
        db::payments::find_by_order(pool, order.id),
    )?;

    Ok(OrderView {
        id: order.id,
        customer_id: order.customer_id,
        status: order.status,
        total_cents: order.total_cents,
        metadata: order.metadata,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items: items
            .into_iter()
            .map(|it| OrderItemView {
                product_id: it.product_id,
                variation_id: it.variation_id,
                quantity: it.quantity,
                unit_price_cents: it.unit_price_cents,
                line_total_cents: i64::from(it.quantity) * it.unit_price_cents,
            })
            .collect(),
        payment: payment.map(|p| PaymentView {
            id: p.id,
            amount_cents: p.amount_cents,
            response_status_code: p.response_status_code,
        }),
    })
}

// ── POST /api/orders ──

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OrderCreate>,
) -> Result<(StatusCode, Json<OrderView>), ServiceError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let draft = OrderDraft {
        items: body
            .items
            .iter()
            .map(|it| DraftItem {
                product_id: it.product_id,
                variation_id: it.variation_id,
                quantity: it.quantity,
            })
            .collect(),
        metadata: body.metadata.unwrap_or_else(|| serde_json::json!({})),
        asserted_total_cents: body.total_cents,
        idempotency_key: idempotency_key(&headers),
    };

    let admission = orders::place_order(&state, body.customer_id, draft).await?;
    let status = if admission.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let view = order_view(&state.pool, admission.order).await?;
    Ok((status, Json(view)))
}

// ── GET /api/orders/{id} ──

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderView>, ServiceError> {
    let order = db::orders::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    Ok(Json(order_view(&state.pool, order).await?))
}

// ── GET /api/orders?customer_id=… ──

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Json<Vec<db::orders::Order>>, ServiceError> {
    let orders = db::orders::list_for_customer(&state.pool, query.customer_id).await?;
    Ok(Json(orders))
}

// ── PATCH /api/orders/{id}/status ──

pub async fn update_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<OrderStatusUpdate>,
) -> Result<Json<OrderView>, ServiceError> {
    let requested = parse_status(&body.status)?;
    let order = orders::advance(&state, order_id, requested).await?;
    Ok(Json(order_view(&state.pool, order).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_order_create_requires_items() {
        let body = OrderCreate {
            customer_id: Uuid::new_v4(),
            items: vec![],
            metadata: None,
            total_cents: None,
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_order_create_rejects_out_of_range_quantity() {
        for quantity in [0, MAX_ITEM_QUANTITY + 1] {
            let body = OrderCreate {
                customer_id: Uuid::new_v4(),
                items: vec![OrderItemCreate {
                    product_id: Uuid::new_v4(),
                    variation_id: Uuid::new_v4(),
                    quantity,
                }],
                metadata: None,
                total_cents: None,
            };
            assert!(body.validate().is_err(), "quantity {quantity} should fail");
        }
    }

    #[test]
    fn test_parse_status_lists_allowed_values() {
        assert_eq!(parse_status("preparation").unwrap(), OrderStatus::Preparation);

        let err = parse_status("shipped").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("waiting, preparation, ready, delivered"));
    }

    #[test]
    fn test_idempotency_key_header_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(idempotency_key(&headers), None);

        headers.insert("Idempotency-Key", "attempt-1".parse().unwrap());
        assert_eq!(idempotency_key(&headers), Some("attempt-1".to_string()));
    }
}
