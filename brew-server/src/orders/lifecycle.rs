//! Order Lifecycle Machine
//!
//! Serializes status changes per order with a row lock, validates the
//! requested transition against the fixed flow, and dispatches a
//! notification after the commit. Two racing updates for the same order
//! serialize on the lock; the second is evaluated against the post-update
//! status and fails as a stale transition. Other orders are unaffected.

use shared::error::{AppError, ErrorCode};
use shared::models::OrderStatus;
use uuid::Uuid;

use crate::db::{self, orders::Order};
use crate::error::ServiceError;
use crate::gateway::redact::redact;
use crate::state::AppState;

/// Advance one order to `requested`, which must be the immediate successor
/// of its current status. The row lock is released before the notification
/// gateway is called, so a slow provider never stalls other updates.
pub async fn advance(
    state: &AppState,
    order_id: Uuid,
    requested: OrderStatus,
) -> Result<Order, ServiceError> {
    let mut tx = state.pool.begin().await?;

    let Some(current) = db::orders::lock_for_update(&mut tx, order_id).await? else {
        tx.rollback().await.ok();
        return Err(AppError::new(ErrorCode::OrderNotFound).into());
    };

    if !current.status.can_advance_to(requested) {
        tx.rollback().await.ok();
        let allowed = current
            .status
            .next()
            .map(OrderStatus::as_str)
            .unwrap_or("none");
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!(
                "invalid transition: current status is {}, only next allowed is {allowed}",
                current.status
            ),
        )
        .with_detail("current_status", current.status.as_str())
        .with_detail("requested_status", requested.as_str())
        .with_detail("allowed_next", allowed)
        .into());
    }

    let updated = db::orders::set_status(&mut tx, order_id, requested).await?;
    tx.commit().await?;

    tracing::info!(order_id = %order_id, status = %requested, "order status advanced");

    // Outside the critical section from here on.
    dispatch_notification(state, &updated).await;

    Ok(updated)
}

/// Call the notification gateway and record the attempt. Failures are
/// recorded and logged, never propagated: the status change has already
/// committed and is not rolled back for a notification error.
async fn dispatch_notification(state: &AppState, order: &Order) {
    let response = state.notifier.notify(order.status.as_str()).await;
    if !response.is_success() {
        tracing::warn!(
            order_id = %order.id,
            provider_status = response.status,
            "notification delivery failed"
        );
    }

    if let Err(err) = db::notifications::insert(
        &state.pool,
        order.id,
        order.status.as_str(),
        response.status_code(),
        &redact(&response.body),
    )
    .await
    {
        tracing::error!(order_id = %order.id, error = %err, "failed to record notification attempt");
    }
}
