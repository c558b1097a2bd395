//! Order Admission Engine
//!
//! One logical client attempt produces at most one charge and one persisted
//! order. Flow: idempotency fast path → catalog pricing → asserted-total
//! check → ledger claim → payment → atomic persistence.
//!
//! The ledger claim is the first write of the admission transaction. Racing
//! attempts with the same key queue on the ledger's unique index before the
//! payment gateway is ever called, so the loser serves the winner's order as
//! a replay instead of charging twice. If the winner aborts (declined
//! payment), its claim is rolled back and the blocked attempt proceeds with
//! its own charge.

use chrono::Utc;
use shared::error::{AppError, ErrorCode};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, idempotency, orders::Order};
use crate::error::ServiceError;
use crate::gateway::redact::redact;
use crate::state::AppState;

/// Upper bound on a single line item's quantity.
pub const MAX_ITEM_QUANTITY: i32 = 100;

/// How long a losing attempt waits for the winner's commit to land.
const WINNER_READ_ATTEMPTS: u32 = 10;
const WINNER_READ_BACKOFF_MS: u64 = 50;

/// One requested line item, not yet priced.
#[derive(Debug, Clone)]
pub struct DraftItem {
    pub product_id: Uuid,
    pub variation_id: Uuid,
    pub quantity: i32,
}

/// A single order-creation request as seen by the engine.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub items: Vec<DraftItem>,
    pub metadata: serde_json::Value,
    /// Client-asserted total; must match the computed total exactly.
    pub asserted_total_cents: Option<i64>,
    /// Raw client key; only its digest reaches storage.
    pub idempotency_key: Option<String>,
}

/// Outcome of admission. `replayed` distinguishes "newly created" from
/// "this exact request already succeeded" on the outward surface without
/// being part of the order itself.
#[derive(Debug, Clone)]
pub struct Admission {
    pub order: Order,
    pub replayed: bool,
}

/// A line item with its unit price snapshotted from the catalog.
#[derive(Debug, Clone)]
struct PricedItem {
    product_id: Uuid,
    variation_id: Uuid,
    quantity: i32,
    unit_price_cents: i64,
}

fn validate(draft: &OrderDraft) -> Result<(), AppError> {
    if draft.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    for item in &draft.items {
        if item.quantity < 1 || item.quantity > MAX_ITEM_QUANTITY {
            return Err(AppError::validation(format!(
                "quantity must be between 1 and {MAX_ITEM_QUANTITY}"
            ))
            .with_detail("variation_id", item.variation_id.to_string())
            .with_detail("quantity", item.quantity));
        }
    }
    Ok(())
}

/// Σ unit_price × quantity, overflow-checked.
fn compute_total(items: &[PricedItem]) -> Option<i64> {
    items.iter().try_fold(0i64, |total, item| {
        let line = item.unit_price_cents.checked_mul(i64::from(item.quantity))?;
        total.checked_add(line)
    })
}

async fn price_items(
    pool: &PgPool,
    items: &[DraftItem],
) -> Result<(Vec<PricedItem>, i64), ServiceError> {
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        let unit_price_cents =
            match db::catalog::resolve_unit_price(pool, item.product_id, item.variation_id).await? {
                Some(price) => price,
                None => {
                    let code = if db::catalog::product_exists(pool, item.product_id).await? {
                        ErrorCode::VariationNotFound
                    } else {
                        ErrorCode::ProductNotFound
                    };
                    return Err(AppError::new(code)
                        .with_detail("product_id", item.product_id.to_string())
                        .with_detail("variation_id", item.variation_id.to_string())
                        .into());
                }
            };
        priced.push(PricedItem {
            product_id: item.product_id,
            variation_id: item.variation_id,
            quantity: item.quantity,
            unit_price_cents,
        });
    }

    let total_cents = compute_total(&priced)
        .ok_or_else(|| AppError::validation("order total overflows the supported range"))?;
    Ok((priced, total_cents))
}

/// Admit one order-creation request: price it, charge the provider, persist
/// the result exactly once for the given idempotency key.
pub async fn place_order(
    state: &AppState,
    customer_id: Uuid,
    draft: OrderDraft,
) -> Result<Admission, ServiceError> {
    let keyed = draft
        .idempotency_key
        .as_deref()
        .map(|raw| (idempotency::hash_key(raw), idempotency::key_preview(raw)));

    // Fast path: a finished attempt with this key already exists. The stored
    // result is served unchanged, before any validation or pricing.
    if let Some((hash, _)) = &keyed {
        if let Some(record) = idempotency::find_live(&state.pool, hash).await? {
            return replay_from_record(&state.pool, &record).await;
        }
    }

    validate(&draft)?;

    let (priced, total_cents) = price_items(&state.pool, &draft.items).await?;

    // Charging an amount the client did not expect is unacceptable; reject
    // before any gateway traffic.
    if let Some(asserted) = draft.asserted_total_cents {
        if asserted != total_cents {
            return Err(AppError::with_message(
                ErrorCode::TotalMismatch,
                format!("total mismatch: computed {total_cents}, received {asserted}"),
            )
            .with_detail("computed_total_cents", total_cents)
            .with_detail("asserted_total_cents", asserted)
            .into());
        }
    }

    let mut tx = state.pool.begin().await?;

    let claim_id = match &keyed {
        Some((hash, preview)) => {
            let expires_at = Utc::now() + state.idempotency_ttl;
            match idempotency::claim(&mut tx, hash, preview, expires_at).await {
                Ok(id) => Some(id),
                Err(err) if idempotency::is_unique_violation(&err) => {
                    // A concurrent attempt with the same key won the ledger.
                    tx.rollback().await.ok();
                    tracing::info!(key_preview = %preview, "idempotency race lost, serving winner's order");
                    return replay_from_winner(&state.pool, hash).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
        None => None,
    };

    let response = state.payment.charge(total_cents).await;
    if !response.is_success() {
        // No order, item, or payment row survives a declined charge; the
        // ledger claim is rolled back too, so the same key may be retried.
        tx.rollback().await.ok();
        tracing::warn!(
            provider_status = response.status,
            total_cents,
            "payment declined, order aborted"
        );
        return Err(AppError::with_message(
            ErrorCode::PaymentFailed,
            format!("payment failed with status {}", response.status),
        )
        .with_detail("provider_status", response.status)
        .with_detail("provider_response", redact(&response.body))
        .into());
    }

    let order = db::orders::insert(
        &mut tx,
        Uuid::new_v4(),
        customer_id,
        total_cents,
        &draft.metadata,
    )
    .await?;

    for item in &priced {
        db::orders::insert_item(
            &mut tx,
            order.id,
            item.product_id,
            item.variation_id,
            item.quantity,
            item.unit_price_cents,
        )
        .await?;
    }

    let request_payload = serde_json::json!({ "value": total_cents });
    let payment = db::payments::insert(
        &mut tx,
        order.id,
        total_cents,
        &request_payload,
        response.status_code(),
        &redact(&response.body),
    )
    .await?;

    if let Some(record_id) = claim_id {
        idempotency::link(&mut tx, record_id, order.id, payment.id).await?;
    }

    match tx.commit().await {
        Ok(()) => {}
        Err(err) if idempotency::is_unique_violation(&err) => {
            if let Some((hash, _)) = &keyed {
                return replay_from_winner(&state.pool, hash).await;
            }
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(order_id = %order.id, customer_id = %customer_id, total_cents, "order created");
    Ok(Admission {
        order,
        replayed: false,
    })
}

/// The winner's commit may still be in flight when the loser observes the
/// unique violation; poll briefly for the linked record to land.
async fn replay_from_winner(pool: &PgPool, key_hash: &str) -> Result<Admission, ServiceError> {
    for _ in 0..WINNER_READ_ATTEMPTS {
        if let Some(record) = idempotency::find_live(pool, key_hash).await? {
            return replay_from_record(pool, &record).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(WINNER_READ_BACKOFF_MS)).await;
    }
    Err(AppError::internal("concurrent attempt with this idempotency key did not complete").into())
}

async fn replay_from_record(
    pool: &PgPool,
    record: &idempotency::IdempotencyRecord,
) -> Result<Admission, ServiceError> {
    let order_id = record
        .order_id
        .ok_or_else(|| AppError::internal("idempotency record has no order linked"))?;
    let order = db::orders::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| AppError::internal("idempotency record points at a missing order"))?;
    tracing::info!(order_id = %order.id, "idempotent replay served");
    Ok(Admission {
        order,
        replayed: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(items: Vec<DraftItem>) -> OrderDraft {
        OrderDraft {
            items,
            metadata: serde_json::json!({}),
            asserted_total_cents: None,
            idempotency_key: None,
        }
    }

    fn item(quantity: i32) -> DraftItem {
        DraftItem {
            product_id: Uuid::new_v4(),
            variation_id: Uuid::new_v4(),
            quantity,
        }
    }

    fn priced(quantity: i32, unit_price_cents: i64) -> PricedItem {
        PricedItem {
            product_id: Uuid::new_v4(),
            variation_id: Uuid::new_v4(),
            quantity,
            unit_price_cents,
        }
    }

    #[test]
    fn test_empty_order_is_rejected() {
        let err = validate(&draft(vec![])).unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        for quantity in [0, -1] {
            let err = validate(&draft(vec![item(quantity)])).unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
        }
    }

    #[test]
    fn test_quantity_above_cap_is_rejected() {
        let err = validate(&draft(vec![item(MAX_ITEM_QUANTITY + 1)])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(validate(&draft(vec![item(1), item(MAX_ITEM_QUANTITY)])).is_ok());
    }

    #[test]
    fn test_compute_total_sums_snapshot_prices() {
        let items = vec![priced(2, 450), priced(1, 350)];
        assert_eq!(compute_total(&items), Some(1250));
    }

    #[test]
    fn test_compute_total_detects_overflow() {
        let items = vec![priced(100, i64::MAX / 2)];
        assert_eq!(compute_total(&items), None);

        let items = vec![priced(1, i64::MAX), priced(1, 1)];
        assert_eq!(compute_total(&items), None);
    }

    #[test]
    fn test_compute_total_of_nothing_is_zero() {
        assert_eq!(compute_total(&[]), Some(0));
    }
}
