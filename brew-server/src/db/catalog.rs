//! Catalog lookup
//!
//! The catalog itself (product CRUD) is owned elsewhere; the admission
//! engine only resolves (product, variation) pairs to current unit prices.

use sqlx::PgPool;
use uuid::Uuid;

/// Resolve the current unit price for a (product, variation) pair:
/// base price plus the variation's price change. `None` when the variation
/// does not exist under the given product.
pub async fn resolve_unit_price(
    pool: &PgPool,
    product_id: Uuid,
    variation_id: Uuid,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT p.base_price_cents + v.price_change_cents
         FROM product_variations v
         JOIN products p ON p.id = v.product_id
         WHERE v.id = $1 AND v.product_id = $2",
    )
    .bind(variation_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

/// Whether a product exists at all (distinguishes "unknown product" from
/// "unknown variation for a known product" on the error surface).
pub async fn product_exists(pool: &PgPool, product_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}
