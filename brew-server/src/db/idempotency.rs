//! Idempotency ledger
//!
//! Durable mapping from a client key's digest to the outcome of a prior
//! order-creation attempt. Only the SHA-256 digest and a short preview are
//! stored, never the raw key. The unique index on `key_hash` is the sole
//! arbiter between concurrent attempts sharing a key: `claim` is the first
//! write of the admission transaction, so a racing attempt queues on the
//! index and observes the violation before the payment gateway is called.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Stored prefix length of the raw key (debugging only, not reversible).
pub const KEY_PREVIEW_LEN: usize = 32;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub key_hash: String,
    pub key_preview: Option<String>,
    pub order_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One-way digest of the client-supplied key.
pub fn hash_key(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Truncated prefix of the raw key, stored alongside the digest.
pub fn key_preview(raw: &str) -> String {
    raw.chars().take(KEY_PREVIEW_LEN).collect()
}

/// Find a non-expired record that already carries a committed result.
/// Expired records are logically absent; a claimed-but-unlinked row (a
/// not-yet-committed or abandoned attempt) is also treated as a miss.
pub async fn find_live(
    pool: &PgPool,
    key_hash: &str,
) -> Result<Option<IdempotencyRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM idempotency_keys
         WHERE key_hash = $1
           AND expires_at > now()
           AND order_id IS NOT NULL
           AND payment_id IS NOT NULL",
    )
    .bind(key_hash)
    .fetch_optional(pool)
    .await
}

/// Reserve the key inside the admission transaction. Expired rows with the
/// same hash are purged first, so the unique index only arbitrates between
/// live attempts. A unique violation here means another attempt holds the
/// key — see [`is_unique_violation`].
pub async fn claim(
    tx: &mut Transaction<'_, Postgres>,
    key_hash: &str,
    key_preview: &str,
    expires_at: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query("DELETE FROM idempotency_keys WHERE key_hash = $1 AND expires_at <= now()")
        .bind(key_hash)
        .execute(&mut **tx)
        .await?;

    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO idempotency_keys (id, key_hash, key_preview, expires_at)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(key_hash)
    .bind(key_preview)
    .bind(expires_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(id)
}

/// Attach the committed result ids to a claimed record (still inside the
/// admission transaction).
pub async fn link(
    tx: &mut Transaction<'_, Postgres>,
    record_id: Uuid,
    order_id: Uuid,
    payment_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE idempotency_keys SET order_id = $1, payment_id = $2 WHERE id = $3")
        .bind(order_id)
        .bind(payment_id)
        .bind(record_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Delete every expired record. Called from the periodic sweep task.
pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM idempotency_keys WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Whether an error is the PostgreSQL unique-constraint violation (23505),
/// i.e. another attempt won the ledger for this key.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_is_deterministic_hex() {
        let a = hash_key("attempt-1");
        let b = hash_key("attempt-1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_key_distinguishes_keys() {
        assert_ne!(hash_key("attempt-1"), hash_key("attempt-2"));
    }

    #[test]
    fn test_hash_is_not_the_raw_key() {
        let raw = "a-client-chosen-idempotency-key";
        assert_ne!(hash_key(raw), raw);
    }

    #[test]
    fn test_key_preview_truncates() {
        let long = "x".repeat(100);
        assert_eq!(key_preview(&long).len(), KEY_PREVIEW_LEN);
        assert_eq!(key_preview("short"), "short");
    }
}
