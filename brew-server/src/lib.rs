//! brew-server — order admission and lifecycle service
//!
//! Accepts customer orders for a retail catalog, charges an external payment
//! provider exactly once per logical attempt (Idempotency-Key deduplication),
//! and drives the order status state machine with per-order serialization
//! and best-effort notification dispatch.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod state;
