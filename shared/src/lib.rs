//! Shared types for the Brew ordering service
//!
//! Error codes, API response structures, and the order status state
//! machine used by the service crate and its tests.

pub mod error;
pub mod models;

// Re-exports
pub use serde::{Deserialize, Serialize};
