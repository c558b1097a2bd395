//! Order status state machine
//!
//! The lifecycle is a strict linear flow with no skips, repeats, or
//! reversals. The transition table is [`ORDER_STATUS_FLOW`]; adding or
//! removing a state is a single edit there.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status — strict flow `waiting → preparation → ready → delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "order_status_enum", rename_all = "lowercase")
)]
pub enum OrderStatus {
    /// Initial status of every new order
    #[default]
    Waiting,
    Preparation,
    Ready,
    /// Terminal status, no outgoing transitions
    Delivered,
}

/// The fixed transition sequence. Each status may only advance to its
/// immediate successor in this array.
pub const ORDER_STATUS_FLOW: [OrderStatus; 4] = [
    OrderStatus::Waiting,
    OrderStatus::Preparation,
    OrderStatus::Ready,
    OrderStatus::Delivered,
];

impl OrderStatus {
    /// The sole legal successor, or `None` for the terminal status.
    pub fn next(self) -> Option<OrderStatus> {
        let idx = ORDER_STATUS_FLOW.iter().position(|s| *s == self)?;
        ORDER_STATUS_FLOW.get(idx + 1).copied()
    }

    /// Whether `target` is the immediate successor of `self`.
    pub fn can_advance_to(self, target: OrderStatus) -> bool {
        self.next() == Some(target)
    }

    /// Whether this status has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Waiting => "waiting",
            OrderStatus::Preparation => "preparation",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Parse a wire-format status name (the lowercase serde form).
    pub fn parse(s: &str) -> Option<OrderStatus> {
        ORDER_STATUS_FLOW.iter().copied().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
