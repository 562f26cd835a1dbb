//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of a vending order.
///
/// State transitions:
/// ```text
/// PendingPayment ──┬──► Completed
///                  └──► Cancelled
/// ```
///
/// Both outcomes are terminal; a finalized order can never be
/// re-approved or re-cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Reservation recorded, awaiting payment proof and human approval.
    /// Stock is untouched in this state.
    #[default]
    PendingPayment,

    /// Payment approved, inventory debited, item delivered (terminal).
    Completed,

    /// Order was rejected or withdrawn; no inventory change (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if the order can be approved in this state.
    pub fn can_approve(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment)
    }

    /// Returns true if the order can be rejected in this state.
    pub fn can_reject(&self) -> bool {
        matches!(self, OrderStatus::PendingPayment)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
