//! Orders and their audit fields.

use chrono::{DateTime, Utc};
use common::{ChannelId, OrderId, ProductId, SubjectId};
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// One purchase reservation and its lifecycle record.
///
/// The payment proof and processing fields are filled in as the order
/// moves through the workflow; `processed_by` and `processed_at` name
/// the human who finalized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub buyer_id: SubjectId,
    pub status: OrderStatus,
    /// Channel the reservation was made from; completion and rejection
    /// notices go back here.
    pub channel_id: ChannelId,
    pub created_at: DateTime<Utc>,
    /// External payment link submitted by the buyer, if any.
    pub payment_proof: Option<String>,
    pub processed_by: Option<SubjectId>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a fresh pending reservation.
    pub fn new(
        id: OrderId,
        product_id: ProductId,
        buyer_id: SubjectId,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            id,
            product_id,
            buyer_id,
            status: OrderStatus::PendingPayment,
            channel_id,
            created_at: Utc::now(),
            payment_proof: None,
            processed_by: None,
            processed_at: None,
        }
    }

    /// Marks the order completed by the given approver.
    pub fn finalize_completed(&mut self, approver: SubjectId) {
        self.status = OrderStatus::Completed;
        self.processed_by = Some(approver);
        self.processed_at = Some(Utc::now());
    }

    /// Marks the order cancelled by the given rejecter.
    pub fn finalize_cancelled(&mut self, rejecter: SubjectId) {
        self.status = OrderStatus::Cancelled;
        self.processed_by = Some(rejecter);
        self.processed_at = Some(Utc::now());
    }

    /// Reverts a completion whose delivery failed, back to pending.
    pub fn revert_to_pending(&mut self) {
        self.status = OrderStatus::PendingPayment;
        self.processed_by = None;
        self.processed_at = None;
    }
}
