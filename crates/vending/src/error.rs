use common::{OrderId, ProductId};
use thiserror::Error;

use crate::notify::NotifyError;
use crate::status::OrderStatus;

/// Errors raised by the vending workflow.
#[derive(Debug, Error)]
pub enum ShopError {
    /// The product ID does not exist in this community's catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// No inventory item is available for the product.
    #[error("product out of stock: {0}")]
    OutOfStock(ProductId),

    /// The order ID does not exist in this community.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order already reached a terminal state; no further
    /// approval or rejection is possible.
    #[error("order {order_id} already finalized as {status}")]
    AlreadyFinalized {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The debited item could not be delivered; the debit was rolled
    /// back and the order returned to pending.
    #[error("delivery failed for order {order_id}: {source}")]
    DeliveryFailed {
        order_id: OrderId,
        #[source]
        source: NotifyError,
    },

    /// Product IDs may only contain ASCII alphanumerics and underscores.
    #[error("malformed product id: {0:?}")]
    InvalidProductId(String),

    /// Prices must be strictly positive.
    #[error("price must be positive")]
    InvalidPrice,

    /// The submitted payment proof is not an accepted payment link.
    #[error("payment proof is not a recognized payment link")]
    InvalidPaymentProof,

    /// The channel is already registered for admin notifications.
    #[error("channel already registered for admin notifications")]
    DuplicateAdminChannel,
}
