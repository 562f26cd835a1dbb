//! Manual-settlement vending workflow.
//!
//! A buyer reserves a product, submits an external payment proof, and a
//! human approves or rejects the order. Approval debits exactly one
//! inventory item (FIFO) and delivers it to the buyer; if delivery
//! fails the debit is compensated and the order returns to pending.
//!
//! Reservation never touches stock — an abandoned reservation must not
//! starve inventory. The debit at approval time is the single
//! serialization point two concurrent purchases can race on.

pub mod catalog;
pub mod error;
pub mod notify;
pub mod order;
pub mod status;
pub mod store;
pub mod workflow;

pub use catalog::{FulfillmentPayload, Product, ProductSummary};
pub use error::ShopError;
pub use notify::{Notifier, NotifyError, RecordingNotifier};
pub use order::Order;
pub use status::OrderStatus;
pub use store::{CommunityShop, ShopStore};
pub use workflow::{OrderWorkflow, PAYMENT_LINK_PREFIX};
