//! Products and their discrete inventory.

use std::collections::VecDeque;

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// Opaque content delivered to a buyer for one sold item (a key, a
/// code, an invite — the workflow never interprets it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FulfillmentPayload(String);

impl FulfillmentPayload {
    /// Creates a payload from its delivered content.
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    /// Returns the delivered content.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FulfillmentPayload {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for FulfillmentPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sellable product with its discrete inventory items.
///
/// Stock is always `inventory.len()` — there is no separately tracked
/// counter to drift out of sync with the real list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub display_name: String,
    pub unit_price: Money,
    pub description: String,
    inventory: VecDeque<FulfillmentPayload>,
}

impl Product {
    /// Creates a product seeded with the given inventory items, in
    /// sale order.
    pub fn new(
        id: impl Into<ProductId>,
        display_name: impl Into<String>,
        unit_price: Money,
        description: impl Into<String>,
        items: Vec<FulfillmentPayload>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            unit_price,
            description: description.into(),
            inventory: items.into(),
        }
    }

    /// Returns the number of items available for sale.
    pub fn stock(&self) -> usize {
        self.inventory.len()
    }

    /// Returns true if at least one item is available.
    pub fn in_stock(&self) -> bool {
        !self.inventory.is_empty()
    }

    /// Removes and returns the oldest inventory item (FIFO).
    ///
    /// The only operation that decreases stock.
    pub fn debit_one(&mut self) -> Option<FulfillmentPayload> {
        self.inventory.pop_front()
    }

    /// Reinserts a debited item at the head, undoing a debit so the
    /// next sale attempt sees the original FIFO order. Rollback only.
    pub fn credit_back(&mut self, payload: FulfillmentPayload) {
        self.inventory.push_front(payload);
    }

    /// Appends a new item to the tail of the inventory.
    pub fn restock(&mut self, payload: FulfillmentPayload) {
        self.inventory.push_back(payload);
    }

    /// Returns the current inventory sequence, head first.
    pub fn items(&self) -> Vec<FulfillmentPayload> {
        self.inventory.iter().cloned().collect()
    }
}

/// Inventory-free view of a product for catalog rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub display_name: String,
    pub unit_price: Money,
    pub description: String,
    pub stock: usize,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            display_name: product.display_name.clone(),
            unit_price: product.unit_price,
            description: product.description.clone(),
            stock: product.stock(),
        }
    }
}
