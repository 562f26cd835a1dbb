//! Per-community shop state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use common::{ChannelId, CommunityId, OrderId, ProductId};
use tokio::sync::RwLock;

use crate::catalog::Product;
use crate::order::Order;

/// Everything one community's shop owns: catalog, orders, and the
/// channels its notifications fan out to.
///
/// `admin_channels` is ordered so payment-proof fan-out hits channels
/// in a stable sequence.
#[derive(Debug)]
pub struct CommunityShop {
    pub products: HashMap<ProductId, Product>,
    pub orders: HashMap<OrderId, Order>,
    pub admin_channels: BTreeSet<ChannelId>,
    pub achievement_channel: Option<ChannelId>,
    next_order_id: OrderId,
}

impl Default for CommunityShop {
    fn default() -> Self {
        Self {
            products: HashMap::new(),
            orders: HashMap::new(),
            admin_channels: BTreeSet::new(),
            achievement_channel: None,
            next_order_id: OrderId::new(0),
        }
    }
}

impl CommunityShop {
    /// Allocates the next order number for this community.
    pub fn allocate_order_id(&mut self) -> OrderId {
        self.next_order_id = self.next_order_id.next();
        self.next_order_id
    }
}

/// Shared, concurrency-safe map of community shops.
///
/// A community's shop is created lazily the first time anything
/// touches it. Single lock around the whole map: shop operations are
/// short and never await while holding it.
#[derive(Debug, Clone, Default)]
pub struct ShopStore {
    inner: Arc<RwLock<HashMap<CommunityId, CommunityShop>>>,
}

impl ShopStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a closure with read access to a community's shop.
    ///
    /// Returns None if the community has no shop yet.
    pub async fn with<R>(
        &self,
        community_id: CommunityId,
        f: impl FnOnce(&CommunityShop) -> R,
    ) -> Option<R> {
        let shops = self.inner.read().await;
        shops.get(&community_id).map(f)
    }

    /// Runs a closure with exclusive access to a community's shop,
    /// creating it on first use.
    pub async fn with_mut<R>(
        &self,
        community_id: CommunityId,
        f: impl FnOnce(&mut CommunityShop) -> R,
    ) -> R {
        let mut shops = self.inner.write().await;
        f(shops.entry(community_id).or_default())
    }

    /// Drops a community's entire shop state.
    pub async fn remove_community(&self, community_id: CommunityId) {
        self.inner.write().await.remove(&community_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    #[test]
    fn order_ids_start_at_one_and_increment() {
        let mut shop = CommunityShop::default();
        assert_eq!(shop.allocate_order_id(), OrderId::new(1));
        assert_eq!(shop.allocate_order_id(), OrderId::new(2));
    }

    #[tokio::test]
    async fn shops_are_created_on_first_use() {
        let store = ShopStore::new();
        let community = CommunityId::new(5);

        assert!(store.with(community, |_| ()).await.is_none());

        store
            .with_mut(community, |shop| {
                shop.products.insert(
                    ProductId::new("sticker"),
                    Product::new("sticker", "Sticker", Money::from_minor(500), "", vec![]),
                );
            })
            .await;

        let count = store.with(community, |shop| shop.products.len()).await;
        assert_eq!(count, Some(1));
    }

    #[tokio::test]
    async fn communities_are_isolated() {
        let store = ShopStore::new();
        store
            .with_mut(CommunityId::new(1), |shop| {
                shop.admin_channels.insert(ChannelId::new(10));
            })
            .await;

        assert!(store.with(CommunityId::new(2), |_| ()).await.is_none());

        store.remove_community(CommunityId::new(1)).await;
        assert!(store.with(CommunityId::new(1), |_| ()).await.is_none());
    }
}
