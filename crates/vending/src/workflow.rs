//! Order workflow: reservation, payment proof, approval, rejection.

use common::{ChannelId, CommunityId, Money, OrderId, ProductId, SubjectId};

use crate::catalog::{FulfillmentPayload, Product, ProductSummary};
use crate::error::ShopError;
use crate::notify::Notifier;
use crate::order::Order;
use crate::store::ShopStore;

/// Accepted prefix for submitted payment links. Cosmetic validation
/// only; the human approver verifies the actual payment.
pub const PAYMENT_LINK_PREFIX: &str = "https://paypay.ne.jp/";

/// Drives orders through the manual-settlement state machine.
///
/// All state transitions happen under a single lock acquisition so an
/// approve's debit and completion are atomic with respect to other
/// approves. Notification sends always run outside the lock.
pub struct OrderWorkflow<N> {
    store: ShopStore,
    notifier: N,
}

impl<N: Notifier> OrderWorkflow<N> {
    /// Creates a workflow over the given store and notifier.
    pub fn new(store: ShopStore, notifier: N) -> Self {
        Self { store, notifier }
    }

    /// Returns the underlying shop store.
    pub fn store(&self) -> &ShopStore {
        &self.store
    }

    /// Returns the notifier the workflow sends through.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Reserves a product for a buyer, creating a pending order.
    ///
    /// Stock is untouched: an abandoned reservation never starves
    /// inventory. On NotFound/OutOfStock no order ID is allocated.
    #[tracing::instrument(skip(self), fields(community = %community_id, product = %product_id))]
    pub async fn create_reservation(
        &self,
        community_id: CommunityId,
        product_id: ProductId,
        buyer_id: SubjectId,
        channel_id: ChannelId,
    ) -> Result<Order, ShopError> {
        let order = self
            .store
            .with_mut(community_id, |shop| {
                let product = shop
                    .products
                    .get(&product_id)
                    .ok_or_else(|| ShopError::ProductNotFound(product_id.clone()))?;
                if !product.in_stock() {
                    return Err(ShopError::OutOfStock(product_id.clone()));
                }

                let id = shop.allocate_order_id();
                let order = Order::new(id, product_id.clone(), buyer_id, channel_id);
                shop.orders.insert(id, order.clone());
                Ok(order)
            })
            .await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order = %order.id, "reservation created");
        Ok(order)
    }

    /// Attaches a payment link to a pending order and alerts every
    /// registered admin channel.
    ///
    /// Fan-out is best-effort: one unreachable channel never blocks
    /// the others or fails the submission.
    #[tracing::instrument(skip(self, proof), fields(community = %community_id, order = %order_id))]
    pub async fn submit_payment_proof(
        &self,
        community_id: CommunityId,
        order_id: OrderId,
        proof: &str,
    ) -> Result<(), ShopError> {
        if !proof.starts_with(PAYMENT_LINK_PREFIX) {
            return Err(ShopError::InvalidPaymentProof);
        }

        let (summary, admin_channels) = self
            .store
            .with_mut(community_id, |shop| {
                let order = shop
                    .orders
                    .get_mut(&order_id)
                    .ok_or(ShopError::OrderNotFound(order_id))?;
                if order.status.is_terminal() {
                    return Err(ShopError::AlreadyFinalized {
                        order_id,
                        status: order.status,
                    });
                }
                order.payment_proof = Some(proof.to_string());
                let summary = format!(
                    "Payment submitted for order {} (product {}, buyer {}): {}",
                    order.id, order.product_id, order.buyer_id, proof
                );
                let channels: Vec<ChannelId> = shop.admin_channels.iter().copied().collect();
                Ok((summary, channels))
            })
            .await?;

        for channel in admin_channels {
            if let Err(e) = self.notifier.notify_channel(channel, &summary).await {
                tracing::warn!(channel = %channel, error = %e, "admin notification skipped");
            }
        }
        Ok(())
    }

    /// Approves a pending order: debits one inventory item, completes
    /// the order, and delivers the item to the buyer.
    ///
    /// Approval is not final until delivery is confirmed sent: a
    /// failed buyer send credits the item back and reverts the order
    /// to pending so it can be approved again.
    #[tracing::instrument(skip(self), fields(community = %community_id, order = %order_id))]
    pub async fn approve(
        &self,
        community_id: CommunityId,
        order_id: OrderId,
        approver_id: SubjectId,
    ) -> Result<FulfillmentPayload, ShopError> {
        let (payload, buyer_id, product_id, display_name, order_channel, achievement_channel) =
            self.store
                .with_mut(community_id, |shop| {
                    let order = shop
                        .orders
                        .get(&order_id)
                        .ok_or(ShopError::OrderNotFound(order_id))?;
                    if !order.status.can_approve() {
                        return Err(ShopError::AlreadyFinalized {
                            order_id,
                            status: order.status,
                        });
                    }
                    let product_id = order.product_id.clone();
                    let buyer_id = order.buyer_id;
                    let order_channel = order.channel_id;

                    let product = shop
                        .products
                        .get_mut(&product_id)
                        .ok_or_else(|| ShopError::ProductNotFound(product_id.clone()))?;
                    let payload = product
                        .debit_one()
                        .ok_or_else(|| ShopError::OutOfStock(product_id.clone()))?;
                    let display_name = product.display_name.clone();

                    // Still under the same lock, so the order is present.
                    if let Some(order) = shop.orders.get_mut(&order_id) {
                        order.finalize_completed(approver_id);
                    }

                    Ok((
                        payload,
                        buyer_id,
                        product_id,
                        display_name,
                        order_channel,
                        shop.achievement_channel,
                    ))
                })
                .await?;

        let delivery = format!("Your order {order_id} ({display_name}) is ready: {payload}");
        if let Err(source) = self.notifier.notify_buyer(buyer_id, &delivery).await {
            self.store
                .with_mut(community_id, |shop| {
                    if let Some(product) = shop.products.get_mut(&product_id) {
                        product.credit_back(payload);
                    }
                    if let Some(order) = shop.orders.get_mut(&order_id) {
                        order.revert_to_pending();
                    }
                })
                .await;
            metrics::counter!("order_rollbacks_total").increment(1);
            tracing::warn!(error = %source, "delivery failed, debit rolled back");
            return Err(ShopError::DeliveryFailed { order_id, source });
        }

        let notice = format!("Order {order_id} completed.");
        if let Err(e) = self.notifier.notify_channel(order_channel, &notice).await {
            tracing::warn!(channel = %order_channel, error = %e, "completion notice skipped");
        }
        if let Some(channel) = achievement_channel {
            let broadcast = format!("{display_name} was just purchased! (order {order_id})");
            if let Err(e) = self.notifier.notify_channel(channel, &broadcast).await {
                tracing::warn!(channel = %channel, error = %e, "achievement broadcast skipped");
            }
        }

        metrics::counter!("orders_approved_total").increment(1);
        tracing::info!(buyer = %buyer_id, "order approved and delivered");
        Ok(payload)
    }

    /// Rejects a pending order. No inventory change, since reservation
    /// never debited. The buyer is told best-effort.
    #[tracing::instrument(skip(self), fields(community = %community_id, order = %order_id))]
    pub async fn reject(
        &self,
        community_id: CommunityId,
        order_id: OrderId,
        rejecter_id: SubjectId,
    ) -> Result<(), ShopError> {
        let buyer_id = self
            .store
            .with_mut(community_id, |shop| {
                let order = shop
                    .orders
                    .get_mut(&order_id)
                    .ok_or(ShopError::OrderNotFound(order_id))?;
                if !order.status.can_reject() {
                    return Err(ShopError::AlreadyFinalized {
                        order_id,
                        status: order.status,
                    });
                }
                order.finalize_cancelled(rejecter_id);
                Ok(order.buyer_id)
            })
            .await?;

        let notice = format!("Your order {order_id} was rejected.");
        if let Err(e) = self.notifier.notify_buyer(buyer_id, &notice).await {
            tracing::warn!(buyer = %buyer_id, error = %e, "rejection notice skipped");
        }

        metrics::counter!("orders_rejected_total").increment(1);
        Ok(())
    }

    /// Adds a product to a community's catalog, seeded with inventory.
    pub async fn add_product(
        &self,
        community_id: CommunityId,
        product_id: ProductId,
        display_name: &str,
        unit_price: Money,
        description: &str,
        items: Vec<FulfillmentPayload>,
    ) -> Result<(), ShopError> {
        if !product_id.is_well_formed() {
            return Err(ShopError::InvalidProductId(product_id.as_str().to_string()));
        }
        if !unit_price.is_positive() {
            return Err(ShopError::InvalidPrice);
        }

        let product = Product::new(
            product_id.clone(),
            display_name,
            unit_price,
            description,
            items,
        );
        self.store
            .with_mut(community_id, |shop| {
                shop.products.insert(product_id, product);
            })
            .await;
        Ok(())
    }

    /// Appends one inventory item to an existing product.
    pub async fn restock(
        &self,
        community_id: CommunityId,
        product_id: ProductId,
        payload: FulfillmentPayload,
    ) -> Result<usize, ShopError> {
        self.store
            .with_mut(community_id, |shop| {
                let product = shop
                    .products
                    .get_mut(&product_id)
                    .ok_or_else(|| ShopError::ProductNotFound(product_id.clone()))?;
                product.restock(payload);
                Ok(product.stock())
            })
            .await
    }

    /// Registers a channel for payment-proof notifications.
    pub async fn register_admin_channel(
        &self,
        community_id: CommunityId,
        channel_id: ChannelId,
    ) -> Result<(), ShopError> {
        self.store
            .with_mut(community_id, |shop| {
                if !shop.admin_channels.insert(channel_id) {
                    return Err(ShopError::DuplicateAdminChannel);
                }
                Ok(())
            })
            .await
    }

    /// Sets (or replaces) the purchase-broadcast channel.
    pub async fn set_achievement_channel(&self, community_id: CommunityId, channel_id: ChannelId) {
        self.store
            .with_mut(community_id, |shop| {
                shop.achievement_channel = Some(channel_id);
            })
            .await;
    }

    /// Lists the community's catalog for panel rendering.
    pub async fn catalog(&self, community_id: CommunityId) -> Vec<ProductSummary> {
        self.store
            .with(community_id, |shop| {
                let mut summaries: Vec<ProductSummary> =
                    shop.products.values().map(ProductSummary::from).collect();
                summaries.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
                summaries
            })
            .await
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::status::OrderStatus;

    const COMMUNITY: CommunityId = CommunityId::new(100);
    const BUYER: SubjectId = SubjectId::new(42);
    const ADMIN: SubjectId = SubjectId::new(900);
    const SHOP_CHANNEL: ChannelId = ChannelId::new(7);

    async fn workflow_with_sticker() -> OrderWorkflow<RecordingNotifier> {
        let workflow = OrderWorkflow::new(ShopStore::new(), RecordingNotifier::new());
        workflow
            .add_product(
                COMMUNITY,
                ProductId::new("sticker"),
                "Sticker",
                Money::from_minor(500),
                "A nice sticker",
                vec!["code-A".into(), "code-B".into()],
            )
            .await
            .unwrap();
        workflow
    }

    async fn stock_of(workflow: &OrderWorkflow<RecordingNotifier>, id: &str) -> usize {
        workflow
            .store()
            .with(COMMUNITY, |shop| {
                shop.products[&ProductId::new(id)].stock()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reservation_leaves_stock_untouched() {
        let workflow = workflow_with_sticker().await;

        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();

        assert_eq!(order.id, OrderId::new(1));
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(stock_of(&workflow, "sticker").await, 2);
    }

    #[tokio::test]
    async fn failed_reservation_allocates_no_order_id() {
        let workflow = workflow_with_sticker().await;

        let err = workflow
            .create_reservation(COMMUNITY, ProductId::new("missing"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(_)));

        // Next successful reservation still gets #1.
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();
        assert_eq!(order.id, OrderId::new(1));
    }

    #[tokio::test]
    async fn out_of_stock_blocks_reservation() {
        let workflow = OrderWorkflow::new(ShopStore::new(), RecordingNotifier::new());
        workflow
            .add_product(
                COMMUNITY,
                ProductId::new("empty"),
                "Empty",
                Money::from_minor(100),
                "",
                vec![],
            )
            .await
            .unwrap();

        let err = workflow
            .create_reservation(COMMUNITY, ProductId::new("empty"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::OutOfStock(_)));
    }

    #[tokio::test]
    async fn approve_debits_delivers_and_completes() {
        let workflow = workflow_with_sticker().await;
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();

        let payload = workflow.approve(COMMUNITY, order.id, ADMIN).await.unwrap();

        assert_eq!(payload.as_str(), "code-A");
        assert_eq!(stock_of(&workflow, "sticker").await, 1);

        let status = workflow
            .store()
            .with(COMMUNITY, |shop| shop.orders[&order.id].status)
            .await
            .unwrap();
        assert_eq!(status, OrderStatus::Completed);

        let buyer_messages = workflow.notifier.buyer_messages().await;
        assert_eq!(buyer_messages.len(), 1);
        assert!(buyer_messages[0].1.contains("code-A"));
    }

    #[tokio::test]
    async fn approve_twice_reports_already_finalized_without_double_debit() {
        let workflow = workflow_with_sticker().await;
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();
        workflow.approve(COMMUNITY, order.id, ADMIN).await.unwrap();

        let err = workflow
            .approve(COMMUNITY, order.id, ADMIN)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ShopError::AlreadyFinalized {
                status: OrderStatus::Completed,
                ..
            }
        ));
        assert_eq!(stock_of(&workflow, "sticker").await, 1);
        assert_eq!(workflow.notifier.buyer_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn delivery_failure_rolls_back_debit_and_status() {
        let workflow = workflow_with_sticker().await;
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();
        workflow.notifier.set_fail_buyers(true).await;

        let err = workflow
            .approve(COMMUNITY, order.id, ADMIN)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::DeliveryFailed { .. }));

        // Inventory restored in original FIFO order, order pending again.
        let items = workflow
            .store()
            .with(COMMUNITY, |shop| {
                shop.products[&ProductId::new("sticker")].items()
            })
            .await
            .unwrap();
        assert_eq!(
            items,
            vec![
                FulfillmentPayload::new("code-A"),
                FulfillmentPayload::new("code-B")
            ]
        );
        let status = workflow
            .store()
            .with(COMMUNITY, |shop| shop.orders[&order.id].status)
            .await
            .unwrap();
        assert_eq!(status, OrderStatus::PendingPayment);

        // A later approve succeeds and delivers the same head item.
        workflow.notifier.set_fail_buyers(false).await;
        let payload = workflow.approve(COMMUNITY, order.id, ADMIN).await.unwrap();
        assert_eq!(payload.as_str(), "code-A");
    }

    #[tokio::test]
    async fn reject_cancels_without_touching_stock() {
        let workflow = workflow_with_sticker().await;
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();

        workflow.reject(COMMUNITY, order.id, ADMIN).await.unwrap();

        assert_eq!(stock_of(&workflow, "sticker").await, 2);
        let err = workflow
            .reject(COMMUNITY, order.id, ADMIN)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShopError::AlreadyFinalized {
                status: OrderStatus::Cancelled,
                ..
            }
        ));
        // The buyer heard about the rejection once.
        assert_eq!(workflow.notifier.buyer_messages().await.len(), 1);
    }

    #[tokio::test]
    async fn payment_proof_requires_known_prefix() {
        let workflow = workflow_with_sticker().await;
        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();

        let err = workflow
            .submit_payment_proof(COMMUNITY, order.id, "https://evil.example/pay")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidPaymentProof));

        workflow
            .submit_payment_proof(COMMUNITY, order.id, "https://paypay.ne.jp/abc123")
            .await
            .unwrap();
        let proof = workflow
            .store()
            .with(COMMUNITY, |shop| shop.orders[&order.id].payment_proof.clone())
            .await
            .unwrap();
        assert_eq!(proof.as_deref(), Some("https://paypay.ne.jp/abc123"));
    }

    #[tokio::test]
    async fn admin_fan_out_survives_one_unreachable_channel() {
        let workflow = workflow_with_sticker().await;
        workflow
            .register_admin_channel(COMMUNITY, ChannelId::new(10))
            .await
            .unwrap();
        workflow
            .register_admin_channel(COMMUNITY, ChannelId::new(11))
            .await
            .unwrap();
        workflow.notifier.fail_channel(ChannelId::new(10)).await;

        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();
        workflow
            .submit_payment_proof(COMMUNITY, order.id, "https://paypay.ne.jp/abc")
            .await
            .unwrap();

        let messages = workflow.notifier.channel_messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, ChannelId::new(11));
    }

    #[tokio::test]
    async fn achievement_broadcast_goes_out_on_approval() {
        let workflow = workflow_with_sticker().await;
        workflow
            .set_achievement_channel(COMMUNITY, ChannelId::new(30))
            .await;

        let order = workflow
            .create_reservation(COMMUNITY, ProductId::new("sticker"), BUYER, SHOP_CHANNEL)
            .await
            .unwrap();
        workflow.approve(COMMUNITY, order.id, ADMIN).await.unwrap();

        let messages = workflow.notifier.channel_messages().await;
        let broadcast = messages
            .iter()
            .find(|(channel, _)| *channel == ChannelId::new(30))
            .expect("achievement broadcast");
        assert!(broadcast.1.contains("Sticker"));
    }

    #[tokio::test]
    async fn catalog_management_validates_input() {
        let workflow = OrderWorkflow::new(ShopStore::new(), RecordingNotifier::new());

        let err = workflow
            .add_product(
                COMMUNITY,
                ProductId::new("bad id"),
                "Bad",
                Money::from_minor(100),
                "",
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidProductId(_)));

        let err = workflow
            .add_product(
                COMMUNITY,
                ProductId::new("freebie"),
                "Freebie",
                Money::zero(),
                "",
                vec![],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidPrice));

        workflow
            .register_admin_channel(COMMUNITY, ChannelId::new(10))
            .await
            .unwrap();
        let err = workflow
            .register_admin_channel(COMMUNITY, ChannelId::new(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::DuplicateAdminChannel));
    }

    #[tokio::test]
    async fn catalog_lists_products_with_derived_stock() {
        let workflow = workflow_with_sticker().await;
        workflow
            .add_product(
                COMMUNITY,
                ProductId::new("badge"),
                "Badge",
                Money::from_minor(1200),
                "",
                vec!["badge-1".into()],
            )
            .await
            .unwrap();

        let listing = workflow.catalog(COMMUNITY).await;
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, ProductId::new("badge"));
        assert_eq!(listing[0].stock, 1);
        assert_eq!(listing[1].id, ProductId::new("sticker"));
        assert_eq!(listing[1].stock, 2);

        // Unknown community renders an empty catalog.
        assert!(workflow.catalog(CommunityId::new(999)).await.is_empty());
    }
}
