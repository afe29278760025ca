use std::fmt::Debug;

use log::*;
use sok_common::Cents;

use crate::{
    api::{
        errors::OrderFlowError,
        order_objects::{NewOrderRequest, OrderQueryFilter, OrderResult},
    },
    db::traits::{MarketplaceDatabase, MarketplaceError},
    db_types::{EscrowTransaction, ListingType, NewOrder, Order, OrderId},
    events::{EventProducers, OrderPaidEvent},
    helpers::new_order_id,
};

/// Flat shipping rate applied when the storefront did not supply an external
/// quote.
const DEFAULT_SHIPPING_COST: i64 = 5_00;

/// `OrderFlowApi` is the primary API for creating orders and reacting to
/// payment collaborator events.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Validates and creates a new order at checkout.
    ///
    /// Pricing is authoritative here: the unit price is the listing price, or
    /// the current highest bid for auction listings, regardless of anything
    /// the client believes it saw. The order is persisted in `Pending` status
    /// with `Unpaid` payment status; payment capture is a separate step driven
    /// by the payment collaborator (see [`Self::payment_captured`]).
    pub async fn create_order(&self, req: NewOrderRequest) -> Result<Order, OrderFlowError> {
        if req.quantity < 1 {
            return Err(OrderFlowError::InvalidQuantity(req.quantity));
        }
        let listing = self
            .db
            .fetch_listing(req.listing_id)
            .await?
            .filter(|l| l.active)
            .ok_or(OrderFlowError::ProductUnavailable(req.listing_id))?;
        if listing.seller_id == req.buyer_id {
            return Err(OrderFlowError::SelfPurchaseDenied);
        }
        let unit_price = match listing.listing_type {
            ListingType::FixedPrice => listing.price,
            // An auction with no bids falls back to the reserve price.
            ListingType::Auction => self.db.highest_bid(req.listing_id).await?.unwrap_or(listing.price),
        };
        let shipping_cost = req.shipping_cost.unwrap_or_else(|| Cents::from(DEFAULT_SHIPPING_COST));
        let order = NewOrder {
            order_id: OrderId::from(new_order_id()),
            buyer_id: req.buyer_id,
            seller_id: listing.seller_id,
            listing_id: listing.id,
            quantity: req.quantity,
            unit_price,
            shipping_cost,
            payment_method: req.payment_method,
            ship_to: req.ship_to,
        };
        let (order, inserted) = self.db.insert_order(order).await?;
        if !inserted {
            // Freshly minted ids never collide in practice; treat it as fatal.
            return Err(OrderFlowError::Backend(MarketplaceError::OrderAlreadyExists(order.order_id)));
        }
        debug!(
            "🔄️📦️ Order {} created: {} × listing #{} for buyer {} ({} total)",
            order.order_id, order.quantity, order.listing_id, order.buyer_id, order.total_amount
        );
        Ok(order)
    }

    /// Handles a `paymentCaptured` notification from the payment collaborator.
    ///
    /// Marks the order paid and confirmed and places the captured amount in
    /// escrow, atomically. A duplicate notification fails with
    /// `EscrowAlreadyExists` rather than holding funds twice.
    pub async fn payment_captured(
        &self,
        order_id: &OrderId,
        amount: Cents,
    ) -> Result<(Order, EscrowTransaction), OrderFlowError> {
        let (order, escrow) = self.db.mark_order_paid(order_id, amount).await?;
        debug!("🔄️💰️ Payment of {amount} captured for order {order_id}. Escrow is held.");
        self.call_order_paid_hook(&order, &escrow).await;
        Ok((order, escrow))
    }

    /// Handles a `paymentFailed` notification. The order stays `Pending` and
    /// `Unpaid`; whether to retry payment or cancel is the caller's decision.
    pub async fn payment_failed(&self, order_id: &OrderId, reason: &str) -> Result<Order, OrderFlowError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        warn!("🔄️💰️ Payment for order {order_id} failed: {reason}. Order remains {}.", order.status);
        Ok(order)
    }

    /// Cancels an order. Only `Pending` and `Confirmed` orders can cancel; a
    /// confirmed cancellation refunds the held escrow in the same transaction.
    pub async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self.db.cancel_order(order_id).await?;
        debug!("🔄️❌️ Order {order_id} cancelled");
        Ok(order)
    }

    /// Fetches an order with its escrow transaction, if funds were captured.
    pub async fn order_with_escrow(&self, order_id: &OrderId) -> Result<Option<OrderResult>, OrderFlowError> {
        let order = match self.db.fetch_order_by_order_id(order_id).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let escrow = self.db.fetch_escrow_for_order(order_id).await?;
        Ok(Some(OrderResult { order, escrow }))
    }

    /// Fetches orders matching the given filter.
    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️📦️ Order search: {query}");
        Ok(self.db.fetch_orders(query).await?)
    }

    async fn call_order_paid_hook(&self, order: &Order, escrow: &EscrowTransaction) {
        for emitter in &self.producers.order_paid_producer {
            let event = OrderPaidEvent::new(order.clone(), escrow.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
