use std::fmt::Debug;

use log::*;
use sok_common::Cents;

use crate::{
    api::errors::EscrowApiError,
    db::traits::{MarketplaceDatabase, MarketplaceError},
    db_types::{EscrowTransaction, Order, OrderId},
    events::{EscrowReleasedEvent, EventProducers},
};

/// `EscrowApi` owns the money side of an order: holding captured funds,
/// releasing them to the seller, and returning them to the buyer. Sellers are
/// paid only after buyer-confirmed delivery or an admin-adjudicated dispute.
pub struct EscrowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for EscrowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EscrowApi")
    }
}

impl<B> EscrowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> EscrowApi<B>
where B: MarketplaceDatabase
{
    /// Places captured funds in escrow against an order. This is the same
    /// transition the payment webhook drives via
    /// [`OrderFlowApi::payment_captured`](crate::OrderFlowApi::payment_captured);
    /// it exists here for callers integrating a payment collaborator
    /// programmatically. Calling it twice for the same order is a
    /// deterministic [`MarketplaceError::EscrowAlreadyExists`] error.
    pub async fn hold_funds(
        &self,
        order_id: &OrderId,
        amount: Cents,
    ) -> Result<(Order, EscrowTransaction), EscrowApiError> {
        let (order, escrow) = self.db.mark_order_paid(order_id, amount).await?;
        debug!("🔐️ {amount} held in escrow for order {order_id}");
        Ok((order, escrow))
    }

    /// The buyer confirms receipt of the goods, releasing escrow to the
    /// seller.
    ///
    /// Checks run in this documented order:
    /// 1. the order exists,
    /// 2. the caller is the order's buyer (`NotBuyer`),
    /// 3. no open or in-progress dispute blocks release (`DisputeOpen`),
    /// 4. the order is `Delivered` (`OrderNotDelivered`),
    /// 5. the escrow row is still `Held` — the conditional update that makes
    ///    a repeated or racing confirmation fail with `EscrowNotHeld` instead
    ///    of double-releasing.
    pub async fn confirm_delivery(
        &self,
        order_id: &OrderId,
        caller_id: &str,
    ) -> Result<EscrowTransaction, EscrowApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if order.buyer_id != caller_id {
            warn!("🔐️ {caller_id} tried to confirm delivery of order {order_id}, which belongs to {}", order.buyer_id);
            return Err(EscrowApiError::NotBuyer);
        }
        let escrow = self.db.release_escrow(order_id).await?;
        info!("🔐️ Buyer confirmed delivery of order {order_id}. Escrow #{} released.", escrow.id);
        self.call_escrow_released_hook(&escrow).await;
        Ok(escrow)
    }

    /// Returns held funds to the buyer. Invoked by the dispute handler on a
    /// refund resolution, and by the cancellation flow for confirmed orders.
    pub async fn refund(&self, order_id: &OrderId) -> Result<EscrowTransaction, EscrowApiError> {
        let escrow = self.db.refund_escrow(order_id).await?;
        info!("🔐️ Escrow #{} for order {order_id} refunded to the buyer", escrow.id);
        Ok(escrow)
    }

    /// The current escrow transaction for an order, if any.
    pub async fn escrow_for_order(&self, order_id: &OrderId) -> Result<Option<EscrowTransaction>, EscrowApiError> {
        Ok(self.db.fetch_escrow_for_order(order_id).await?)
    }

    async fn call_escrow_released_hook(&self, escrow: &EscrowTransaction) {
        for emitter in &self.producers.escrow_released_producer {
            let event = EscrowReleasedEvent::new(escrow.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
