use std::fmt::Debug;

use log::*;

use crate::{
    api::errors::DisputeApiError,
    db::traits::{DisputeManagement, MarketplaceError, OrderManagement},
    db_types::{Dispute, DisputeOutcome, EscrowTransaction, OrderId},
    events::{DisputeOpenedEvent, EventProducers},
};

/// `DisputeApi` lets a buyer contest an order and an admin adjudicate it.
/// An unresolved dispute is the sole mechanism that blocks escrow release.
pub struct DisputeApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DisputeApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisputeApi")
    }
}

impl<B> DisputeApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DisputeApi<B>
where B: DisputeManagement + OrderManagement
{
    /// Opens a dispute against an order. Only the order's buyer may do so, and
    /// at most one open or in-progress dispute can exist per order.
    pub async fn open_dispute(
        &self,
        order_id: &OrderId,
        caller_id: &str,
        reason: &str,
    ) -> Result<Dispute, DisputeApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await
            .map_err(DisputeApiError::OrderBackend)?
            .ok_or_else(|| DisputeApiError::OrderBackend(MarketplaceError::OrderNotFound(order_id.clone())))?;
        if order.buyer_id != caller_id {
            warn!("⚖️ {caller_id} tried to dispute order {order_id}, which belongs to {}", order.buyer_id);
            return Err(DisputeApiError::NotBuyer);
        }
        let dispute = self.db.insert_dispute(order_id, caller_id, reason).await?;
        info!("⚖️ Dispute #{} opened against order {order_id}. Escrow release is now blocked.", dispute.id);
        self.call_dispute_opened_hook(&dispute).await;
        Ok(dispute)
    }

    /// An admin takes the case for review.
    pub async fn begin_review(&self, dispute_id: i64) -> Result<Dispute, DisputeApiError> {
        Ok(self.db.begin_dispute_review(dispute_id).await?)
    }

    /// An admin adjudicates the dispute. `Refund` returns the held funds to
    /// the buyer; `Release` pays the seller, bypassing the buyer-confirmation
    /// gate — the explicit admin override path distinct from
    /// `confirm_delivery`. Authorization is the caller's concern: the serving
    /// layer must ensure only admins reach this method.
    pub async fn resolve_dispute(
        &self,
        dispute_id: i64,
        outcome: DisputeOutcome,
    ) -> Result<(Dispute, EscrowTransaction), DisputeApiError> {
        let (dispute, escrow) = self.db.resolve_dispute(dispute_id, outcome).await?;
        info!("⚖️ Dispute #{dispute_id} resolved with outcome {outcome}. Escrow is now {}.", escrow.status);
        Ok((dispute, escrow))
    }

    /// Fetches a dispute by id.
    pub async fn dispute_by_id(&self, dispute_id: i64) -> Result<Option<Dispute>, DisputeApiError> {
        Ok(self.db.fetch_dispute(dispute_id).await?)
    }

    /// The dispute currently blocking escrow release for an order, if any.
    pub async fn blocking_dispute(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeApiError> {
        Ok(self.db.fetch_blocking_dispute(order_id).await?)
    }

    async fn call_dispute_opened_hook(&self, dispute: &Dispute) {
        for emitter in &self.producers.dispute_opened_producer {
            let event = DisputeOpenedEvent::new(dispute.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
