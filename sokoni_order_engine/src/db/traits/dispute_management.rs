use thiserror::Error;

use crate::db_types::{Dispute, DisputeOutcome, EscrowTransaction, OrderId};

use super::MarketplaceError;

/// The dispute lifecycle and its escrow side effects.
#[allow(async_fn_in_trait)]
pub trait DisputeManagement: Clone {
    /// Opens a dispute against an order. Guarded: at most one open or
    /// in-progress dispute may exist per order at any time, enforced with a
    /// conditional insert so concurrent attempts cannot slip through.
    async fn insert_dispute(&self, order_id: &OrderId, raised_by: &str, reason: &str)
        -> Result<Dispute, DisputeError>;

    /// An admin takes the case: `Open` → `InProgress` (conditional).
    async fn begin_dispute_review(&self, dispute_id: i64) -> Result<Dispute, DisputeError>;

    /// Adjudicates a dispute. In a single atomic transaction:
    /// * the dispute moves to `Resolved` with the given outcome (conditional,
    ///   so a second resolution observes [`DisputeError::DisputeAlreadyResolved`]),
    /// * `Refund` moves the escrow `Held` → `Refunded` and the order's payment
    ///   status to `Refunded`,
    /// * `Release` force-releases the escrow `Held` → `Released` and sets the
    ///   order's `escrow_released` flag, bypassing the buyer-confirmation gate.
    ///
    /// Resolving with [`DisputeOutcome::None`] is rejected.
    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        outcome: DisputeOutcome,
    ) -> Result<(Dispute, EscrowTransaction), DisputeError>;

    /// Fetches a dispute by id.
    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, DisputeError>;

    /// The open or in-progress dispute for an order, if one exists.
    async fn fetch_blocking_dispute(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError>;
}

#[derive(Debug, Clone, Error)]
pub enum DisputeError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested dispute (id {0}) does not exist")]
    DisputeNotFound(i64),
    #[error("Dispute {0} has already been resolved")]
    DisputeAlreadyResolved(i64),
    #[error("Order {0} already has an open dispute")]
    DisputeAlreadyOpen(OrderId),
    #[error("A dispute cannot be resolved with outcome 'None'")]
    OutcomeRequired,
    #[error("{0}")]
    OrderError(#[from] MarketplaceError),
}

impl From<sqlx::Error> for DisputeError {
    fn from(e: sqlx::Error) -> Self {
        DisputeError::DatabaseError(e.to_string())
    }
}
