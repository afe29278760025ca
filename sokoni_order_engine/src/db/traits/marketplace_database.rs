use sok_common::Cents;
use thiserror::Error;

use crate::db_types::{EscrowTransaction, Listing, NewOrder, Order, OrderId, OrderStatusType};

use super::OrderManagement;

/// The order and escrow flows a backend must support.
///
/// This behaviour includes:
/// * Persisting validated orders
/// * Reading catalog data for order validation and pricing
/// * Handling payment-capture events (paid + escrow-held transition)
/// * The escrow release/refund state machine
///
/// Every mutation is conditional on the expected prior state. A mutation whose
/// precondition no longer holds reports the specific conflict error and leaves
/// the store untouched; callers retry after a re-read if they care to.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order atomically. Idempotent: if an order with the same
    /// order id already exists, the stored record is returned with `false`.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), MarketplaceError>;

    /// Fetches a listing for validation and pricing. Listings are managed by
    /// the storefront; this is a read-only view.
    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketplaceError>;

    /// The current highest bid on an auction listing, if any bids exist.
    async fn highest_bid(&self, listing_id: i64) -> Result<Option<Cents>, MarketplaceError>;

    /// Handles a successful payment capture. In a single atomic transaction:
    /// * the order moves `Pending` → `Confirmed` and `Unpaid` → `Paid` (conditional),
    /// * an escrow transaction is created in `Held` status.
    ///
    /// Fails with [`MarketplaceError::EscrowAlreadyExists`] if a non-refunded
    /// escrow row already exists for the order, making double captures a
    /// deterministic error rather than a double hold.
    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        amount: Cents,
    ) -> Result<(Order, EscrowTransaction), MarketplaceError>;

    /// Cancels an order. Only permitted while the order is `Pending` or
    /// `Confirmed`; a `Confirmed` cancellation also refunds the held escrow in
    /// the same transaction.
    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, MarketplaceError>;

    /// The buyer-gated escrow release. In a single atomic transaction:
    /// * verifies no open or in-progress dispute exists for the order,
    /// * verifies the order is `Delivered`,
    /// * moves the escrow row `Held` → `Released` via a conditional update,
    /// * sets the order's `escrow_released` flag.
    ///
    /// A concurrent duplicate call loses the conditional update and observes
    /// [`MarketplaceError::EscrowNotHeld`].
    async fn release_escrow(&self, order_id: &OrderId) -> Result<EscrowTransaction, MarketplaceError>;

    /// The dispute-resolution refund: escrow `Held` → `Refunded` plus payment
    /// status `Refunded`, atomically. Only the dispute handler calls this.
    async fn refund_escrow(&self, order_id: &OrderId) -> Result<EscrowTransaction, MarketplaceError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketplaceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested listing (id {0}) does not exist")]
    ListingNotFound(i64),
    #[error("An escrow transaction already exists for order {0}")]
    EscrowAlreadyExists(OrderId),
    #[error("No escrow transaction exists for order {0}")]
    EscrowNotFound(OrderId),
    #[error("The escrow for order {0} is not held (already released or refunded)")]
    EscrowNotHeld(OrderId),
    #[error("Order {0} has not been delivered")]
    OrderNotDelivered(OrderId),
    #[error("Order {0} has an open dispute")]
    DisputeOpen(OrderId),
    #[error("Order {order_id} cannot be cancelled from status {status}")]
    CannotCancel { order_id: OrderId, status: OrderStatusType },
    #[error("Order {0} is not awaiting payment")]
    OrderNotPayable(OrderId),
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceError::DatabaseError(e.to_string())
    }
}
