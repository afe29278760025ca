use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{EscrowTransaction, Order, OrderId},
};

use super::MarketplaceError;

/// Query behaviour for orders and their escrow rows.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Fetches the order with the given public order id, if it exists.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError>;

    /// Fetches orders according to the criteria in the filter, ordered by
    /// `created_at` ascending.
    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError>;

    /// The current (non-refunded, or most recent) escrow transaction for an
    /// order, if one exists.
    async fn fetch_escrow_for_order(&self, order_id: &OrderId) -> Result<Option<EscrowTransaction>, MarketplaceError>;
}
