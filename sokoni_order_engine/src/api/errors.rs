use thiserror::Error;

use crate::db::traits::{DisputeError, MarketplaceError, ShipmentError};

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),
    #[error("Listing {0} is not available for purchase")]
    ProductUnavailable(i64),
    #[error("Buyers may not purchase their own listings")]
    SelfPurchaseDenied,
    #[error("{0}")]
    Backend(#[from] MarketplaceError),
}

#[derive(Debug, Clone, Error)]
pub enum EscrowApiError {
    #[error("Only the order's buyer may confirm delivery")]
    NotBuyer,
    #[error("{0}")]
    Backend(#[from] MarketplaceError),
}

#[derive(Debug, Clone, Error)]
pub enum DeliveryApiError {
    #[error("No delivery partner covers the route from {pickup} to {delivery}")]
    NoCoverageAvailable { pickup: String, delivery: String },
    #[error("{0}")]
    Backend(#[from] ShipmentError),
    #[error("{0}")]
    OrderBackend(#[from] MarketplaceError),
}

#[derive(Debug, Clone, Error)]
pub enum DisputeApiError {
    #[error("Only the order's buyer may open a dispute")]
    NotBuyer,
    #[error("{0}")]
    Backend(#[from] DisputeError),
    #[error("{0}")]
    OrderBackend(#[from] MarketplaceError),
}
