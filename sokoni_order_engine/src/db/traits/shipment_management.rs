use thiserror::Error;

use crate::db_types::{DeliveryPartner, Location, OrderId, Shipment, ShipmentStatus};

use super::{MarketplaceError, NewShipment, ShipmentStatusUpdate, TrackingHistory};

/// Partner matching, shipment dispatch and tracking behaviour for backends.
#[allow(async_fn_in_trait)]
pub trait ShipmentManagement: Clone {
    /// Partners able to carry goods from `pickup` to `delivery`.
    ///
    /// Same-city routes are served by active, verified bikers covering the
    /// pickup city; intercity routes by active, verified carriers with a
    /// registered route between the two cities (matched in either direction).
    ///
    /// Candidates are ordered by rating descending, then fewest total
    /// deliveries, then lowest id. An empty result is a normal outcome
    /// signalling "no coverage", not an error.
    async fn find_available_partners(
        &self,
        pickup: &Location,
        delivery: &Location,
    ) -> Result<Vec<DeliveryPartner>, ShipmentError>;

    /// Persists a shipment for a paid order. In a single atomic transaction:
    /// * the order moves `Confirmed` → `Shipped` (conditional) and records the
    ///   tracking number,
    /// * the shipment row is created in `Assigned` status under a freshly
    ///   minted, globally unique tracking number,
    /// * the initial tracking event is appended.
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment, ShipmentError>;

    /// Advances a shipment along its forward-only state machine and appends a
    /// tracking event. The transition is a conditional update keyed on the
    /// current status, so concurrent updates serialize; an out-of-order
    /// request observes [`ShipmentError::InvalidStatusTransition`].
    ///
    /// On the move to `Delivered`, within the same transaction:
    /// * 80% of the shipment cost accrues to the partner's earnings and the
    ///   partner's delivery counter is bumped,
    /// * the order moves `Shipped` → `Delivered`.
    ///
    /// Escrow is untouched; release stays buyer-gated.
    async fn update_shipment_status(
        &self,
        shipment_id: i64,
        new_status: ShipmentStatus,
        update: ShipmentStatusUpdate,
    ) -> Result<Shipment, ShipmentError>;

    /// Fetches a shipment by its internal id.
    async fn fetch_shipment(&self, shipment_id: i64) -> Result<Option<Shipment>, ShipmentError>;

    /// Fetches the shipment for an order, if the order has been dispatched.
    async fn fetch_shipment_for_order(&self, order_id: &OrderId) -> Result<Option<Shipment>, ShipmentError>;

    /// A shipment and its full event history (insertion order, oldest first),
    /// looked up by public tracking number.
    async fn fetch_tracking(&self, tracking_number: &str) -> Result<Option<TrackingHistory>, ShipmentError>;

    /// Fetches a delivery partner record.
    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<DeliveryPartner>, ShipmentError>;
}

#[derive(Debug, Clone, Error)]
pub enum ShipmentError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested shipment (id {0}) does not exist")]
    ShipmentNotFound(i64),
    #[error("No shipment with tracking number {0} exists")]
    TrackingNumberNotFound(String),
    #[error("Shipment {id} cannot move from {from} to {to}")]
    InvalidStatusTransition { id: i64, from: ShipmentStatus, to: ShipmentStatus },
    #[error("Order {0} is not ready for dispatch")]
    OrderNotReadyForDispatch(OrderId),
    #[error("Order {0} already has a shipment")]
    ShipmentAlreadyExists(OrderId),
    #[error("Could not mint a unique tracking number")]
    TrackingNumberExhausted,
    #[error("The requested delivery partner (id {0}) does not exist")]
    PartnerNotFound(i64),
    #[error("{0}")]
    OrderError(#[from] MarketplaceError),
}

impl From<sqlx::Error> for ShipmentError {
    fn from(e: sqlx::Error) -> Self {
        ShipmentError::DatabaseError(e.to_string())
    }
}
