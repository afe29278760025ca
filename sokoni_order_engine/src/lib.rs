//! Sokoni Order Engine
//!
//! The order engine coordinates the money-and-goods side of the Sokoni marketplace: order creation, escrow-held
//! payments, delivery-partner assignment with tracking, and buyer disputes. This library contains the core logic and
//! is provider-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly; use the public API instead. The exception is the data types used in the database, which
//!    are defined in the [`db_types`] module and are public.
//! 2. The engine public API ([`mod@api`]). One API per coordination concern: order flow, escrow, delivery, and
//!    disputes. Backends implement the traits in [`mod@db`] to serve these APIs, so the SQLite implementation can be
//!    swapped without touching callers.
//!
//! The engine also provides a set of events that can be subscribed to ([`events`]). These are emitted when funds are
//! held, goods are delivered, escrow is released, or a dispute is opened, so that notification and analytics
//! components can react without being wired into the flows themselves.
mod api;
mod db;

pub mod db_types;
pub mod events;
pub mod helpers;

#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    DisputeError,
    DisputeManagement,
    InsertOrderResult,
    MarketplaceDatabase,
    MarketplaceError,
    NewShipment,
    OrderManagement,
    ShipmentError,
    ShipmentManagement,
    ShipmentStatusUpdate,
    TrackingHistory,
};
pub use api::{
    delivery_api::DeliveryApi,
    dispute_api::DisputeApi,
    errors::{DeliveryApiError, DisputeApiError, EscrowApiError, OrderFlowError},
    escrow_api::EscrowApi,
    order_flow_api::OrderFlowApi,
    order_objects,
};
