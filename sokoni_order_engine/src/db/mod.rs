//! # Database management and control.
//!
//! This module defines the interface contracts of the order engine database *backends*.
//!
//! ## Traits
//! * [`MarketplaceDatabase`](traits::MarketplaceDatabase) defines the order and escrow flows a backend must support.
//! * [`OrderManagement`](traits::OrderManagement) defines query behaviour for orders and their escrow rows.
//! * [`ShipmentManagement`](traits::ShipmentManagement) covers partner matching, shipment dispatch and tracking.
//! * [`DisputeManagement`](traits::DisputeManagement) covers the dispute lifecycle and its escrow side effects.
//!
//! The only backend shipped in-tree is SQLite ([`sqlite`]); the traits exist so that a Postgres
//! backend can be added without touching the API layer.
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;
