//! # Order engine public API
//!
//! The `api` module exposes the programmatic API for the Sokoni order engine.
//! The API is modular, so that clients can pick and choose the functionality
//! they need, and the four coordination concerns stay independently testable:
//!
//! * [`order_flow_api`] creates and cancels orders and handles inbound payment
//!   events from the payment collaborator.
//! * [`escrow_api`] holds, releases and refunds the funds tied to an order.
//! * [`delivery_api`] matches shipments to delivery partners and exposes the
//!   tracking timeline.
//! * [`dispute_api`] lets buyers contest orders and admins adjudicate them.
//!
//! # API usage
//!
//! The pattern for using all the APIs is the same. An API instance is created
//! by supplying a database backend that implements the traits the API needs:
//!
//! ```rust,ignore
//! use sokoni_order_engine::{EscrowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/sokoni.db", 25).await?;
//! let api = EscrowApi::new(db, producers);
//! let escrow = api.confirm_delivery(&order_id, "buyer-42").await?;
//! ```
pub mod delivery_api;
pub mod dispute_api;
pub mod errors;
pub mod escrow_api;
pub mod order_flow_api;
pub mod order_objects;
