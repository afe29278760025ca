//! # Sokoni order server
//!
//! The REST surface over the Sokoni order engine. It is responsible for:
//! * the buyer-facing order operations (checkout, cancellation, delivery confirmation, disputes, tracking),
//! * the seller-facing dispatch operation,
//! * the courier progress endpoint, and
//! * the HMAC-verified payment collaborator webhook.
//!
//! ## Configuration
//! The server is configured via `SOK_*` environment variables. See [config] for details.
//!
//! ## Authorization
//! User identity and roles are adjudicated by the upstream gateway. The server itself fences only the two channels
//! that bypass it: admin endpoints (shared key header) and payment webhooks (HMAC signature). See [auth].
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
