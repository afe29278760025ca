//! Support routines for the delivery manager: great-circle distances, delivery
//! windows, and identifier minting.
mod geo;
mod tracking;

pub use geo::{delivery_window, haversine_km, EARTH_RADIUS_KM};
pub use tracking::{is_valid_tracking_number, new_order_id, new_tracking_number};
