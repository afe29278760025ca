use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sok_common::Cents;

use crate::db_types::{Location, OrderId, Shipment, ShipmentType, TrackingEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOrderResult {
    Inserted(i64),
    AlreadyExists(i64),
}

/// A priced, partner-assigned shipment ready for insertion. Built by the
/// delivery API once a partner has been selected and the route costed.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub order_id: OrderId,
    pub partner_id: i64,
    pub shipment_type: ShipmentType,
    pub pickup: Location,
    pub delivery: Location,
    pub distance_km: f64,
    pub cost: Cents,
    pub scheduled_pickup_at: DateTime<Utc>,
    pub eta_at: DateTime<Utc>,
}

/// Courier-supplied context for a status change. Everything is optional; a
/// bare status update still appends a tracking event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShipmentStatusUpdate {
    pub location: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub note: Option<String>,
}

/// A shipment with its complete event history, oldest event first.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingHistory {
    pub shipment: Shipment,
    pub events: Vec<TrackingEvent>,
}
