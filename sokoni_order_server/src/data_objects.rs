use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sok_common::Cents;
use sokoni_order_engine::{
    db_types::{DisputeOutcome, OrderId, ShipmentStatus},
    ShipmentStatusUpdate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The payment collaborator's webhook payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentNotification {
    Captured { order_id: OrderId, amount: Cents },
    Failed { order_id: OrderId, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDeliveryRequest {
    pub buyer_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenDisputeRequest {
    pub buyer_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveDisputeRequest {
    pub outcome: DisputeOutcome,
}

/// A courier progress report: the new status plus optional location context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentStatusRequest {
    pub status: ShipmentStatus,
    #[serde(flatten)]
    pub update: ShipmentStatusUpdate,
}
