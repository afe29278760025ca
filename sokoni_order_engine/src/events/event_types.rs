use crate::db_types::{Dispute, EscrowTransaction, Order, Shipment};

/// Payment captured and held in escrow; the order is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub escrow: EscrowTransaction,
}

impl OrderPaidEvent {
    pub fn new(order: Order, escrow: EscrowTransaction) -> Self {
        Self { order, escrow }
    }
}

/// The courier marked the shipment delivered. Escrow is still held at this
/// point; release waits for the buyer (or an admin resolution).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDeliveredEvent {
    pub shipment: Shipment,
}

impl OrderDeliveredEvent {
    pub fn new(shipment: Shipment) -> Self {
        Self { shipment }
    }
}

/// Funds released to the seller, either buyer-confirmed or admin-adjudicated.
#[derive(Debug, Clone, PartialEq)]
pub struct EscrowReleasedEvent {
    pub escrow: EscrowTransaction,
}

impl EscrowReleasedEvent {
    pub fn new(escrow: EscrowTransaction) -> Self {
        Self { escrow }
    }
}

/// A buyer contested an order; escrow release is now blocked pending
/// adjudication.
#[derive(Debug, Clone, PartialEq)]
pub struct DisputeOpenedEvent {
    pub dispute: Dispute,
}

impl DisputeOpenedEvent {
    pub fn new(dispute: Dispute) -> Self {
        Self { dispute }
    }
}
