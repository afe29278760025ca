use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sok_common::Cents;

use crate::db_types::{EscrowTransaction, Location, Order, OrderId, OrderStatusType, PaymentMethod};

/// A checkout request as it arrives from the buyer-facing UI. Pricing fields
/// are deliberately absent; the order flow computes them from the listing so
/// that clients can never quote themselves a discount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub buyer_id: String,
    pub listing_id: i64,
    pub quantity: i64,
    pub payment_method: PaymentMethod,
    pub ship_to: Location,
    /// Externally-quoted shipping cost. Falls back to the flat default rate
    /// when the storefront did not obtain a quote.
    #[serde(default)]
    pub shipping_cost: Option<Cents>,
}

/// A dispatch request from the seller UI for a paid order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub order_id: OrderId,
    /// When the courier should collect. Defaults to an hour from now.
    #[serde(default)]
    pub scheduled_pickup_at: Option<DateTime<Utc>>,
}

/// An order together with its escrow transaction, if funds have been captured.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResult {
    pub order: Order,
    pub escrow: Option<EscrowTransaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_buyer_id<S: Into<String>>(mut self, buyer_id: S) -> Self {
        self.buyer_id = Some(buyer_id.into());
        self
    }

    pub fn with_seller_id<S: Into<String>>(mut self, seller_id: S) -> Self {
        self.seller_id = Some(seller_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none() &&
            self.buyer_id.is_none() &&
            self.seller_id.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.status.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(buyer_id) = &self.buyer_id {
            write!(f, "buyer_id: {buyer_id}. ")?;
        }
        if let Some(seller_id) = &self.seller_id {
            write!(f, "seller_id: {seller_id}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}
