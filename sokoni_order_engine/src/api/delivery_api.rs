use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    api::{errors::DeliveryApiError, order_objects::ShipmentRequest},
    db::traits::{
        MarketplaceDatabase, MarketplaceError, NewShipment, ShipmentError, ShipmentManagement, ShipmentStatusUpdate,
        TrackingHistory,
    },
    db_types::{DeliveryPartner, Location, OrderId, Shipment, ShipmentStatus, ShipmentType},
    events::{EventProducers, OrderDeliveredEvent},
    helpers::{delivery_window, haversine_km},
};

/// `DeliveryApi` matches paid orders to delivery partners, prices the route,
/// and exposes the shipment tracking timeline.
pub struct DeliveryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DeliveryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryApi")
    }
}

impl<B> DeliveryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DeliveryApi<B>
where B: ShipmentManagement + MarketplaceDatabase
{
    /// Partners able to carry goods between the two locations, best candidate
    /// first. An empty list is the normal "no coverage" outcome, not an error.
    pub async fn find_available_partners(
        &self,
        pickup: &Location,
        delivery: &Location,
    ) -> Result<Vec<DeliveryPartner>, DeliveryApiError> {
        Ok(self.db.find_available_partners(pickup, delivery).await?)
    }

    /// Dispatches a paid order: selects the best available partner, prices the
    /// route, and creates the shipment with its initial tracking event.
    ///
    /// The pickup location comes from the order's listing; the delivery
    /// location is the order's shipping address. Cost is
    /// `base_rate + distance × per_km_rate` over the great-circle distance,
    /// and the ETA is the scheduled pickup plus the promised delivery window
    /// for the route's distance bucket.
    pub async fn create_shipment(&self, req: ShipmentRequest) -> Result<Shipment, DeliveryApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(&req.order_id)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(req.order_id.clone()))?;
        let listing = self
            .db
            .fetch_listing(order.listing_id)
            .await?
            .ok_or(MarketplaceError::ListingNotFound(order.listing_id))?;
        let pickup = listing.pickup();
        let delivery = order.shipping_address();
        let candidates = self.db.find_available_partners(&pickup, &delivery).await?;
        let partner = candidates.first().ok_or_else(|| DeliveryApiError::NoCoverageAvailable {
            pickup: pickup.city.clone(),
            delivery: delivery.city.clone(),
        })?;
        let shipment_type =
            if pickup.same_city_as(&delivery) { ShipmentType::Local } else { ShipmentType::Intercity };
        let distance_km = haversine_km(&pickup, &delivery);
        let cost = partner.base_rate + partner.per_km_rate.scale_by(distance_km);
        let scheduled_pickup_at = req.scheduled_pickup_at.unwrap_or_else(|| Utc::now() + Duration::hours(1));
        let eta_at = scheduled_pickup_at + delivery_window(shipment_type, distance_km);
        debug!(
            "🚚️ Order {} matched to partner #{} ({}): {:.1} km {shipment_type} run, cost {cost}",
            order.order_id, partner.id, partner.name, distance_km
        );
        let shipment = self
            .db
            .insert_shipment(NewShipment {
                order_id: order.order_id.clone(),
                partner_id: partner.id,
                shipment_type,
                pickup,
                delivery,
                distance_km,
                cost,
                scheduled_pickup_at,
                eta_at,
            })
            .await?;
        info!("🚚️ Shipment #{} [{}] assigned for order {}", shipment.id, shipment.tracking_number, order.order_id);
        Ok(shipment)
    }

    /// A courier progress report. Advances the forward-only state machine and
    /// appends a tracking event; delivery accrues partner earnings and marks
    /// the order delivered, but never touches escrow.
    pub async fn update_shipment_status(
        &self,
        shipment_id: i64,
        new_status: ShipmentStatus,
        update: ShipmentStatusUpdate,
    ) -> Result<Shipment, DeliveryApiError> {
        let shipment = self.db.update_shipment_status(shipment_id, new_status, update).await?;
        if new_status == ShipmentStatus::Delivered {
            self.call_order_delivered_hook(&shipment).await;
        }
        Ok(shipment)
    }

    /// The shipment and its full event history for a tracking number. Events
    /// are returned oldest first; display layers wanting newest-first reverse
    /// the list.
    pub async fn track(&self, tracking_number: &str) -> Result<TrackingHistory, DeliveryApiError> {
        self.db
            .fetch_tracking(tracking_number)
            .await?
            .ok_or_else(|| ShipmentError::TrackingNumberNotFound(tracking_number.to_string()).into())
    }

    /// Fetches the shipment dispatched for an order, if any.
    pub async fn shipment_for_order(&self, order_id: &OrderId) -> Result<Option<Shipment>, DeliveryApiError> {
        Ok(self.db.fetch_shipment_for_order(order_id).await?)
    }

    async fn call_order_delivered_hook(&self, shipment: &Shipment) {
        for emitter in &self.producers.order_delivered_producer {
            let event = OrderDeliveredEvent::new(shipment.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
