use std::fmt::Debug;

use log::*;
use sok_common::Cents;
use sqlx::SqlitePool;

use crate::{
    api::order_objects::OrderQueryFilter,
    db::{
        sqlite::{db_url, disputes, escrow, listings, new_pool, orders, partners, shipments},
        traits::{
            DisputeError, DisputeManagement, InsertOrderResult, MarketplaceDatabase, MarketplaceError, NewShipment,
            OrderManagement, ShipmentError, ShipmentManagement, ShipmentStatusUpdate, TrackingHistory,
        },
    },
    db_types::{
        DeliveryPartner, Dispute, DisputeOutcome, DisputeStatus, EscrowStatus, EscrowTransaction, Listing,
        ListingType, Location, NewOrder, Order, OrderId, OrderStatusType, PartnerType, PaymentStatus, Shipment,
        ShipmentStatus,
    },
    helpers::new_tracking_number,
};

/// How many fresh tracking numbers to try before giving up on a collision
/// streak that, in practice, never happens.
const TRACKING_MINT_ATTEMPTS: usize = 5;

/// The share of a shipment's cost credited to the courier on delivery.
const PARTNER_EARNINGS_PCT: i64 = 80;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, MarketplaceError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MarketplaceError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ----- Catalog and partner writes.
    //
    // Listing and courier onboarding are owned by the storefront and admin
    // flows, which share this store. The engine itself never calls these;
    // they exist for those collaborators, fixtures and local tooling.

    pub async fn insert_listing(
        &self,
        seller_id: &str,
        title: &str,
        price: Cents,
        listing_type: ListingType,
        pickup: &Location,
    ) -> Result<i64, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::insert_listing(seller_id, title, price, listing_type, pickup, &mut conn).await
    }

    pub async fn set_listing_active(&self, listing_id: i64, active: bool) -> Result<(), MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::set_listing_active(listing_id, active, &mut conn).await
    }

    pub async fn insert_bid(&self, listing_id: i64, bidder_id: &str, amount: Cents) -> Result<i64, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::insert_bid(listing_id, bidder_id, amount, &mut conn).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_partner(
        &self,
        name: &str,
        partner_type: PartnerType,
        base_rate: Cents,
        per_km_rate: Cents,
        rating: f64,
        verified: bool,
        active: bool,
    ) -> Result<i64, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        partners::insert_partner(name, partner_type, base_rate, per_km_rate, rating, verified, active, &mut conn).await
    }

    pub async fn add_partner_city(&self, partner_id: i64, city: &str) -> Result<(), ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        partners::add_service_city(partner_id, city, &mut conn).await
    }

    pub async fn add_partner_route(&self, partner_id: i64, from_city: &str, to_city: &str) -> Result<(), ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        partners::add_route(partner_id, from_city, to_city, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(query, &mut conn).await
    }

    async fn fetch_escrow_for_order(&self, order_id: &OrderId) -> Result<Option<EscrowTransaction>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        escrow::fetch_for_order(order_id, &mut conn).await
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let oid = order.order_id.clone();
        let (id, inserted) = match orders::idempotent_insert(order, &mut tx).await? {
            InsertOrderResult::Inserted(id) => (id, true),
            InsertOrderResult::AlreadyExists(id) => (id, false),
        };
        let order = orders::fetch_order_by_order_id(&oid, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(oid.clone()))?;
        tx.commit().await?;
        if inserted {
            debug!("🗃️ Order {oid} has been saved in the DB with id {id}");
        } else {
            debug!("🗃️ Order {oid} already existed with id {id}. Nothing was written.");
        }
        Ok((order, inserted))
    }

    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing(listing_id, &mut conn).await
    }

    async fn highest_bid(&self, listing_id: i64) -> Result<Option<Cents>, MarketplaceError> {
        let mut conn = self.pool.acquire().await?;
        listings::highest_bid(listing_id, &mut conn).await
    }

    async fn mark_order_paid(
        &self,
        order_id: &OrderId,
        amount: Cents,
    ) -> Result<(Order, EscrowTransaction), MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if amount != order.total_amount {
            warn!(
                "🗃️ Payment capture for order {order_id} is {amount}, but the order total is {}. Holding the \
                 captured amount.",
                order.total_amount
            );
        }
        if !orders::mark_paid(order_id, &mut tx).await? {
            // Not Pending/Unpaid any more. Distinguish a double capture from a
            // cancelled or otherwise unpayable order.
            let err = match escrow::fetch_for_order(order_id, &mut tx).await? {
                Some(t) if t.status != EscrowStatus::Refunded => MarketplaceError::EscrowAlreadyExists(order_id.clone()),
                _ => MarketplaceError::OrderNotPayable(order_id.clone()),
            };
            return Err(err);
        }
        let escrow_tx = escrow::insert_held(order_id, amount, &mut tx).await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️💰️ Order {order_id} is paid. Escrow #{} holds {amount}.", escrow_tx.id);
        Ok((order, escrow_tx))
    }

    async fn cancel_order(&self, order_id: &OrderId) -> Result<Order, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if !orders::mark_cancelled(order_id, &mut tx).await? {
            return Err(MarketplaceError::CannotCancel { order_id: order_id.clone(), status: order.status });
        }
        // A confirmed order has funds in escrow; cancellation returns them.
        if order.status == OrderStatusType::Confirmed {
            if escrow::settle(order_id, EscrowStatus::Refunded, &mut tx).await? {
                orders::set_payment_refunded(order_id, &mut tx).await?;
                debug!("🗃️❌️ Held escrow for order {order_id} refunded on cancellation");
            } else {
                warn!("🗃️❌️ Confirmed order {order_id} was cancelled, but no held escrow row was found");
            }
        }
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️❌️ Order {order_id} cancelled");
        Ok(order)
    }

    async fn release_escrow(&self, order_id: &OrderId) -> Result<EscrowTransaction, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::OrderNotFound(order_id.clone()))?;
        if escrow::blocking_dispute_exists(order_id, &mut tx).await? {
            return Err(MarketplaceError::DisputeOpen(order_id.clone()));
        }
        if order.status != OrderStatusType::Delivered {
            return Err(MarketplaceError::OrderNotDelivered(order_id.clone()));
        }
        if !escrow::settle(order_id, EscrowStatus::Released, &mut tx).await? {
            let err = match escrow::fetch_for_order(order_id, &mut tx).await? {
                Some(_) => MarketplaceError::EscrowNotHeld(order_id.clone()),
                None => MarketplaceError::EscrowNotFound(order_id.clone()),
            };
            return Err(err);
        }
        orders::set_escrow_released(order_id, &mut tx).await?;
        let escrow_tx = escrow::fetch_for_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::EscrowNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️🔓️ Escrow for order {order_id} released to the seller");
        Ok(escrow_tx)
    }

    async fn refund_escrow(&self, order_id: &OrderId) -> Result<EscrowTransaction, MarketplaceError> {
        let mut tx = self.pool.begin().await?;
        if !escrow::settle(order_id, EscrowStatus::Refunded, &mut tx).await? {
            let err = match escrow::fetch_for_order(order_id, &mut tx).await? {
                Some(_) => MarketplaceError::EscrowNotHeld(order_id.clone()),
                None => MarketplaceError::EscrowNotFound(order_id.clone()),
            };
            return Err(err);
        }
        orders::set_payment_refunded(order_id, &mut tx).await?;
        let escrow_tx = escrow::fetch_for_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| MarketplaceError::EscrowNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️↩️ Escrow for order {order_id} refunded to the buyer");
        Ok(escrow_tx)
    }

    async fn close(&mut self) -> Result<(), MarketplaceError> {
        self.pool.close().await;
        Ok(())
    }
}

impl ShipmentManagement for SqliteDatabase {
    async fn find_available_partners(
        &self,
        pickup: &Location,
        delivery: &Location,
    ) -> Result<Vec<DeliveryPartner>, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        if pickup.same_city_as(delivery) {
            partners::find_local_partners(&pickup.city, &mut conn).await
        } else {
            partners::find_intercity_partners(&pickup.city, &delivery.city, &mut conn).await
        }
    }

    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment, ShipmentError> {
        let oid = shipment.order_id.clone();
        let mut tx = self.pool.begin().await.map_err(MarketplaceError::from)?;
        let order = orders::fetch_order_by_order_id(&oid, &mut tx)
            .await
            .map_err(ShipmentError::from)?
            .ok_or(ShipmentError::OrderError(MarketplaceError::OrderNotFound(oid.clone())))?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(ShipmentError::OrderNotReadyForDispatch(oid));
        }
        // Unique tracking numbers are enforced by the index; re-mint on the
        // freak collision.
        let mut shipment_id = None;
        let mut tracking_number = String::new();
        for _ in 0..TRACKING_MINT_ATTEMPTS {
            tracking_number = new_tracking_number();
            match shipments::insert_shipment(&shipment, &tracking_number, &mut tx).await {
                Ok(id) => {
                    shipment_id = Some(id);
                    break;
                },
                Err(ShipmentError::TrackingNumberExhausted) => continue,
                Err(e) => return Err(e),
            }
        }
        let shipment_id = shipment_id.ok_or(ShipmentError::TrackingNumberExhausted)?;
        if !orders::mark_shipped(&oid, &tracking_number, &mut tx).await.map_err(ShipmentError::from)? {
            return Err(ShipmentError::OrderNotReadyForDispatch(oid));
        }
        let initial = ShipmentStatusUpdate {
            location: Some(shipment.pickup.city.clone()),
            note: Some("Shipment assigned to delivery partner".to_string()),
            ..Default::default()
        };
        shipments::append_event(shipment_id, ShipmentStatus::Assigned, &initial, &mut tx).await?;
        let result = shipments::fetch_shipment(shipment_id, &mut tx)
            .await?
            .ok_or(ShipmentError::ShipmentNotFound(shipment_id))?;
        tx.commit().await.map_err(MarketplaceError::from)?;
        debug!("🗃️🚚️ Shipment #{shipment_id} [{tracking_number}] created for order {}", result.order_id);
        Ok(result)
    }

    async fn update_shipment_status(
        &self,
        shipment_id: i64,
        new_status: ShipmentStatus,
        update: ShipmentStatusUpdate,
    ) -> Result<Shipment, ShipmentError> {
        let mut tx = self.pool.begin().await.map_err(MarketplaceError::from)?;
        let shipment = shipments::fetch_shipment(shipment_id, &mut tx)
            .await?
            .ok_or(ShipmentError::ShipmentNotFound(shipment_id))?;
        let from = shipment.status;
        if !from.can_advance_to(new_status) {
            return Err(ShipmentError::InvalidStatusTransition { id: shipment_id, from, to: new_status });
        }
        // The conditional update serializes racing couriers; whoever loses
        // sees the transition as out of order.
        if !shipments::advance_status(shipment_id, from, new_status, &mut tx).await? {
            return Err(ShipmentError::InvalidStatusTransition { id: shipment_id, from, to: new_status });
        }
        shipments::append_event(shipment_id, new_status, &update, &mut tx).await?;
        if new_status == ShipmentStatus::Delivered {
            let earnings = shipment.cost.percent(PARTNER_EARNINGS_PCT);
            partners::record_completed_delivery(shipment.partner_id, earnings, &mut tx).await?;
            if !orders::mark_delivered(&shipment.order_id, &mut tx).await.map_err(ShipmentError::from)? {
                return Err(ShipmentError::DatabaseError(format!(
                    "Order {} was not in Shipped state while its shipment was being delivered",
                    shipment.order_id
                )));
            }
            debug!(
                "🗃️🚚️ Shipment #{shipment_id} delivered. Partner #{} earned {earnings}.",
                shipment.partner_id
            );
        }
        let shipment =
            shipments::fetch_shipment(shipment_id, &mut tx).await?.ok_or(ShipmentError::ShipmentNotFound(shipment_id))?;
        tx.commit().await.map_err(MarketplaceError::from)?;
        Ok(shipment)
    }

    async fn fetch_shipment(&self, shipment_id: i64) -> Result<Option<Shipment>, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        shipments::fetch_shipment(shipment_id, &mut conn).await
    }

    async fn fetch_shipment_for_order(&self, order_id: &OrderId) -> Result<Option<Shipment>, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        shipments::fetch_shipment_for_order(order_id, &mut conn).await
    }

    async fn fetch_tracking(&self, tracking_number: &str) -> Result<Option<TrackingHistory>, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        let shipment = match shipments::fetch_shipment_by_tracking_number(tracking_number, &mut conn).await? {
            Some(s) => s,
            None => return Ok(None),
        };
        let events = shipments::fetch_events(shipment.id, &mut conn).await?;
        Ok(Some(TrackingHistory { shipment, events }))
    }

    async fn fetch_partner(&self, partner_id: i64) -> Result<Option<DeliveryPartner>, ShipmentError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        partners::fetch_partner(partner_id, &mut conn).await
    }
}

impl DisputeManagement for SqliteDatabase {
    async fn insert_dispute(
        &self,
        order_id: &OrderId,
        raised_by: &str,
        reason: &str,
    ) -> Result<Dispute, DisputeError> {
        let mut tx = self.pool.begin().await.map_err(MarketplaceError::from)?;
        let _ = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await
            .map_err(DisputeError::from)?
            .ok_or(DisputeError::OrderError(MarketplaceError::OrderNotFound(order_id.clone())))?;
        let dispute = disputes::insert_dispute(order_id, raised_by, reason, &mut tx).await?;
        tx.commit().await.map_err(MarketplaceError::from)?;
        Ok(dispute)
    }

    async fn begin_dispute_review(&self, dispute_id: i64) -> Result<Dispute, DisputeError> {
        let mut tx = self.pool.begin().await.map_err(MarketplaceError::from)?;
        if !disputes::mark_in_progress(dispute_id, &mut tx).await? {
            let dispute = disputes::fetch_dispute(dispute_id, &mut tx)
                .await?
                .ok_or(DisputeError::DisputeNotFound(dispute_id))?;
            return match dispute.status {
                DisputeStatus::Resolved => Err(DisputeError::DisputeAlreadyResolved(dispute_id)),
                // Already under review; taking the case twice is harmless.
                _ => Ok(dispute),
            };
        }
        let dispute =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(DisputeError::DisputeNotFound(dispute_id))?;
        tx.commit().await.map_err(MarketplaceError::from)?;
        Ok(dispute)
    }

    async fn resolve_dispute(
        &self,
        dispute_id: i64,
        outcome: DisputeOutcome,
    ) -> Result<(Dispute, EscrowTransaction), DisputeError> {
        if outcome == DisputeOutcome::None {
            return Err(DisputeError::OutcomeRequired);
        }
        let mut tx = self.pool.begin().await.map_err(MarketplaceError::from)?;
        let dispute =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(DisputeError::DisputeNotFound(dispute_id))?;
        if !disputes::mark_resolved(dispute_id, outcome, &mut tx).await? {
            return Err(DisputeError::DisputeAlreadyResolved(dispute_id));
        }
        let order_id = dispute.order_id.clone();
        let settled_to = match outcome {
            DisputeOutcome::Refund => EscrowStatus::Refunded,
            DisputeOutcome::Release => EscrowStatus::Released,
            DisputeOutcome::None => unreachable!("rejected above"),
        };
        if !escrow::settle(&order_id, settled_to, &mut tx).await.map_err(DisputeError::from)? {
            let err = match escrow::fetch_for_order(&order_id, &mut tx).await.map_err(DisputeError::from)? {
                Some(_) => MarketplaceError::EscrowNotHeld(order_id.clone()),
                None => MarketplaceError::EscrowNotFound(order_id.clone()),
            };
            return Err(DisputeError::OrderError(err));
        }
        match outcome {
            DisputeOutcome::Refund => {
                orders::set_payment_refunded(&order_id, &mut tx).await.map_err(DisputeError::from)?
            },
            // The admin override path: release without the buyer confirmation
            // gate. The order is deemed delivered so a released escrow always
            // sits on a Delivered order.
            DisputeOutcome::Release => {
                orders::force_delivered(&order_id, &mut tx).await.map_err(DisputeError::from)?;
                orders::set_escrow_released(&order_id, &mut tx).await.map_err(DisputeError::from)?;
            },
            DisputeOutcome::None => unreachable!("rejected above"),
        }
        let dispute =
            disputes::fetch_dispute(dispute_id, &mut tx).await?.ok_or(DisputeError::DisputeNotFound(dispute_id))?;
        let escrow_tx = escrow::fetch_for_order(&order_id, &mut tx)
            .await
            .map_err(DisputeError::from)?
            .ok_or(DisputeError::OrderError(MarketplaceError::EscrowNotFound(order_id.clone())))?;
        tx.commit().await.map_err(MarketplaceError::from)?;
        debug!("🗃️⚖️ Dispute #{dispute_id} on order {order_id} resolved: {outcome}");
        Ok((dispute, escrow_tx))
    }

    async fn fetch_dispute(&self, dispute_id: i64) -> Result<Option<Dispute>, DisputeError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        disputes::fetch_dispute(dispute_id, &mut conn).await
    }

    async fn fetch_blocking_dispute(&self, order_id: &OrderId) -> Result<Option<Dispute>, DisputeError> {
        let mut conn = self.pool.acquire().await.map_err(MarketplaceError::from)?;
        disputes::fetch_blocking_dispute(order_id, &mut conn).await
    }
}
