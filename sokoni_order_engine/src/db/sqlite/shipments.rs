use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::{NewShipment, ShipmentError, ShipmentStatusUpdate},
    db_types::{OrderId, Shipment, ShipmentStatus, TrackingEvent},
};

const SHIPMENT_COLUMNS: &str = "id, order_id, partner_id, shipment_type, pickup_street, pickup_city, pickup_lat, \
                                pickup_lng, delivery_street, delivery_city, delivery_lat, delivery_lng, \
                                tracking_number, status, distance_km, cost, scheduled_pickup_at, eta_at, created_at, \
                                updated_at";

const EVENT_COLUMNS: &str = "id, shipment_id, lat, lng, location, status, note, recorded_at";

/// Inserts the shipment row under the given tracking number. Two unique
/// constraints can fire here: one shipment per order, and globally unique
/// tracking numbers; the caller retries the latter with a fresh number.
pub async fn insert_shipment(
    shipment: &NewShipment,
    tracking_number: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, ShipmentError> {
    let res = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO shipments (
                order_id, partner_id, shipment_type, pickup_street, pickup_city, pickup_lat, pickup_lng,
                delivery_street, delivery_city, delivery_lat, delivery_lng, tracking_number, distance_km, cost,
                scheduled_pickup_at, eta_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING id;
        "#,
    )
    .bind(shipment.order_id.as_str())
    .bind(shipment.partner_id)
    .bind(shipment.shipment_type.to_string())
    .bind(&shipment.pickup.street)
    .bind(&shipment.pickup.city)
    .bind(shipment.pickup.lat)
    .bind(shipment.pickup.lng)
    .bind(&shipment.delivery.street)
    .bind(&shipment.delivery.city)
    .bind(shipment.delivery.lat)
    .bind(shipment.delivery.lng)
    .bind(tracking_number)
    .bind(shipment.distance_km)
    .bind(shipment.cost.value())
    .bind(shipment.scheduled_pickup_at)
    .bind(shipment.eta_at)
    .fetch_one(conn)
    .await;
    match res {
        Ok(id) => Ok(id),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            if e.message().contains("tracking_number") {
                Err(ShipmentError::TrackingNumberExhausted)
            } else {
                Err(ShipmentError::ShipmentAlreadyExists(shipment.order_id.clone()))
            }
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_shipment(shipment_id: i64, conn: &mut SqliteConnection) -> Result<Option<Shipment>, ShipmentError> {
    let q = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1");
    let shipment = sqlx::query_as::<_, Shipment>(&q).bind(shipment_id).fetch_optional(conn).await?;
    Ok(shipment)
}

pub async fn fetch_shipment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Shipment>, ShipmentError> {
    let q = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1");
    let shipment = sqlx::query_as::<_, Shipment>(&q).bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(shipment)
}

pub async fn fetch_shipment_by_tracking_number(
    tracking_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Shipment>, ShipmentError> {
    let q = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE tracking_number = $1");
    let shipment = sqlx::query_as::<_, Shipment>(&q).bind(tracking_number).fetch_optional(conn).await?;
    Ok(shipment)
}

/// Conditional single-step advance of the forward-only state machine. The
/// `WHERE status = from` clause serializes concurrent couriers; the loser
/// affects zero rows and reports a conflict.
pub async fn advance_status(
    shipment_id: i64,
    from: ShipmentStatus,
    to: ShipmentStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, ShipmentError> {
    let res = sqlx::query(
        "UPDATE shipments SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 AND status = $3",
    )
    .bind(to.to_string())
    .bind(shipment_id)
    .bind(from.to_string())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Appends a tracking event. Events are immutable once written.
pub async fn append_event(
    shipment_id: i64,
    status: ShipmentStatus,
    update: &ShipmentStatusUpdate,
    conn: &mut SqliteConnection,
) -> Result<(), ShipmentError> {
    sqlx::query(
        "INSERT INTO shipment_events (shipment_id, lat, lng, location, status, note) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(shipment_id)
    .bind(update.lat)
    .bind(update.lng)
    .bind(update.location.as_deref().unwrap_or(""))
    .bind(status.to_string())
    .bind(update.note.as_deref())
    .execute(conn)
    .await?;
    trace!("🛰️ Shipment #{shipment_id} event appended: {status}");
    Ok(())
}

/// The event timeline for a shipment, in insertion order (oldest first).
pub async fn fetch_events(shipment_id: i64, conn: &mut SqliteConnection) -> Result<Vec<TrackingEvent>, ShipmentError> {
    let q = format!("SELECT {EVENT_COLUMNS} FROM shipment_events WHERE shipment_id = $1 ORDER BY id ASC");
    let events = sqlx::query_as::<_, TrackingEvent>(&q).bind(shipment_id).fetch_all(conn).await?;
    Ok(events)
}
