use log::trace;
use sok_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db::traits::ShipmentError,
    db_types::{DeliveryPartner, PartnerType},
};

const PARTNER_COLUMNS: &str = "id, name, partner_type, base_rate, per_km_rate, rating, total_deliveries, earnings, \
                               verified, active, created_at, updated_at";

/// The deterministic candidate ordering: best-rated first, then the partner
/// with the fewest deliveries (spread the load), then lowest id.
const CANDIDATE_ORDER: &str = "ORDER BY rating DESC, total_deliveries ASC, id ASC";

/// Active, verified bikers serving the given city.
pub async fn find_local_partners(
    city: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryPartner>, ShipmentError> {
    let q = format!(
        "SELECT {PARTNER_COLUMNS} FROM delivery_partners \
         WHERE partner_type = 'Biker' AND active = 1 AND verified = 1 \
         AND id IN (SELECT partner_id FROM partner_cities WHERE city = $1) {CANDIDATE_ORDER}"
    );
    let partners = sqlx::query_as::<_, DeliveryPartner>(&q).bind(city.trim()).fetch_all(conn).await?;
    trace!("🛵️ {} local candidates in {city}", partners.len());
    Ok(partners)
}

/// Active, verified carriers with a registered route between the two cities,
/// in either direction.
pub async fn find_intercity_partners(
    from_city: &str,
    to_city: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<DeliveryPartner>, ShipmentError> {
    let q = format!(
        "SELECT {PARTNER_COLUMNS} FROM delivery_partners \
         WHERE partner_type = 'Carrier' AND active = 1 AND verified = 1 \
         AND id IN (SELECT partner_id FROM partner_routes \
                    WHERE (from_city = $1 AND to_city = $2) OR (from_city = $2 AND to_city = $1)) \
         {CANDIDATE_ORDER}"
    );
    let partners =
        sqlx::query_as::<_, DeliveryPartner>(&q).bind(from_city.trim()).bind(to_city.trim()).fetch_all(conn).await?;
    trace!("🚌️ {} intercity candidates for {from_city} → {to_city}", partners.len());
    Ok(partners)
}

pub async fn fetch_partner(
    partner_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DeliveryPartner>, ShipmentError> {
    let q = format!("SELECT {PARTNER_COLUMNS} FROM delivery_partners WHERE id = $1");
    let partner = sqlx::query_as::<_, DeliveryPartner>(&q).bind(partner_id).fetch_optional(conn).await?;
    Ok(partner)
}

/// Accrues earnings and bumps the delivery counter when a shipment completes.
pub async fn record_completed_delivery(
    partner_id: i64,
    earnings: Cents,
    conn: &mut SqliteConnection,
) -> Result<(), ShipmentError> {
    sqlx::query(
        "UPDATE delivery_partners SET total_deliveries = total_deliveries + 1, earnings = earnings + $1, \
         updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(earnings.value())
    .bind(partner_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Partner onboarding is an external flow; these inserts exist for test
/// fixtures and local tooling that share the store.
#[allow(clippy::too_many_arguments)]
pub async fn insert_partner(
    name: &str,
    partner_type: PartnerType,
    base_rate: Cents,
    per_km_rate: Cents,
    rating: f64,
    verified: bool,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<i64, ShipmentError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO delivery_partners (name, partner_type, base_rate, per_km_rate, rating, verified, active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(name)
    .bind(partner_type.to_string())
    .bind(base_rate.value())
    .bind(per_km_rate.value())
    .bind(rating)
    .bind(verified)
    .bind(active)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn add_service_city(partner_id: i64, city: &str, conn: &mut SqliteConnection) -> Result<(), ShipmentError> {
    sqlx::query("INSERT OR IGNORE INTO partner_cities (partner_id, city) VALUES ($1, $2)")
        .bind(partner_id)
        .bind(city.trim())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn add_route(
    partner_id: i64,
    from_city: &str,
    to_city: &str,
    conn: &mut SqliteConnection,
) -> Result<(), ShipmentError> {
    sqlx::query("INSERT OR IGNORE INTO partner_routes (partner_id, from_city, to_city) VALUES ($1, $2, $3)")
        .bind(partner_id)
        .bind(from_city.trim())
        .bind(to_city.trim())
        .execute(conn)
        .await?;
    Ok(())
}
