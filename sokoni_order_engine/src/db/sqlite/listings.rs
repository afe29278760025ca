use sok_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db::traits::MarketplaceError,
    db_types::{Listing, ListingType, Location},
};

const LISTING_COLUMNS: &str =
    "id, seller_id, title, price, listing_type, active, pickup_street, pickup_city, pickup_lat, pickup_lng, created_at";

pub async fn fetch_listing(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<Listing>, MarketplaceError> {
    let q = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
    let listing = sqlx::query_as::<_, Listing>(&q).bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

/// The current highest bid on a listing, if any bids have been placed.
pub async fn highest_bid(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cents>, MarketplaceError> {
    let amount = sqlx::query_scalar::<_, Option<i64>>("SELECT MAX(amount) FROM bids WHERE listing_id = $1")
        .bind(listing_id)
        .fetch_one(conn)
        .await?;
    Ok(amount.map(Cents::from))
}

/// Catalog writes belong to the storefront; these inserts exist for test
/// fixtures and local tooling that share the store.
pub async fn insert_listing(
    seller_id: &str,
    title: &str,
    price: Cents,
    listing_type: ListingType,
    pickup: &Location,
    conn: &mut SqliteConnection,
) -> Result<i64, MarketplaceError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO listings (seller_id, title, price, listing_type, pickup_street, pickup_city, pickup_lat, \
         pickup_lng) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
    )
    .bind(seller_id)
    .bind(title)
    .bind(price.value())
    .bind(listing_type.to_string())
    .bind(&pickup.street)
    .bind(&pickup.city)
    .bind(pickup.lat)
    .bind(pickup.lng)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn set_listing_active(
    listing_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<(), MarketplaceError> {
    sqlx::query("UPDATE listings SET active = $1 WHERE id = $2").bind(active).bind(listing_id).execute(conn).await?;
    Ok(())
}

pub async fn insert_bid(
    listing_id: i64,
    bidder_id: &str,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<i64, MarketplaceError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO bids (listing_id, bidder_id, amount) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(listing_id)
    .bind(bidder_id)
    .bind(amount.value())
    .fetch_one(conn)
    .await?;
    Ok(id)
}
