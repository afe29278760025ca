use sok_common::Cents;

use crate::{
    db_types::{ListingType, Location, PartnerType},
    MarketplaceError, ShipmentError, SqliteDatabase,
};

pub fn nairobi(street: &str) -> Location {
    Location::new(street, "Nairobi", -1.2864, 36.8172)
}

pub fn mombasa(street: &str) -> Location {
    Location::new(street, "Mombasa", -4.0435, 39.6682)
}

pub fn kisumu(street: &str) -> Location {
    Location::new(street, "Kisumu", -0.0917, 34.7680)
}

/// A fixed-price listing picked up from a Nairobi market stall.
pub async fn seed_listing(db: &SqliteDatabase, seller_id: &str, price: Cents) -> Result<i64, MarketplaceError> {
    db.insert_listing(seller_id, "Hand-carved soapstone set", price, ListingType::FixedPrice, &nairobi("City Market"))
        .await
}

pub async fn seed_auction_listing(
    db: &SqliteDatabase,
    seller_id: &str,
    reserve: Cents,
) -> Result<i64, MarketplaceError> {
    db.insert_listing(seller_id, "Vintage kiondo basket", reserve, ListingType::Auction, &nairobi("City Market")).await
}

/// A verified Nairobi biker.
pub async fn seed_biker(db: &SqliteDatabase, name: &str, rating: f64) -> Result<i64, ShipmentError> {
    let id = db.insert_partner(name, PartnerType::Biker, Cents::from(2_00), Cents::from(50), rating, true, true).await?;
    db.add_partner_city(id, "Nairobi").await?;
    Ok(id)
}

/// A verified carrier running the Nairobi ↔ Mombasa route.
pub async fn seed_carrier(db: &SqliteDatabase, name: &str, rating: f64) -> Result<i64, ShipmentError> {
    let id =
        db.insert_partner(name, PartnerType::Carrier, Cents::from(10_00), Cents::from(10), rating, true, true).await?;
    db.add_partner_route(id, "Nairobi", "Mombasa").await?;
    Ok(id)
}
