pub mod db;

pub use db::SqliteDatabase;

pub mod disputes;
pub mod escrow;
pub mod listings;
pub mod orders;
pub mod partners;
pub mod shipments;

use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::db::traits::MarketplaceError;

const SQLITE_DB_URL: &str = "sqlite://data/sokoni_store.db";

pub fn db_url() -> String {
    let result = env::var("SOK_DATABASE_URL").unwrap_or_else(|_| {
        info!("SOK_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, MarketplaceError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
