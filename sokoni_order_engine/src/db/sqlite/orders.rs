use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    api::order_objects::OrderQueryFilter,
    db::traits::{InsertOrderResult, MarketplaceError},
    db_types::{NewOrder, Order, OrderId},
};

const ORDER_COLUMNS: &str = "id, order_id, buyer_id, seller_id, listing_id, quantity, unit_price, shipping_cost, \
                             total_amount, status, payment_method, payment_status, ship_to_street, ship_to_city, \
                             ship_to_lat, ship_to_lng, tracking_number, escrow_released, created_at, updated_at";

/// Inserts a new order, or reports the existing row id if the order id has
/// been seen before. Not atomic on its own; run inside a transaction when
/// combined with other writes.
pub async fn idempotent_insert(
    order: NewOrder,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, MarketplaceError> {
    if let Some(existing) = fetch_order_by_order_id(&order.order_id, conn).await? {
        return Ok(InsertOrderResult::AlreadyExists(existing.id));
    }
    let total = order.total_amount();
    let id = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO orders (
                order_id, buyer_id, seller_id, listing_id, quantity, unit_price, shipping_cost, total_amount,
                payment_method, ship_to_street, ship_to_city, ship_to_lat, ship_to_lng
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.buyer_id)
    .bind(&order.seller_id)
    .bind(order.listing_id)
    .bind(order.quantity)
    .bind(order.unit_price.value())
    .bind(order.shipping_cost.value())
    .bind(total.value())
    .bind(order.payment_method.to_string())
    .bind(&order.ship_to.street)
    .bind(&order.ship_to.city)
    .bind(order.ship_to.lat)
    .bind(order.ship_to.lng)
    .fetch_one(conn)
    .await?;
    Ok(InsertOrderResult::Inserted(id))
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceError> {
    let q = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
    let order = sqlx::query_as::<_, Order>(&q).bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn fetch_orders(
    query: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, MarketplaceError> {
    let mut builder = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.0);
    }
    if let Some(buyer_id) = query.buyer_id {
        where_clause.push("buyer_id = ");
        where_clause.push_bind_unseparated(buyer_id);
    }
    if let Some(seller_id) = query.seller_id {
        where_clause.push("seller_id = ");
        where_clause.push_bind_unseparated(seller_id);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(statuses) = query.status {
        let status_clause = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("📦️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Conditional `Pending`/`Unpaid` → `Confirmed`/`Paid` transition. Returns
/// false if the order was not in the expected state.
pub async fn mark_paid(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, MarketplaceError> {
    let res = sqlx::query(
        "UPDATE orders SET status = 'Confirmed', payment_status = 'Paid', updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $1 AND status = 'Pending' AND payment_status = 'Unpaid'",
    )
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Conditional cancellation. Only `Pending` and `Confirmed` orders may cancel.
pub async fn mark_cancelled(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, MarketplaceError> {
    let res = sqlx::query(
        "UPDATE orders SET status = 'Cancelled', updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $1 AND status IN ('Pending', 'Confirmed')",
    )
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Conditional `Confirmed` → `Shipped` transition, recording the tracking
/// number on the order for the buyer's benefit.
pub async fn mark_shipped(
    order_id: &OrderId,
    tracking_number: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let res = sqlx::query(
        "UPDATE orders SET status = 'Shipped', tracking_number = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $2 AND status = 'Confirmed'",
    )
    .bind(tracking_number)
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Conditional `Shipped` → `Delivered` transition.
pub async fn mark_delivered(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, MarketplaceError> {
    let res = sqlx::query(
        "UPDATE orders SET status = 'Delivered', updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $1 AND status = 'Shipped'",
    )
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Deems an order delivered by adjudication, from any live pre-delivery
/// state. Used only by the dispute Release leg so that a released escrow
/// always sits on a `Delivered` order. Still forward-only: `Delivered` is the
/// last forward state, and cancelled orders never hold escrow.
pub async fn force_delivered(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, MarketplaceError> {
    let res = sqlx::query(
        "UPDATE orders SET status = 'Delivered', updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $1 AND status IN ('Pending', 'Confirmed', 'Shipped')",
    )
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}

/// Stamps the order as escrow-released. Invariant: only ever called alongside
/// a successful `Held` → `Released` escrow transition, so the flag implies a
/// delivered order with a released transaction.
pub async fn set_escrow_released(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query("UPDATE orders SET escrow_released = 1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $1")
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn set_payment_refunded(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<(), MarketplaceError> {
    sqlx::query("UPDATE orders SET payment_status = 'Refunded', updated_at = CURRENT_TIMESTAMP WHERE order_id = $1")
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
