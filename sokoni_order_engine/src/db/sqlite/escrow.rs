use log::trace;
use sok_common::Cents;
use sqlx::SqliteConnection;

use crate::{
    db::traits::MarketplaceError,
    db_types::{EscrowStatus, EscrowTransaction, OrderId},
};

const ESCROW_COLUMNS: &str = "id, order_id, amount, status, created_at, updated_at";

/// Creates the `Held` escrow row for an order. The partial unique index on
/// live escrow rows turns a double hold into a unique violation, which is
/// reported as [`MarketplaceError::EscrowAlreadyExists`].
pub async fn insert_held(
    order_id: &OrderId,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<EscrowTransaction, MarketplaceError> {
    let res = sqlx::query_scalar::<_, i64>(
        "INSERT INTO escrow_transactions (order_id, amount) VALUES ($1, $2) RETURNING id",
    )
    .bind(order_id.as_str())
    .bind(amount.value())
    .fetch_one(&mut *conn)
    .await;
    let id = match res {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(MarketplaceError::EscrowAlreadyExists(order_id.clone()));
        },
        Err(e) => return Err(e.into()),
    };
    trace!("🔐️ Escrow transaction #{id} created for order {order_id} ({amount})");
    fetch_by_id(id, conn).await?.ok_or_else(|| {
        MarketplaceError::DatabaseError(format!("Escrow row {id} vanished straight after insertion"))
    })
}

pub async fn fetch_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<EscrowTransaction>, MarketplaceError> {
    let q = format!("SELECT {ESCROW_COLUMNS} FROM escrow_transactions WHERE id = $1");
    let tx = sqlx::query_as::<_, EscrowTransaction>(&q).bind(id).fetch_optional(conn).await?;
    Ok(tx)
}

/// The current escrow transaction for an order: the live (non-refunded) row if
/// one exists, otherwise the most recent row.
pub async fn fetch_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<EscrowTransaction>, MarketplaceError> {
    let q = format!(
        "SELECT {ESCROW_COLUMNS} FROM escrow_transactions WHERE order_id = $1 \
         ORDER BY (status <> 'Refunded') DESC, id DESC LIMIT 1"
    );
    let tx = sqlx::query_as::<_, EscrowTransaction>(&q).bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(tx)
}

/// Whether an open or in-progress dispute currently blocks release for this
/// order. Lives here rather than in the disputes module because it is part of
/// the escrow release gate and shares its error type.
pub async fn blocking_dispute_exists(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM disputes WHERE order_id = $1 AND status <> 'Resolved')",
    )
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

/// Conditional `Held` → `Released`/`Refunded` transition. Returns false when
/// the row was not `Held`, so racing callers observe a conflict instead of a
/// double settlement.
pub async fn settle(
    order_id: &OrderId,
    to: EscrowStatus,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceError> {
    debug_assert!(matches!(to, EscrowStatus::Released | EscrowStatus::Refunded));
    let res = sqlx::query(
        "UPDATE escrow_transactions SET status = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $2 AND status = 'Held'",
    )
    .bind(to.to_string())
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
