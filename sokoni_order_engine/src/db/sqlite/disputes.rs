use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db::traits::DisputeError,
    db_types::{Dispute, DisputeOutcome, OrderId},
};

const DISPUTE_COLUMNS: &str = "id, order_id, raised_by, reason, status, outcome, created_at, resolved_at";

/// Inserts a new `Open` dispute. The partial unique index over unresolved
/// disputes guarantees at most one open/in-progress dispute per order; a
/// concurrent second open surfaces as a unique violation.
pub async fn insert_dispute(
    order_id: &OrderId,
    raised_by: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Dispute, DisputeError> {
    let res = sqlx::query_scalar::<_, i64>(
        "INSERT INTO disputes (order_id, raised_by, reason) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(order_id.as_str())
    .bind(raised_by)
    .bind(reason)
    .fetch_one(&mut *conn)
    .await;
    let id = match res {
        Ok(id) => id,
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(DisputeError::DisputeAlreadyOpen(order_id.clone()));
        },
        Err(e) => return Err(e.into()),
    };
    trace!("⚖️ Dispute #{id} opened against order {order_id} by {raised_by}");
    fetch_dispute(id, conn)
        .await?
        .ok_or_else(|| DisputeError::DatabaseError(format!("Dispute row {id} vanished straight after insertion")))
}

pub async fn fetch_dispute(dispute_id: i64, conn: &mut SqliteConnection) -> Result<Option<Dispute>, DisputeError> {
    let q = format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE id = $1");
    let dispute = sqlx::query_as::<_, Dispute>(&q).bind(dispute_id).fetch_optional(conn).await?;
    Ok(dispute)
}

/// The open or in-progress dispute for an order, if one exists. At most one
/// such row can exist at a time.
pub async fn fetch_blocking_dispute(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Dispute>, DisputeError> {
    let q = format!("SELECT {DISPUTE_COLUMNS} FROM disputes WHERE order_id = $1 AND status <> 'Resolved'");
    let dispute = sqlx::query_as::<_, Dispute>(&q).bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(dispute)
}

/// Conditional `Open` → `InProgress` transition.
pub async fn mark_in_progress(dispute_id: i64, conn: &mut SqliteConnection) -> Result<bool, DisputeError> {
    let res = sqlx::query("UPDATE disputes SET status = 'InProgress' WHERE id = $1 AND status = 'Open'")
        .bind(dispute_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() == 1)
}

/// Conditional resolution. Returns false if the dispute was already resolved,
/// so racing admins cannot adjudicate twice.
pub async fn mark_resolved(
    dispute_id: i64,
    outcome: DisputeOutcome,
    conn: &mut SqliteConnection,
) -> Result<bool, DisputeError> {
    let res = sqlx::query(
        "UPDATE disputes SET status = 'Resolved', outcome = $1, resolved_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND status <> 'Resolved'",
    )
    .bind(outcome.to_string())
    .bind(dispute_id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected() == 1)
}
