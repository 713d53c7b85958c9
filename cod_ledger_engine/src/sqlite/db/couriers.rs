use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{Courier, CourierBalances, CourierId, NewCourier};

pub async fn insert_courier(
    courier: NewCourier,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Courier, sqlx::Error> {
    let courier: Courier = sqlx::query_as(
        "INSERT INTO couriers (name, status, created_at, updated_at) VALUES ($1, $2, $3, $3) RETURNING *",
    )
    .bind(courier.name)
    .bind(courier.status)
    .bind(at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Courier {} ({}) created", courier.id, courier.name);
    Ok(courier)
}

pub async fn fetch_courier(id: CourierId, conn: &mut SqliteConnection) -> Result<Option<Courier>, sqlx::Error> {
    let courier = sqlx::query_as("SELECT * FROM couriers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(courier)
}

pub async fn fetch_couriers(conn: &mut SqliteConnection) -> Result<Vec<Courier>, sqlx::Error> {
    let couriers = sqlx::query_as("SELECT * FROM couriers ORDER BY id ASC").fetch_all(conn).await?;
    Ok(couriers)
}

/// Computes the courier's balances from the collection ledger.
///
/// * `pending_cash_submission` is the sum over pending rows.
/// * `cash_in_hand` is the same sum, plus the signed `actual - expected` difference of every discrepancy. A courier
///   who handed over less than expected ends up owing the difference.
/// * `total_cash_collected` covers every row, and `total_cash_submitted` the declared submission amounts of every row
///   that has left `pending`.
pub async fn compute_balances(id: CourierId, conn: &mut SqliteConnection) -> Result<CourierBalances, sqlx::Error> {
    let balances = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE submission_status
                WHEN 'pending' THEN amount
                WHEN 'discrepancy' THEN COALESCE(discrepancy_actual, 0) - COALESCE(discrepancy_expected, 0)
                ELSE 0 END), 0) AS cash_in_hand,
            COALESCE(SUM(amount), 0) AS total_cash_collected,
            COALESCE(SUM(CASE WHEN submission_status <> 'pending' THEN COALESCE(submitted_amount, 0) ELSE 0 END), 0)
                AS total_cash_submitted,
            COALESCE(SUM(CASE WHEN submission_status = 'pending' THEN amount ELSE 0 END), 0)
                AS pending_cash_submission
        FROM cash_collections
        WHERE courier_id = $1
        "#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(balances)
}

/// Rewrites the courier's cached balances from the ledger in a single aggregation statement. This is the only place
/// the cached fields are written. Returns `None` if the courier does not exist.
pub async fn refresh_balances(
    id: CourierId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<CourierBalances>, sqlx::Error> {
    let balances: Option<CourierBalances> = sqlx::query_as(
        r#"
        UPDATE couriers SET
            cash_in_hand = (
                SELECT COALESCE(SUM(CASE submission_status
                    WHEN 'pending' THEN amount
                    WHEN 'discrepancy' THEN COALESCE(discrepancy_actual, 0) - COALESCE(discrepancy_expected, 0)
                    ELSE 0 END), 0)
                FROM cash_collections WHERE courier_id = $1),
            total_cash_collected = (
                SELECT COALESCE(SUM(amount), 0) FROM cash_collections WHERE courier_id = $1),
            total_cash_submitted = (
                SELECT COALESCE(SUM(submitted_amount), 0) FROM cash_collections
                WHERE courier_id = $1 AND submission_status <> 'pending'),
            pending_cash_submission = (
                SELECT COALESCE(SUM(amount), 0) FROM cash_collections
                WHERE courier_id = $1 AND submission_status = 'pending'),
            balances_updated_at = $2,
            updated_at = $2
        WHERE id = $1
        RETURNING cash_in_hand, total_cash_collected, total_cash_submitted, pending_cash_submission
        "#,
    )
    .bind(id)
    .bind(at)
    .fetch_optional(conn)
    .await?;
    if let Some(b) = &balances {
        trace!(
            "🗃️ Balances for {id} refreshed. In hand: {}, pending: {}, collected: {}, submitted: {}",
            b.cash_in_hand,
            b.pending_cash_submission,
            b.total_cash_collected,
            b.total_cash_submitted
        );
    }
    Ok(balances)
}
