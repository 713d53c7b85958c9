use chrono::{DateTime, Utc};
use cod_common::Cents;
use log::{debug, trace};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{CashCollection, CollectionId, CourierId, OperatorId, OrderId, SubmissionStatus},
    traits::{CollectionOutcome, CollectionSelection, NewCashCollection, ReconciliationUpdate},
};

/// Inserts the collection unless one already exists for the order.
///
/// The insert is the uniqueness check: `ON CONFLICT(order_id) DO NOTHING` against the unique index means two
/// concurrent calls for the same order can never both create a row, and the loser reads back the winner's row.
pub async fn idempotent_insert(
    collection: NewCashCollection,
    conn: &mut SqliteConnection,
) -> Result<CollectionOutcome, sqlx::Error> {
    let inserted: Option<CashCollection> = sqlx::query_as(
        r#"
            INSERT INTO cash_collections (
                courier_id,
                order_id,
                order_number,
                amount,
                collected_at,
                submission_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $5, $5)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *
        "#,
    )
    .bind(collection.courier_id)
    .bind(collection.order_id)
    .bind(collection.order_number.as_str())
    .bind(collection.amount)
    .bind(collection.collected_at)
    .bind(SubmissionStatus::Pending)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(row) => {
            debug!("🗃️ Collection {} of {} recorded for order {}", row.id, row.amount, row.order_number);
            Ok(CollectionOutcome::Created(row))
        },
        None => {
            let existing = fetch_collection_for_order(collection.order_id, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            debug!("🗃️ Order {} already has collection {}. Nothing recorded.", collection.order_number, existing.id);
            Ok(CollectionOutcome::AlreadyRecorded(existing))
        },
    }
}

pub async fn fetch_collection(
    id: CollectionId,
    conn: &mut SqliteConnection,
) -> Result<Option<CashCollection>, sqlx::Error> {
    let row = sqlx::query_as("SELECT * FROM cash_collections WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(row)
}

pub async fn fetch_collection_for_order(
    order: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<CashCollection>, sqlx::Error> {
    let row =
        sqlx::query_as("SELECT * FROM cash_collections WHERE order_id = $1").bind(order).fetch_optional(conn).await?;
    Ok(row)
}

/// Moves the selected pending rows of the courier to `submitted`. Rows that are not pending, or belong to someone
/// else, are left alone. Returns the changed rows in collection order (earliest first).
pub(crate) async fn mark_submitted(
    courier: CourierId,
    selection: &CollectionSelection,
    deposit_proof: Option<String>,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CashCollection>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE cash_collections SET submission_status = ");
    builder.push_bind(SubmissionStatus::Submitted);
    builder.push(", submitted_at = ").push_bind(at);
    builder.push(", deposit_proof = ").push_bind(deposit_proof);
    builder.push(", updated_at = ").push_bind(at);
    builder.push(" WHERE courier_id = ").push_bind(courier);
    builder.push(" AND submission_status = ").push_bind(SubmissionStatus::Pending);
    if let CollectionSelection::Ids(ids) = selection {
        push_id_list(&mut builder, ids);
    }
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut rows = builder.build_query_as::<CashCollection>().fetch_all(conn).await?;
    rows.sort_by(|a, b| a.collected_at.cmp(&b.collected_at).then(a.id.cmp(&b.id)));
    Ok(rows)
}

pub(crate) async fn set_submitted_amount(
    id: CollectionId,
    amount: Cents,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cash_collections SET submitted_amount = $1 WHERE id = $2")
        .bind(amount)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Compare-and-set from `submitted` to the decided status. Returns `None` if the row is not `submitted` (or does not
/// exist).
pub(crate) async fn apply_reconciliation(
    id: CollectionId,
    update: &ReconciliationUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<CashCollection>, sqlx::Error> {
    let row = sqlx::query_as(
        r#"
            UPDATE cash_collections SET
                submission_status = $1,
                reconciled_at = $2,
                reconciled_by = $3,
                reconciliation_notes = $4,
                discrepancy_expected = $5,
                discrepancy_actual = $6,
                discrepancy_reason = $7,
                updated_at = $2
            WHERE id = $8 AND submission_status = $9
            RETURNING *
        "#,
    )
    .bind(update.status)
    .bind(update.reconciled_at)
    .bind(update.operator)
    .bind(update.notes.as_deref())
    .bind(update.expected)
    .bind(update.actual)
    .bind(update.reason.as_deref())
    .bind(id)
    .bind(SubmissionStatus::Submitted)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub(crate) async fn bulk_reconcile(
    ids: &[CollectionId],
    operator: OperatorId,
    notes: Option<String>,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<CashCollection>, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("UPDATE cash_collections SET submission_status = ");
    builder.push_bind(SubmissionStatus::Reconciled);
    builder.push(", reconciled_at = ").push_bind(at);
    builder.push(", reconciled_by = ").push_bind(operator);
    builder.push(", reconciliation_notes = ").push_bind(notes);
    builder.push(", updated_at = ").push_bind(at);
    builder.push(" WHERE submission_status = ").push_bind(SubmissionStatus::Submitted);
    push_id_list(&mut builder, ids);
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let mut rows = builder.build_query_as::<CashCollection>().fetch_all(conn).await?;
    rows.sort_by_key(|r| r.id);
    Ok(rows)
}

fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[CollectionId]) {
    builder.push(" AND id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
}
