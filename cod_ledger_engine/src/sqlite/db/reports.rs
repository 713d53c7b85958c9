//! Read-only aggregations over `cash_collections`. Nothing in here reads the cached courier balances.
use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{CashCollection, Pagination},
    traits::{CollectionQueryFilter, CollectionTotals, CourierStatusTotal, SortOrder, StatusTotal},
};

/// Appends the `WHERE` clause for `filter`, if any.
fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &CollectionQueryFilter) {
    let is_empty = filter.courier_id.is_none()
        && filter.statuses.is_empty()
        && filter.collected_since.is_none()
        && filter.collected_until.is_none();
    if is_empty {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(courier) = filter.courier_id {
        where_clause.push("courier_id = ");
        where_clause.push_bind_unseparated(courier);
    }
    if !filter.statuses.is_empty() {
        where_clause.push("submission_status IN (");
        for (i, status) in filter.statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(*status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = filter.collected_since {
        where_clause.push("collected_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.collected_until {
        where_clause.push("collected_at < ");
        where_clause.push_bind_unseparated(until);
    }
}

pub async fn fetch_collections(
    filter: &CollectionQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<CashCollection>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM cash_collections");
    push_filter(&mut builder, filter);
    match filter.sort {
        SortOrder::NewestFirst => builder.push(" ORDER BY collected_at DESC, id DESC"),
        SortOrder::OldestFirst => builder.push(" ORDER BY COALESCE(submitted_at, collected_at) ASC, id ASC"),
    };
    builder.push(" LIMIT ").push_bind(pagination.count());
    builder.push(" OFFSET ").push_bind(pagination.offset());
    trace!("📊️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<CashCollection>().fetch_all(conn).await?;
    trace!("📊️ Result of fetch_collections: {}", rows.len());
    Ok(rows)
}

pub async fn collection_totals(
    filter: &CollectionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<CollectionTotals, sqlx::Error> {
    let mut builder =
        QueryBuilder::new("SELECT COUNT(*) AS count, COALESCE(SUM(amount), 0) AS amount FROM cash_collections");
    push_filter(&mut builder, filter);
    let totals = builder.build_query_as::<CollectionTotals>().fetch_one(conn).await?;
    Ok(totals)
}

pub async fn status_totals(
    filter: &CollectionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusTotal>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            submission_status AS status,
            COUNT(*) AS count,
            COALESCE(SUM(amount), 0) AS amount,
            COALESCE(SUM(submitted_amount), 0) AS submitted_amount
        FROM cash_collections
        "#,
    );
    push_filter(&mut builder, filter);
    builder.push(" GROUP BY submission_status");
    let mut rows = builder.build_query_as::<StatusTotal>().fetch_all(conn).await?;
    rows.sort_by_key(|r| r.status);
    Ok(rows)
}

pub async fn courier_status_totals(
    filter: &CollectionQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<CourierStatusTotal>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            courier_id,
            submission_status AS status,
            COUNT(*) AS count,
            COALESCE(SUM(amount), 0) AS amount,
            COALESCE(SUM(submitted_amount), 0) AS submitted_amount,
            COALESCE(SUM(CASE WHEN submission_status = 'discrepancy'
                THEN COALESCE(discrepancy_actual, 0) - COALESCE(discrepancy_expected, 0)
                ELSE 0 END), 0) AS discrepancy_delta
        FROM cash_collections
        "#,
    );
    push_filter(&mut builder, filter);
    builder.push(" GROUP BY courier_id, submission_status ORDER BY courier_id");
    let mut rows = builder.build_query_as::<CourierStatusTotal>().fetch_all(conn).await?;
    rows.sort_by_key(|r| (r.courier_id, r.status));
    Ok(rows)
}
