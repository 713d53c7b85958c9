use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{DeliveryRecord, NewDeliveryRecord, OrderId};

/// Inserts the delivery snapshot, or returns the one already stored for the order.
pub async fn idempotent_insert(
    record: NewDeliveryRecord,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DeliveryRecord, sqlx::Error> {
    let inserted: Option<DeliveryRecord> = sqlx::query_as(
        r#"
            INSERT INTO delivery_records (
                order_id,
                order_number,
                courier_id,
                customer_ref,
                restaurant_ref,
                delivery_zone,
                payment_method,
                total_amount,
                delivery_fee,
                cash_collection_id,
                delivered_at,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *
        "#,
    )
    .bind(record.order_id)
    .bind(record.order_number.as_str())
    .bind(record.courier_id)
    .bind(record.customer_ref.as_deref())
    .bind(record.restaurant_ref.as_deref())
    .bind(record.delivery_zone.as_deref())
    .bind(record.payment_method)
    .bind(record.total_amount)
    .bind(record.delivery_fee)
    .bind(record.cash_collection_id)
    .bind(record.delivered_at)
    .bind(at)
    .fetch_optional(&mut *conn)
    .await?;
    match inserted {
        Some(r) => {
            debug!("🗃️ Delivery record #{} saved for order {}", r.id, r.order_number);
            Ok(r)
        },
        None => fetch_for_order(record.order_id, conn).await?.ok_or(sqlx::Error::RowNotFound),
    }
}

pub async fn fetch_for_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<DeliveryRecord>, sqlx::Error> {
    let record =
        sqlx::query_as("SELECT * FROM delivery_records WHERE order_id = $1").bind(id).fetch_optional(conn).await?;
    Ok(record)
}
