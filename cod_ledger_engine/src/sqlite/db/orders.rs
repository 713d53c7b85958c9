use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{
    CourierId,
    NewOrder,
    Order,
    OrderId,
    OrderStatusType,
    PaymentMethod,
    TrackingEvent,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                status,
                payment_method,
                total_amount,
                delivery_fee,
                courier_id,
                customer_ref,
                restaurant_ref,
                delivery_zone,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *;
        "#,
    )
    .bind(order.order_number)
    .bind(order.status)
    .bind(order.payment_method)
    .bind(order.total_amount)
    .bind(order.delivery_fee)
    .bind(order.courier_id)
    .bind(order.customer_ref)
    .bind(order.restaurant_ref)
    .bind(order.delivery_zone)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted with id {}", order.order_number, order.id);
    Ok(order)
}

pub async fn fetch_order(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(
    order_number: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(order_number).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn assign_courier(
    id: OrderId,
    courier: CourierId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET courier_id = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(courier)
        .bind(at)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// `confirmed -> picked_up`, conditional on the status and the assigned courier.
pub(crate) async fn mark_picked_up(
    id: OrderId,
    courier: CourierId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, picked_up_at = $2, updated_at = $2
            WHERE id = $3 AND status = $4 AND courier_id = $5
            RETURNING *
        "#,
    )
    .bind(OrderStatusType::PickedUp)
    .bind(at)
    .bind(id)
    .bind(OrderStatusType::Confirmed)
    .bind(courier)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// `picked_up -> delivered`, conditional on the status, the assigned courier, and a verified confirmation code that
/// is still valid at `at`.
pub(crate) async fn mark_delivered(
    id: OrderId,
    courier: CourierId,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, delivered_at = $2, updated_at = $2
            WHERE id = $3
              AND status = $4
              AND courier_id = $5
              AND confirmation_verified = 1
              AND confirmation_expires_at > $2
            RETURNING *
        "#,
    )
    .bind(OrderStatusType::Delivered)
    .bind(at)
    .bind(id)
    .bind(OrderStatusType::PickedUp)
    .bind(courier)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn insert_tracking_event(
    order: &Order,
    actor: Option<CourierId>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TrackingEvent, sqlx::Error> {
    let event: TrackingEvent = sqlx::query_as(
        r#"
            INSERT INTO order_tracking (order_id, status, actor_courier_id, note, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(order.status)
    .bind(actor)
    .bind(note)
    .bind(order.updated_at)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Tracking event #{} recorded: order {} is {}", event.id, order.id, order.status);
    Ok(event)
}

pub async fn fetch_tracking_events(id: OrderId, conn: &mut SqliteConnection) -> Result<Vec<TrackingEvent>, sqlx::Error> {
    let events = sqlx::query_as("SELECT * FROM order_tracking WHERE order_id = $1 ORDER BY id ASC")
        .bind(id)
        .fetch_all(conn)
        .await?;
    Ok(events)
}

pub(crate) async fn issue_confirmation_code(
    id: OrderId,
    code: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                confirmation_code = $1,
                confirmation_expires_at = $2,
                confirmation_resend_count = 0,
                confirmation_verified = 0,
                confirmation_verified_at = NULL,
                updated_at = $3
            WHERE id = $4 AND status IN ($5, $6, $7)
            RETURNING *
        "#,
    )
    .bind(code)
    .bind(expires_at)
    .bind(now)
    .bind(id)
    .bind(OrderStatusType::Confirmed)
    .bind(OrderStatusType::Ready)
    .bind(OrderStatusType::PickedUp)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn record_confirmation_resend(
    id: OrderId,
    max_resends: i64,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET confirmation_resend_count = confirmation_resend_count + 1, updated_at = $1
            WHERE id = $2
              AND confirmation_code IS NOT NULL
              AND confirmation_verified = 0
              AND confirmation_expires_at > $1
              AND confirmation_resend_count < $3
            RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(max_resends)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub(crate) async fn mark_confirmation_verified(
    id: OrderId,
    code: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                confirmation_verified = 1,
                confirmation_verified_at = COALESCE(confirmation_verified_at, $1),
                updated_at = $1
            WHERE id = $2 AND confirmation_code = $3 AND confirmation_expires_at > $1
            RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// Delivered cash-on-delivery orders with a positive total and no cash collection. These are the orders a repair pass
/// needs to collect for.
pub async fn fetch_delivered_without_collection(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
            SELECT o.* FROM orders o
            LEFT JOIN cash_collections c ON c.order_id = o.id
            WHERE o.status = $1 AND o.payment_method = $2 AND o.total_amount > 0 AND o.courier_id IS NOT NULL
              AND c.id IS NULL
            ORDER BY o.delivered_at ASC
        "#,
    )
    .bind(OrderStatusType::Delivered)
    .bind(PaymentMethod::CashOnDelivery)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
