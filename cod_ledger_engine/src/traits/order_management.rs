use chrono::{DateTime, Utc};

use crate::{
    db_types::{CourierId, DeliveryRecord, NewDeliveryRecord, NewOrder, Order, OrderId, TrackingEvent},
    traits::{data_objects::CollectionOutcome, CashLedgerError},
};

/// Order storage and the courier-driven status transitions.
///
/// Every transition is a compare-and-set on the previous status. When the condition does not hold, the methods return
/// `Ok(None)` and write nothing; the caller re-reads the order to explain why.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores an order written by the placement service. Order numbers are unique.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, CashLedgerError>;

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CashLedgerError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, CashLedgerError>;

    /// Dispatch assigns a courier to an order. Returns `None` if the order does not exist.
    async fn assign_courier(&self, id: OrderId, courier: CourierId) -> Result<Option<Order>, CashLedgerError>;

    /// `confirmed -> picked_up` for the assigned courier. Stamps `picked_up_at` and appends a tracking event.
    async fn mark_picked_up(
        &self,
        id: OrderId,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError>;

    /// `picked_up -> delivered` for the assigned courier, gated on a verified confirmation code that is unexpired at
    /// `at`. In the same transaction, appends a tracking event and, for cash-on-delivery orders with a positive total,
    /// records the cash collection and refreshes the courier balances.
    async fn mark_delivered(
        &self,
        id: OrderId,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<Option<(Order, CollectionOutcome)>, CashLedgerError>;

    async fn fetch_tracking_events(&self, id: OrderId) -> Result<Vec<TrackingEvent>, CashLedgerError>;

    /// Writes the delivery snapshot. Idempotent per order: an existing record is returned unchanged.
    async fn insert_delivery_record(&self, record: NewDeliveryRecord) -> Result<DeliveryRecord, CashLedgerError>;

    async fn fetch_delivery_record(&self, id: OrderId) -> Result<Option<DeliveryRecord>, CashLedgerError>;
}
