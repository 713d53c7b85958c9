use chrono::{DateTime, Utc};
use cod_common::Secret;
use serde::Serialize;

use crate::{
    db_types::{CashCollection, Order, OrderId},
    traits::CollectionOutcome,
};

/// Published after an order reaches `delivered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
    pub collection: CollectionOutcome,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order, collection: CollectionOutcome) -> Self {
        Self { order, collection }
    }
}

/// Published when a new pending collection is written. Never published for an `AlreadyRecorded` outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashCollectedEvent {
    pub collection: CashCollection,
}

impl CashCollectedEvent {
    pub fn new(collection: CashCollection) -> Self {
        Self { collection }
    }
}

/// A confirmation code that must reach the customer. Published on issue and on every resend.
///
/// Delivering the code (SMS, email) is up to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationCodeIssuedEvent {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_ref: Option<String>,
    pub code: Secret<String>,
    pub expires_at: DateTime<Utc>,
    pub resend_count: i64,
}

impl ConfirmationCodeIssuedEvent {
    /// Returns `None` if the order carries no code.
    pub fn for_order(order: &Order) -> Option<Self> {
        let code = order.confirmation.code.clone()?;
        let expires_at = order.confirmation.expires_at?;
        Some(Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            customer_ref: order.customer_ref.clone(),
            code: Secret::new(code),
            expires_at,
            resend_count: order.confirmation.resend_count,
        })
    }

    pub fn is_resend(&self) -> bool {
        self.resend_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderDelivered(OrderDeliveredEvent),
    CashCollected(CashCollectedEvent),
    ConfirmationCodeIssued(ConfirmationCodeIssuedEvent),
}
