use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{CourierId, DeliveryConfirmation, NewDeliveryRecord, Order, OrderId, OrderStatusType},
    events::{CashCollectedEvent, ConfirmationCodeIssuedEvent, EventProducers, OrderDeliveredEvent},
    helpers::{generate_confirmation_code, with_retries, ConfirmationCodePolicy, RetryPolicy},
    ledger_api::ledger_objects::DeliveryOutcome,
    traits::{CashLedgerError, CollectionOutcome, ConfirmationCodeManagement, OrderManagement},
};

/// `DeliveryFlowApi` drives the courier side of order fulfilment: the `picked_up` and `delivered` transitions, and the
/// customer's delivery-confirmation code that gates the latter.
///
/// Cash for a cash-on-delivery order is recorded in the same store transaction as the `delivered` status write, so an
/// order can never be delivered without its collection (or vice versa).
pub struct DeliveryFlowApi<B> {
    db: B,
    producers: EventProducers,
    code_policy: ConfirmationCodePolicy,
    retry: RetryPolicy,
}

impl<B> Debug for DeliveryFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeliveryFlowApi ({:?}, {:?})", self.code_policy, self.retry)
    }
}

impl<B> DeliveryFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, code_policy: ConfirmationCodePolicy::default(), retry: RetryPolicy::default() }
    }

    pub fn with_code_policy(mut self, policy: ConfirmationCodePolicy) -> Self {
        self.code_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> DeliveryFlowApi<B>
where B: OrderManagement + ConfirmationCodeManagement
{
    async fn fetch_assigned_order(&self, id: OrderId, courier: CourierId) -> Result<Order, CashLedgerError> {
        let order = self.db.fetch_order(id).await?.ok_or(CashLedgerError::OrderNotFound(id))?;
        if !order.is_assigned_to(courier) {
            return Err(CashLedgerError::NotAssignedCourier { order: id, courier });
        }
        Ok(order)
    }

    /// Moves an order along the courier part of its lifecycle.
    ///
    /// | From \ To  | picked_up | delivered |
    /// |------------|-----------|-----------|
    /// | confirmed  | Ok        | Err       |
    /// | picked_up  | Err       | 1         |
    /// | (other)    | Err       | Err       |
    ///
    /// (1) Requires a verified, unexpired confirmation code. For a cash-on-delivery order with a positive total, the
    /// cash collection is written in the same transaction, and the courier's balances are refreshed.
    ///
    /// Only the assigned courier may move the order. Every status write is a compare-and-set on the previous status,
    /// so of two identical concurrent requests, exactly one succeeds and the other gets `InvalidOrderTransition`.
    ///
    /// After a delivery, a delivery record is written on a best-effort basis, and `OrderDelivered` (and, if cash was
    /// recorded, `CashCollected`) events are published.
    pub async fn update_order_status(
        &self,
        id: OrderId,
        courier: CourierId,
        new_status: OrderStatusType,
    ) -> Result<DeliveryOutcome, CashLedgerError> {
        let order = self.fetch_assigned_order(id, courier).await?;
        let now = Utc::now();
        check_courier_transition(&order, courier, new_status, now)?;
        match new_status {
            OrderStatusType::PickedUp => {
                let label = format!("pick up {id}");
                let updated = with_retries(&self.retry, &label, || self.db.mark_picked_up(id, courier, now)).await?;
                let order = match updated {
                    Some(order) => order,
                    None => return Err(self.diagnose_transition(id, courier, new_status, now).await),
                };
                info!("🚚️ Order {} picked up by {courier}", order.order_number);
                Ok(DeliveryOutcome::new(order, CollectionOutcome::NotApplicable))
            },
            OrderStatusType::Delivered => {
                let label = format!("deliver {id}");
                let updated = with_retries(&self.retry, &label, || self.db.mark_delivered(id, courier, now)).await?;
                let (order, collection) = match updated {
                    Some(result) => result,
                    None => return Err(self.diagnose_transition(id, courier, new_status, now).await),
                };
                self.after_delivery(&order, &collection).await;
                let outcome = DeliveryOutcome::new(order, collection);
                info!("🚚️ Order {} delivered by {courier}. {}", outcome.order.order_number, outcome.ledger_message());
                Ok(outcome)
            },
            to => Err(CashLedgerError::InvalidOrderTransition { from: order.status, to }),
        }
    }

    /// A compare-and-set found the order in a different state than the pre-checks did. Re-read it and report why.
    async fn diagnose_transition(
        &self,
        id: OrderId,
        courier: CourierId,
        to: OrderStatusType,
        now: DateTime<Utc>,
    ) -> CashLedgerError {
        let current = match self.fetch_assigned_order(id, courier).await {
            Ok(order) => order,
            Err(e) => return e,
        };
        match check_courier_transition(&current, courier, to, now) {
            Err(e) => e,
            Ok(()) => CashLedgerError::InvalidOrderTransition { from: current.status, to },
        }
    }

    async fn after_delivery(&self, order: &Order, collection: &CollectionOutcome) {
        let collection_id = collection.collection().map(|c| c.id);
        match NewDeliveryRecord::from_order(order, collection_id) {
            Some(record) => {
                if let Err(e) = self.db.insert_delivery_record(record).await {
                    warn!("🚚️ Could not save the delivery record for order {}. {e}", order.order_number);
                }
            },
            None => warn!("🚚️ Order {} is delivered, but has no courier or delivery time", order.order_number),
        }
        if let CollectionOutcome::Created(c) = collection {
            self.producers.publish_cash_collected(CashCollectedEvent::new(c.clone())).await;
        }
        self.producers.publish_order_delivered(OrderDeliveredEvent::new(order.clone(), collection.clone())).await;
    }

    /// Issues a fresh confirmation code for the order and publishes it for delivery to the customer.
    ///
    /// Any previous code is replaced, the resend count is reset and the order is no longer verified.
    pub async fn send_confirmation_code(&self, id: OrderId, courier: CourierId) -> Result<Order, CashLedgerError> {
        let order = self.fetch_assigned_order(id, courier).await?;
        check_code_issuable(&order)?;
        let code = generate_confirmation_code();
        let now = Utc::now();
        let expires_at = now + self.code_policy.ttl;
        let label = format!("issue code for {id}");
        let updated = with_retries(&self.retry, &label, || {
            self.db.issue_confirmation_code(id, code.as_str(), expires_at, now)
        })
        .await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let current = self.fetch_assigned_order(id, courier).await?;
                check_code_issuable(&current)?;
                return Err(CashLedgerError::InvalidOrderTransition {
                    from: current.status,
                    to: OrderStatusType::Delivered,
                });
            },
        };
        debug!("🚚️ Confirmation code issued for order {}. Expires at {expires_at}", order.order_number);
        self.publish_code(&order).await;
        Ok(order)
    }

    /// Re-publishes the outstanding code. The code and its expiry do not change.
    pub async fn resend_confirmation_code(&self, id: OrderId, courier: CourierId) -> Result<Order, CashLedgerError> {
        let order = self.fetch_assigned_order(id, courier).await?;
        let now = Utc::now();
        let max_resends = self.code_policy.max_resends;
        check_resend(&order.confirmation, max_resends, now)?;
        let label = format!("resend code for {id}");
        let updated =
            with_retries(&self.retry, &label, || self.db.record_confirmation_resend(id, max_resends, now)).await?;
        let order = match updated {
            Some(order) => order,
            None => {
                let current = self.fetch_assigned_order(id, courier).await?;
                check_resend(&current.confirmation, max_resends, now)?;
                return Err(CashLedgerError::ResendLimitReached(current.confirmation.resend_count));
            },
        };
        debug!(
            "🚚️ Confirmation code for order {} resent ({}/{max_resends})",
            order.order_number, order.confirmation.resend_count
        );
        self.publish_code(&order).await;
        Ok(order)
    }

    /// Checks the code the customer gave the courier. Verifying an already verified order with the right code succeeds
    /// and keeps the original verification time.
    pub async fn verify_confirmation_code(
        &self,
        id: OrderId,
        courier: CourierId,
        code: &str,
    ) -> Result<Order, CashLedgerError> {
        let order = self.fetch_assigned_order(id, courier).await?;
        let now = Utc::now();
        let code = code.trim();
        check_code(&order.confirmation, code, now)?;
        let label = format!("verify code for {id}");
        let updated = with_retries(&self.retry, &label, || self.db.mark_confirmation_verified(id, code, now)).await?;
        match updated {
            Some(order) => {
                info!("🚚️ Delivery of order {} confirmed by the customer", order.order_number);
                Ok(order)
            },
            None => {
                let current = self.fetch_assigned_order(id, courier).await?;
                check_code(&current.confirmation, code, now)?;
                Err(CashLedgerError::ConfirmationCodeMismatch)
            },
        }
    }

    async fn publish_code(&self, order: &Order) {
        match ConfirmationCodeIssuedEvent::for_order(order) {
            Some(event) => self.producers.publish_code_issued(event).await,
            None => error!("🚚️ Order {} should carry a confirmation code, but has none", order.order_number),
        }
    }
}

/// Checks everything about a courier-driven transition that can be known without writing.
pub fn check_courier_transition(
    order: &Order,
    courier: CourierId,
    to: OrderStatusType,
    now: DateTime<Utc>,
) -> Result<(), CashLedgerError> {
    if !order.is_assigned_to(courier) {
        return Err(CashLedgerError::NotAssignedCourier { order: order.id, courier });
    }
    if !order.status.courier_can_transition_to(to) {
        return Err(CashLedgerError::InvalidOrderTransition { from: order.status, to });
    }
    if to == OrderStatusType::Delivered && !order.confirmation.permits_delivery(now) {
        return Err(CashLedgerError::DeliveryNotConfirmed(order.id));
    }
    Ok(())
}

pub fn check_code_issuable(order: &Order) -> Result<(), CashLedgerError> {
    if order.status.accepts_confirmation_code() {
        Ok(())
    } else {
        Err(CashLedgerError::InvalidOrderTransition { from: order.status, to: OrderStatusType::Delivered })
    }
}

pub fn check_resend(
    confirmation: &DeliveryConfirmation,
    max_resends: i64,
    now: DateTime<Utc>,
) -> Result<(), CashLedgerError> {
    if !confirmation.is_issued() {
        return Err(CashLedgerError::NoConfirmationCode);
    }
    if confirmation.verified {
        return Err(CashLedgerError::ValidationError("The confirmation code has already been verified".into()));
    }
    if confirmation.is_expired(now) {
        return Err(CashLedgerError::ConfirmationCodeExpired);
    }
    if confirmation.resend_count >= max_resends {
        return Err(CashLedgerError::ResendLimitReached(confirmation.resend_count));
    }
    Ok(())
}

pub fn check_code(confirmation: &DeliveryConfirmation, code: &str, now: DateTime<Utc>) -> Result<(), CashLedgerError> {
    let Some(expected) = confirmation.code.as_deref() else {
        return Err(CashLedgerError::NoConfirmationCode);
    };
    if expected != code {
        return Err(CashLedgerError::ConfirmationCodeMismatch);
    }
    if confirmation.is_expired(now) {
        return Err(CashLedgerError::ConfirmationCodeExpired);
    }
    Ok(())
}
