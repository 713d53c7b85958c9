use std::fmt::Debug;

use chrono::{DateTime, Utc};
use cod_common::Cents;
use log::*;

use crate::{
    db_types::{
        CashCollection,
        CollectionId,
        CourierId,
        OperatorId,
        OrderId,
        OrderStatusType,
        PaymentMethod,
        SubmissionStatus,
    },
    events::{CashCollectedEvent, EventProducers},
    helpers::{with_retries, RetryPolicy, SubmissionAllocation},
    traits::{
        BulkReconcileResult,
        CashLedgerDatabase,
        CashLedgerError,
        CollectionOutcome,
        CollectionSelection,
        NewCashCollection,
        OrderManagement,
        ReconciliationUpdate,
        SubmissionResult,
    },
};

/// `CashLedgerApi` manages the life of a cash collection: recording it, handing it over to the operator and having
/// the operator reconcile it.
///
/// ```text
///  pending ──submit──> submitted ──reconcile──> reconciled
///                                    └────────> discrepancy
/// ```
///
/// Every write also refreshes the courier's cached balances in the same transaction.
pub struct CashLedgerApi<B> {
    db: B,
    producers: EventProducers,
    allocation: SubmissionAllocation,
    retry: RetryPolicy,
}

impl<B> Debug for CashLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CashLedgerApi ({} allocation, {:?})", self.allocation, self.retry)
    }
}

impl<B> CashLedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, allocation: SubmissionAllocation::default(), retry: RetryPolicy::default() }
    }

    pub fn with_allocation(mut self, allocation: SubmissionAllocation) -> Self {
        self.allocation = allocation;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn allocation(&self) -> SubmissionAllocation {
        self.allocation
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CashLedgerApi<B>
where B: CashLedgerDatabase + OrderManagement
{
    /// Records the cash for a delivered order, on behalf of the courier that delivered it.
    ///
    /// Normally the collection already exists, because the `delivered` transition writes it. In that case the existing
    /// collection is returned as [`CollectionOutcome::AlreadyRecorded`].
    pub async fn collect_for_order(
        &self,
        order_id: OrderId,
        courier: CourierId,
    ) -> Result<CollectionOutcome, CashLedgerError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(CashLedgerError::OrderNotFound(order_id))?;
        if !order.is_assigned_to(courier) {
            return Err(CashLedgerError::NotAssignedCourier { order: order_id, courier });
        }
        if order.status != OrderStatusType::Delivered {
            return Err(CashLedgerError::OrderNotDelivered(order_id));
        }
        if order.payment_method != PaymentMethod::CashOnDelivery {
            return Err(CashLedgerError::ValidationError(format!(
                "Order {} was paid by {}. There is no cash to collect",
                order.order_number, order.payment_method
            )));
        }
        self.collect(NewCashCollection::for_order(&order, courier, Utc::now())).await
    }

    /// Records a pending collection unless the order already has one. Safe to call any number of times, including
    /// concurrently: the order ends up with exactly one collection, and the courier's balances change once.
    pub async fn collect(&self, collection: NewCashCollection) -> Result<CollectionOutcome, CashLedgerError> {
        if !collection.amount.is_positive() {
            return Err(CashLedgerError::ValidationError(format!(
                "A cash collection must be for a positive amount, not {}",
                collection.amount
            )));
        }
        let label = format!("collect cash for {}", collection.order_id);
        let outcome = with_retries(&self.retry, &label, || self.db.collect_cash(collection.clone())).await?;
        match &outcome {
            CollectionOutcome::Created(c) => {
                info!("💵️ {} collected {} for order {}", c.courier_id, c.amount, c.order_number);
                self.producers.publish_cash_collected(CashCollectedEvent::new(c.clone())).await;
            },
            CollectionOutcome::AlreadyRecorded(c) => {
                info!("💵️ Cash for order {} was already recorded as {}", c.order_number, c.id);
            },
            CollectionOutcome::NotApplicable => {},
        }
        Ok(outcome)
    }

    /// Hands the selected pending collections over to the operator.
    ///
    /// `submitted_amount` is what the courier declares to have handed over. It defaults to the sum of the selected
    /// collections, and is spread across them according to the configured [`SubmissionAllocation`]. Collection ids
    /// that are not pending collections of this courier are skipped and reported in the result.
    pub async fn submit(
        &self,
        courier: CourierId,
        selection: CollectionSelection,
        submitted_amount: Option<Cents>,
        deposit_proof: Option<String>,
    ) -> Result<SubmissionResult, CashLedgerError> {
        if let Some(amount) = submitted_amount {
            if amount.is_negative() {
                return Err(CashLedgerError::ValidationError(format!(
                    "The submitted amount cannot be negative ({amount})"
                )));
            }
        }
        let now = Utc::now();
        let label = format!("submit cash for {courier}");
        let result = with_retries(&self.retry, &label, || {
            self.db.submit_collections(courier, &selection, submitted_amount, deposit_proof.clone(), self.allocation, now)
        })
        .await?;
        info!(
            "💵️ {courier} submitted {} over {} collections. Cash in hand is now {}",
            result.submitted_amount,
            result.collections.len(),
            result.balances.cash_in_hand
        );
        if !result.skipped.is_empty() {
            warn!("💵️ {} requested collections were not pending for {courier} and were skipped", result.skipped.len());
        }
        Ok(result)
    }

    /// Settles a submitted collection against the cash the operator actually received.
    ///
    /// See [`decide_reconciliation`] for how the outcome is chosen.
    pub async fn reconcile(
        &self,
        id: CollectionId,
        operator: OperatorId,
        actual_amount: Option<Cents>,
        notes: Option<String>,
        target_status: Option<SubmissionStatus>,
    ) -> Result<CashCollection, CashLedgerError> {
        let collection = self.db.fetch_collection(id).await?.ok_or(CashLedgerError::CollectionNotFound(id))?;
        let update = decide_reconciliation(&collection, operator, actual_amount, notes, target_status, Utc::now())?;
        let label = format!("reconcile {id}");
        let updated = with_retries(&self.retry, &label, || self.db.apply_reconciliation(id, &update)).await?;
        match updated {
            Some(c) => {
                match c.discrepancy() {
                    Some(d) => warn!(
                        "💵️ Discrepancy on {id} ({}): expected {}, received {}",
                        c.courier_id, d.expected, d.actual
                    ),
                    None => info!("💵️ {id} reconciled by {operator}"),
                }
                Ok(c)
            },
            None => {
                let current = self.db.fetch_collection(id).await?.ok_or(CashLedgerError::CollectionNotFound(id))?;
                Err(CashLedgerError::InvalidCollectionTransition {
                    id,
                    from: current.submission_status,
                    to: update.status,
                })
            },
        }
    }

    /// Marks every `submitted` collection in `ids` as reconciled, without comparing amounts. Anything else is skipped.
    pub async fn bulk_reconcile(
        &self,
        ids: &[CollectionId],
        operator: OperatorId,
        notes: Option<String>,
    ) -> Result<BulkReconcileResult, CashLedgerError> {
        if ids.is_empty() {
            return Err(CashLedgerError::ValidationError("No collections were given to reconcile".into()));
        }
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        let now = Utc::now();
        let label = format!("bulk reconcile {} collections", ids.len());
        let rows = with_retries(&self.retry, &label, || self.db.bulk_reconcile(&ids, operator, notes.clone(), now)).await?;
        let reconciled = rows.iter().map(|c| c.id).collect::<Vec<CollectionId>>();
        let skipped = ids.into_iter().filter(|id| !reconciled.contains(id)).collect::<Vec<CollectionId>>();
        info!("💵️ {operator} bulk-reconciled {} collections. {} skipped", reconciled.len(), skipped.len());
        Ok(BulkReconcileResult { reconciled, skipped })
    }

    /// Finds delivered cash-on-delivery orders that have no collection, and records one for each.
    ///
    /// The `delivered` transition writes the collection atomically, so this only finds orders that were delivered by
    /// another path. Running it repeatedly is harmless.
    pub async fn repair_missing_collections(&self) -> Result<Vec<CollectionOutcome>, CashLedgerError> {
        let orders = self.db.fetch_orders_missing_collection().await?;
        if orders.is_empty() {
            debug!("💵️ No delivered orders are missing a cash collection");
            return Ok(Vec::new());
        }
        warn!("💵️ {} delivered orders have no cash collection. Repairing.", orders.len());
        let mut outcomes = Vec::with_capacity(orders.len());
        for order in orders {
            let Some(courier) = order.courier_id else {
                error!("💵️ Order {} was delivered without a courier. It cannot be repaired.", order.order_number);
                continue;
            };
            let collected_at = order.delivered_at.unwrap_or_else(Utc::now);
            let outcome = self.collect(NewCashCollection::for_order(&order, courier, collected_at)).await?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

/// Decides how a reconciliation request settles a collection.
///
/// * Only `submitted` collections can be reconciled.
/// * The expected amount is the declared submission amount, or the collected amount if none was declared.
/// * `actual_amount` defaults to the expected amount.
/// * Equal amounts reconcile. Different amounts record a discrepancy, with `notes` (or a generated description) as the
///   reason.
/// * `target_status` of `discrepancy` forces a discrepancy even on equal amounts. `reconciled` with different amounts
///   is refused, as is any other target.
pub fn decide_reconciliation(
    collection: &CashCollection,
    operator: OperatorId,
    actual_amount: Option<Cents>,
    notes: Option<String>,
    target_status: Option<SubmissionStatus>,
    now: DateTime<Utc>,
) -> Result<ReconciliationUpdate, CashLedgerError> {
    let requested = target_status.unwrap_or(SubmissionStatus::Reconciled);
    if !requested.is_terminal() {
        return Err(CashLedgerError::ValidationError(format!(
            "A reconciliation can only end in reconciled or discrepancy, not {requested}"
        )));
    }
    if !collection.submission_status.can_transition_to(requested) {
        return Err(CashLedgerError::InvalidCollectionTransition {
            id: collection.id,
            from: collection.submission_status,
            to: requested,
        });
    }
    let expected = collection.expected_amount();
    let actual = actual_amount.unwrap_or(expected);
    if actual.is_negative() {
        return Err(CashLedgerError::ValidationError(format!("The received amount cannot be negative ({actual})")));
    }
    let status = match (target_status, actual == expected) {
        (Some(SubmissionStatus::Reconciled), false) => {
            return Err(CashLedgerError::ValidationError(format!(
                "Cannot mark {} as reconciled: expected {expected}, received {actual}",
                collection.id
            )));
        },
        (Some(SubmissionStatus::Discrepancy), _) | (_, false) => SubmissionStatus::Discrepancy,
        _ => SubmissionStatus::Reconciled,
    };
    let update = match status {
        SubmissionStatus::Discrepancy => {
            let reason = notes
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("Expected {expected}, received {actual}"));
            ReconciliationUpdate {
                status,
                operator,
                notes,
                expected: Some(expected),
                actual: Some(actual),
                reason: Some(reason),
                reconciled_at: now,
            }
        },
        _ => ReconciliationUpdate {
            status,
            operator,
            notes,
            expected: None,
            actual: None,
            reason: None,
            reconciled_at: now,
        },
    };
    Ok(update)
}
