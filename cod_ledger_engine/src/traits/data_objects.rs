use chrono::{DateTime, Utc};
use cod_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db_types::{
    CashCollection,
    CollectionId,
    CourierBalances,
    CourierId,
    OperatorId,
    Order,
    OrderId,
    SubmissionStatus,
};

/// The result of recording cash for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "ledger", content = "collection", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// The order does not put cash in the courier's hands (not cash-on-delivery, or a zero total).
    NotApplicable,
    /// A new pending collection was written and the courier balances were updated.
    Created(CashCollection),
    /// A collection already existed for the order. Nothing changed.
    AlreadyRecorded(CashCollection),
}

impl CollectionOutcome {
    pub fn collection(&self) -> Option<&CashCollection> {
        match self {
            Self::NotApplicable => None,
            Self::Created(c) | Self::AlreadyRecorded(c) => Some(c),
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

#[derive(Debug, Clone)]
pub struct NewCashCollection {
    pub courier_id: CourierId,
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Cents,
    pub collected_at: DateTime<Utc>,
}

impl NewCashCollection {
    pub fn for_order(order: &Order, courier_id: CourierId, collected_at: DateTime<Utc>) -> Self {
        Self {
            courier_id,
            order_id: order.id,
            order_number: order.order_number.clone(),
            amount: order.total_amount,
            collected_at,
        }
    }
}

/// Which pending collections a submission covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSelection {
    AllPending,
    Ids(Vec<CollectionId>),
}

impl CollectionSelection {
    /// An absent or empty id list means "everything pending".
    pub fn from_ids(ids: Option<Vec<CollectionId>>) -> Self {
        match ids {
            Some(ids) if !ids.is_empty() => Self::Ids(ids),
            _ => Self::AllPending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub courier_id: CourierId,
    pub submitted_amount: Cents,
    pub collections: Vec<CashCollection>,
    /// Requested ids that were not pending collections of this courier.
    pub skipped: Vec<CollectionId>,
    pub balances: CourierBalances,
}

/// A decided reconciliation, ready to be written with a compare-and-set on `submitted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationUpdate {
    pub status: SubmissionStatus,
    pub operator: OperatorId,
    pub notes: Option<String>,
    pub expected: Option<Cents>,
    pub actual: Option<Cents>,
    pub reason: Option<String>,
    pub reconciled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReconcileResult {
    pub reconciled: Vec<CollectionId>,
    /// Requested ids that were not in the `submitted` state (or do not exist).
    pub skipped: Vec<CollectionId>,
}

impl BulkReconcileResult {
    pub fn count(&self) -> usize {
        self.reconciled.len()
    }
}

//--------------------------------------  Query and aggregate rows  ---------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Selects collections for the reporting queries. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct CollectionQueryFilter {
    pub courier_id: Option<CourierId>,
    pub statuses: Vec<SubmissionStatus>,
    pub collected_since: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub collected_until: Option<DateTime<Utc>>,
    pub sort: SortOrder,
}

impl CollectionQueryFilter {
    pub fn with_courier(mut self, courier: CourierId) -> Self {
        self.courier_id = Some(courier);
        self
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn collected_between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.collected_since = Some(since);
        self.collected_until = Some(until);
        self
    }

    /// Orders by submission time, oldest first. Used for the reconciliation queue.
    pub fn oldest_first(mut self) -> Self {
        self.sort = SortOrder::OldestFirst;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct CollectionTotals {
    pub count: i64,
    pub amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct StatusTotal {
    pub status: SubmissionStatus,
    pub count: i64,
    pub amount: Cents,
    pub submitted_amount: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CourierStatusTotal {
    pub courier_id: CourierId,
    pub status: SubmissionStatus,
    pub count: i64,
    pub amount: Cents,
    pub submitted_amount: Cents,
    /// `Σ (actual - expected)` over discrepancy rows. Zero for the other statuses.
    pub discrepancy_delta: Cents,
}
