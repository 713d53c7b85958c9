use chrono::{DateTime, Utc};
use cod_common::Cents;

use crate::{
    db_types::{CashCollection, CollectionId, Courier, CourierId, NewCourier, OperatorId, Order, OrderId},
    helpers::SubmissionAllocation,
    traits::{
        data_objects::{
            CollectionOutcome,
            CollectionSelection,
            NewCashCollection,
            ReconciliationUpdate,
            SubmissionResult,
        },
        CashLedgerError,
    },
};

/// The cash-custody ledger.
///
/// Each mutating method is one store transaction covering the collection rows it touches and the courier balance
/// projection, so a failure never leaves a collection in an intermediate state or a balance out of step with its
/// rows.
#[allow(async_fn_in_trait)]
pub trait CashLedgerDatabase {
    async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, CashLedgerError>;

    async fn fetch_courier(&self, id: CourierId) -> Result<Option<Courier>, CashLedgerError>;

    async fn fetch_collection(&self, id: CollectionId) -> Result<Option<CashCollection>, CashLedgerError>;

    async fn fetch_collection_for_order(&self, order: OrderId) -> Result<Option<CashCollection>, CashLedgerError>;

    /// Records a pending collection and refreshes the courier balances.
    ///
    /// Idempotent per order: when a collection already exists it is returned as
    /// [`CollectionOutcome::AlreadyRecorded`] and nothing is written.
    async fn collect_cash(&self, collection: NewCashCollection) -> Result<CollectionOutcome, CashLedgerError>;

    /// Moves the selected pending collections of `courier` to `submitted`, spreading `submitted_amount` (default: the
    /// sum of the selected amounts) over them according to `allocation`.
    ///
    /// Fails with [`CashLedgerError::NoPendingCollections`] if nothing is selected.
    async fn submit_collections(
        &self,
        courier: CourierId,
        selection: &CollectionSelection,
        submitted_amount: Option<Cents>,
        deposit_proof: Option<String>,
        allocation: SubmissionAllocation,
        at: DateTime<Utc>,
    ) -> Result<SubmissionResult, CashLedgerError>;

    /// Writes a reconciliation decision if the collection is still `submitted`. Returns `None` otherwise.
    async fn apply_reconciliation(
        &self,
        id: CollectionId,
        update: &ReconciliationUpdate,
    ) -> Result<Option<CashCollection>, CashLedgerError>;

    /// Marks every `submitted` collection in `ids` as `reconciled`, without comparing amounts. Returns the rows that
    /// changed.
    async fn bulk_reconcile(
        &self,
        ids: &[CollectionId],
        operator: OperatorId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Vec<CashCollection>, CashLedgerError>;

    /// Delivered cash-on-delivery orders with a positive total that have no collection.
    async fn fetch_orders_missing_collection(&self) -> Result<Vec<Order>, CashLedgerError>;
}
