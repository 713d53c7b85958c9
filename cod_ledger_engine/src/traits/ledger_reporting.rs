use chrono::{DateTime, Utc};

use crate::{
    db_types::{CashCollection, Courier, CourierBalances, CourierId, Pagination},
    traits::{
        data_objects::{CollectionQueryFilter, CollectionTotals, CourierStatusTotal, StatusTotal},
        CashLedgerError,
    },
};

/// Read-side aggregations over the collection ledger.
#[allow(async_fn_in_trait)]
pub trait LedgerReporting {
    /// Recomputes the courier's balances from the collection rows. Never reads the cached courier fields.
    async fn compute_courier_balances(&self, courier: CourierId) -> Result<CourierBalances, CashLedgerError>;

    /// Rewrites the cached courier fields from the collection rows in a single statement and returns the new values.
    async fn refresh_courier_balances(
        &self,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<CourierBalances, CashLedgerError>;

    async fn fetch_couriers(&self) -> Result<Vec<Courier>, CashLedgerError>;

    async fn fetch_collections(
        &self,
        filter: &CollectionQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<CashCollection>, CashLedgerError>;

    async fn collection_totals(&self, filter: &CollectionQueryFilter) -> Result<CollectionTotals, CashLedgerError>;

    async fn status_totals(&self, filter: &CollectionQueryFilter) -> Result<Vec<StatusTotal>, CashLedgerError>;

    async fn courier_status_totals(
        &self,
        filter: &CollectionQueryFilter,
    ) -> Result<Vec<CourierStatusTotal>, CashLedgerError>;
}
