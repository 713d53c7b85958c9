//! `SqliteDatabase` is the concrete backend of the cash-on-delivery ledger.
//!
//! Unsurprisingly, it uses SQLite and implements all the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use cod_common::Cents;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::{
    db::{collections, couriers, db_url, delivery_records, new_pool, orders, reports},
    SqliteDatabaseError,
};
use crate::{
    db_types::{
        CashCollection,
        CollectionId,
        Courier,
        CourierBalances,
        CourierId,
        DeliveryRecord,
        NewCourier,
        NewDeliveryRecord,
        NewOrder,
        OperatorId,
        Order,
        OrderId,
        Pagination,
        TrackingEvent,
    },
    helpers::{allocate_submission, SubmissionAllocation},
    traits::{
        CashLedgerDatabase,
        CashLedgerError,
        CollectionOutcome,
        CollectionQueryFilter,
        CollectionSelection,
        CollectionTotals,
        ConfirmationCodeManagement,
        CourierStatusTotal,
        LedgerReporting,
        NewCashCollection,
        OrderManagement,
        ReconciliationUpdate,
        StatusTotal,
        SubmissionResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `COD_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies the embedded migrations. Safe to call on an up-to-date database.
    pub async fn run_migrations(&self) -> Result<(), SqliteDatabaseError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), CashLedgerError> {
        self.pool.close().await;
        Ok(())
    }

    async fn refresh_balances_in_tx(
        courier: CourierId,
        at: DateTime<Utc>,
        conn: &mut sqlx::SqliteConnection,
    ) -> Result<CourierBalances, CashLedgerError> {
        couriers::refresh_balances(courier, at, conn).await?.ok_or(CashLedgerError::CourierNotFound(courier))
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_number(order_number, &mut conn).await?;
        Ok(order)
    }

    async fn assign_courier(&self, id: OrderId, courier: CourierId) -> Result<Option<Order>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::assign_courier(id, courier, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn mark_picked_up(
        &self,
        id: OrderId,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::mark_picked_up(id, courier, at, &mut tx).await? else {
            trace!("🗃️ Order {id} was not picked up: the pickup conditions do not hold");
            return Ok(None);
        };
        orders::insert_tracking_event(&order, Some(courier), None, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {id} picked up by {courier}");
        Ok(Some(order))
    }

    /// The status write, the tracking event and the cash collection (with its balance refresh) are one transaction.
    /// If any step fails, none of them happened.
    async fn mark_delivered(
        &self,
        id: OrderId,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<Option<(Order, CollectionOutcome)>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::mark_delivered(id, courier, at, &mut tx).await? else {
            trace!("🗃️ Order {id} was not delivered: the delivery conditions do not hold");
            return Ok(None);
        };
        orders::insert_tracking_event(&order, Some(courier), None, &mut tx).await?;
        let outcome = if order.requires_cash_collection() {
            let collection = NewCashCollection::for_order(&order, courier, at);
            let outcome = collections::idempotent_insert(collection, &mut tx).await?;
            if outcome.is_created() {
                Self::refresh_balances_in_tx(courier, at, &mut tx).await?;
            }
            outcome
        } else {
            CollectionOutcome::NotApplicable
        };
        tx.commit().await?;
        debug!("🗃️ Order {id} delivered by {courier}");
        Ok(Some((order, outcome)))
    }

    async fn fetch_tracking_events(&self, id: OrderId) -> Result<Vec<TrackingEvent>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let events = orders::fetch_tracking_events(id, &mut conn).await?;
        Ok(events)
    }

    async fn insert_delivery_record(&self, record: NewDeliveryRecord) -> Result<DeliveryRecord, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let record = delivery_records::idempotent_insert(record, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn fetch_delivery_record(&self, id: OrderId) -> Result<Option<DeliveryRecord>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let record = delivery_records::fetch_for_order(id, &mut conn).await?;
        Ok(record)
    }
}

impl ConfirmationCodeManagement for SqliteDatabase {
    async fn issue_confirmation_code(
        &self,
        id: OrderId,
        code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::issue_confirmation_code(id, code, expires_at, now, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn record_confirmation_resend(
        &self,
        id: OrderId,
        max_resends: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::record_confirmation_resend(id, max_resends, now, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn mark_confirmation_verified(
        &self,
        id: OrderId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::mark_confirmation_verified(id, code, now, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }
}

impl CashLedgerDatabase for SqliteDatabase {
    async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let courier = couriers::insert_courier(courier, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(courier)
    }

    async fn fetch_courier(&self, id: CourierId) -> Result<Option<Courier>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let courier = couriers::fetch_courier(id, &mut conn).await?;
        Ok(courier)
    }

    async fn fetch_collection(&self, id: CollectionId) -> Result<Option<CashCollection>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let collection = collections::fetch_collection(id, &mut conn).await?;
        Ok(collection)
    }

    async fn fetch_collection_for_order(&self, order: OrderId) -> Result<Option<CashCollection>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let collection = collections::fetch_collection_for_order(order, &mut conn).await?;
        Ok(collection)
    }

    async fn collect_cash(&self, collection: NewCashCollection) -> Result<CollectionOutcome, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let courier = collection.courier_id;
        let at = collection.collected_at;
        let outcome = collections::idempotent_insert(collection, &mut tx).await?;
        if outcome.is_created() {
            Self::refresh_balances_in_tx(courier, at, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(outcome)
    }

    async fn submit_collections(
        &self,
        courier: CourierId,
        selection: &CollectionSelection,
        submitted_amount: Option<Cents>,
        deposit_proof: Option<String>,
        allocation: SubmissionAllocation,
        at: DateTime<Utc>,
    ) -> Result<SubmissionResult, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let mut rows = collections::mark_submitted(courier, selection, deposit_proof, at, &mut tx).await?;
        if rows.is_empty() {
            // Nothing was written, so dropping the transaction is enough
            return Err(CashLedgerError::NoPendingCollections);
        }
        let amounts = rows.iter().map(|r| r.amount).collect::<Vec<Cents>>();
        // Without a declared amount, every collection is handed over at face value
        let shares = match submitted_amount {
            Some(total) => allocate_submission(total, &amounts, allocation),
            None => amounts,
        };
        let total = shares.iter().sum::<Cents>();
        for (row, share) in rows.iter_mut().zip(shares) {
            collections::set_submitted_amount(row.id, share, &mut tx).await?;
            row.submitted_amount = Some(share);
        }
        let balances = Self::refresh_balances_in_tx(courier, at, &mut tx).await?;
        tx.commit().await?;
        let skipped = match selection {
            CollectionSelection::AllPending => Vec::new(),
            CollectionSelection::Ids(ids) => {
                ids.iter().filter(|id| !rows.iter().any(|r| r.id == **id)).copied().collect()
            },
        };
        debug!("🗃️ {courier} submitted {total} over {} collections ({allocation} allocation)", rows.len());
        Ok(SubmissionResult { courier_id: courier, submitted_amount: total, collections: rows, skipped, balances })
    }

    async fn apply_reconciliation(
        &self,
        id: CollectionId,
        update: &ReconciliationUpdate,
    ) -> Result<Option<CashCollection>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let Some(row) = collections::apply_reconciliation(id, update, &mut tx).await? else {
            return Ok(None);
        };
        Self::refresh_balances_in_tx(row.courier_id, update.reconciled_at, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Collection {id} is now {} (by {})", row.submission_status, update.operator);
        Ok(Some(row))
    }

    async fn bulk_reconcile(
        &self,
        ids: &[CollectionId],
        operator: OperatorId,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Vec<CashCollection>, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let rows = collections::bulk_reconcile(ids, operator, notes, at, &mut tx).await?;
        let mut affected = rows.iter().map(|r| r.courier_id).collect::<Vec<CourierId>>();
        affected.sort();
        affected.dedup();
        for courier in affected {
            Self::refresh_balances_in_tx(courier, at, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {operator} bulk-reconciled {} of {} collections", rows.len(), ids.len());
        Ok(rows)
    }

    async fn fetch_orders_missing_collection(&self) -> Result<Vec<Order>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_delivered_without_collection(&mut conn).await?;
        Ok(orders)
    }
}

impl LedgerReporting for SqliteDatabase {
    async fn compute_courier_balances(&self, courier: CourierId) -> Result<CourierBalances, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let balances = couriers::compute_balances(courier, &mut conn).await?;
        Ok(balances)
    }

    async fn refresh_courier_balances(
        &self,
        courier: CourierId,
        at: DateTime<Utc>,
    ) -> Result<CourierBalances, CashLedgerError> {
        let mut tx = self.pool.begin().await?;
        let balances = Self::refresh_balances_in_tx(courier, at, &mut tx).await?;
        tx.commit().await?;
        Ok(balances)
    }

    async fn fetch_couriers(&self) -> Result<Vec<Courier>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let couriers = couriers::fetch_couriers(&mut conn).await?;
        Ok(couriers)
    }

    async fn fetch_collections(
        &self,
        filter: &CollectionQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<CashCollection>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let rows = reports::fetch_collections(filter, pagination, &mut conn).await?;
        Ok(rows)
    }

    async fn collection_totals(&self, filter: &CollectionQueryFilter) -> Result<CollectionTotals, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let totals = reports::collection_totals(filter, &mut conn).await?;
        Ok(totals)
    }

    async fn status_totals(&self, filter: &CollectionQueryFilter) -> Result<Vec<StatusTotal>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let totals = reports::status_totals(filter, &mut conn).await?;
        Ok(totals)
    }

    async fn courier_status_totals(
        &self,
        filter: &CollectionQueryFilter,
    ) -> Result<Vec<CourierStatusTotal>, CashLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let totals = reports::courier_status_totals(filter, &mut conn).await?;
        Ok(totals)
    }
}
