use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use cod_common::Cents;
use log::*;

use crate::{
    db_types::{CashCollection, CourierId, Pagination, SubmissionStatus, MAX_PAGE_SIZE},
    ledger_api::ledger_objects::{CashReport, CourierDashboardEntry, CourierSummary, Page, StatusReport},
    traits::{CashLedgerDatabase, CashLedgerError, CollectionQueryFilter, CollectionTotals, LedgerReporting},
};

const RECENT_PENDING_LIMIT: i64 = 10;

/// Read-only views of the ledger for couriers and operators.
///
/// Every figure is computed from the collection rows. The cached courier balances are only read to detect drift,
/// which is then repaired.
pub struct ReportingApi<B> {
    db: B,
}

impl<B> Debug for ReportingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReportingApi")
    }
}

impl<B> ReportingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ReportingApi<B>
where B: LedgerReporting + CashLedgerDatabase
{
    /// The courier's balances, pending collections and counts per status.
    ///
    /// If the cached balances on the courier disagree with the ledger, they are rewritten. The response always carries
    /// the values computed from the ledger, even if the rewrite fails.
    pub async fn courier_summary(&self, courier: CourierId) -> Result<CourierSummary, CashLedgerError> {
        let record = self.db.fetch_courier(courier).await?.ok_or(CashLedgerError::CourierNotFound(courier))?;
        let balances = self.db.compute_courier_balances(courier).await?;
        let repaired = record.balances != balances;
        if repaired {
            warn!(
                "📊️ Cached balances for {courier} have drifted from the ledger. Cached: {:?}, ledger: {balances:?}. \
                 Repairing.",
                record.balances
            );
            if let Err(e) = self.db.refresh_courier_balances(courier, Utc::now()).await {
                error!("📊️ Could not repair the cached balances for {courier}. {e}");
            }
        }
        let pending_filter = CollectionQueryFilter::default().with_courier(courier).with_status(SubmissionStatus::Pending);
        let pending = self.db.fetch_collections(&pending_filter, Pagination::new(0, MAX_PAGE_SIZE)).await?;
        let by_status = self.db.status_totals(&CollectionQueryFilter::default().with_courier(courier)).await?;
        let by_status = StatusReport::from_totals(by_status).by_status;
        Ok(CourierSummary { courier_id: courier, name: record.name, balances, repaired, pending, by_status })
    }

    /// The courier's collections, newest first.
    pub async fn collection_history(
        &self,
        courier: CourierId,
        status: Option<SubmissionStatus>,
        pagination: Pagination,
    ) -> Result<Page<CashCollection>, CashLedgerError> {
        let mut filter = CollectionQueryFilter::default().with_courier(courier);
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        self.page(&filter, pagination).await
    }

    /// Submitted collections awaiting the operator, oldest submission first.
    pub async fn pending_reconciliation(&self, pagination: Pagination) -> Result<Page<CashCollection>, CashLedgerError> {
        let filter = CollectionQueryFilter::default().with_status(SubmissionStatus::Submitted).oldest_first();
        self.page(&filter, pagination).await
    }

    async fn page(
        &self,
        filter: &CollectionQueryFilter,
        pagination: Pagination,
    ) -> Result<Page<CashCollection>, CashLedgerError> {
        let items = self.db.fetch_collections(filter, pagination).await?;
        let totals = self.db.collection_totals(filter).await?;
        trace!("📊️ Page of {} out of {} collections", items.len(), totals.count);
        Ok(Page::new(items, totals, pagination))
    }

    /// Counts and amounts per status, optionally restricted to collections made in `[from, to)`.
    pub async fn status_totals(
        &self,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<StatusReport, CashLedgerError> {
        let mut filter = CollectionQueryFilter::default();
        if let Some((from, to)) = range {
            check_range(from, to)?;
            filter = filter.collected_between(from, to);
        }
        let totals = self.db.status_totals(&filter).await?;
        Ok(StatusReport::from_totals(totals))
    }

    pub async fn courier_dashboard(&self) -> Result<Vec<CourierDashboardEntry>, CashLedgerError> {
        self.courier_dashboard_at(Utc::now()).await
    }

    /// One entry per courier. "Today" is the UTC day containing `now`.
    pub async fn courier_dashboard_at(&self, now: DateTime<Utc>) -> Result<Vec<CourierDashboardEntry>, CashLedgerError> {
        let couriers = self.db.fetch_couriers().await?;
        let all_time = self.db.courier_status_totals(&CollectionQueryFilter::default()).await?;
        let (day_start, day_end) = utc_day(now);
        let today = self
            .db
            .courier_status_totals(&CollectionQueryFilter::default().collected_between(day_start, day_end))
            .await?;
        let mut entries = Vec::with_capacity(couriers.len());
        for courier in couriers {
            let mut entry = CourierDashboardEntry {
                courier_id: courier.id,
                name: courier.name,
                status: courier.status,
                pending: CollectionTotals::default(),
                submitted: CollectionTotals::default(),
                reconciled: CollectionTotals::default(),
                discrepancy: CollectionTotals::default(),
                today: CollectionTotals::default(),
                recent_pending: Vec::new(),
            };
            all_time.iter().filter(|r| r.courier_id == courier.id).for_each(|r| entry.absorb(r));
            for row in today.iter().filter(|r| r.courier_id == courier.id) {
                entry.today.count += row.count;
                entry.today.amount += row.amount;
            }
            if entry.pending.count > 0 {
                let filter =
                    CollectionQueryFilter::default().with_courier(courier.id).with_status(SubmissionStatus::Pending);
                entry.recent_pending =
                    self.db.fetch_collections(&filter, Pagination::new(0, RECENT_PENDING_LIMIT)).await?;
            }
            entries.push(entry);
        }
        debug!("📊️ Dashboard built for {} couriers", entries.len());
        Ok(entries)
    }

    /// Collections made in `[from, to)`, totalled per courier.
    pub async fn cash_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<CashReport, CashLedgerError> {
        check_range(from, to)?;
        let filter = CollectionQueryFilter::default().collected_between(from, to);
        let rows = self.db.courier_status_totals(&filter).await?;
        let report = CashReport::from_rows(from, to, &rows);
        debug!(
            "📊️ Cash report {from} - {to}: {} collections, {} collected",
            report.totals.collection_count, report.totals.collected
        );
        if report.totals.discrepancy_delta != Cents::default() {
            info!("📊️ Net discrepancy in the report period: {}", report.totals.discrepancy_delta);
        }
        Ok(report)
    }
}

fn check_range(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<(), CashLedgerError> {
    if from >= to {
        return Err(CashLedgerError::ValidationError(format!("The report range is empty: {from} is not before {to}")));
    }
    Ok(())
}

/// Midnight UTC at the start of `now`'s day, and the following midnight.
pub fn utc_day(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = now.date_naive().and_hms_opt(0, 0, 0).map(|t| t.and_utc()).unwrap_or(now);
    (start, start + Duration::days(1))
}
