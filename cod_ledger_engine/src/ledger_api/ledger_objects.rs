use chrono::{DateTime, Utc};
use cod_common::Cents;
use serde::Serialize;

use crate::{
    db_types::{CashCollection, CourierBalances, CourierId, CourierStatus, Order, Pagination, SubmissionStatus},
    traits::{CollectionOutcome, CollectionTotals, CourierStatusTotal, StatusTotal},
};

/// The result of a courier-driven order transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub order: Order,
    #[serde(flatten)]
    pub collection: CollectionOutcome,
}

impl DeliveryOutcome {
    pub fn new(order: Order, collection: CollectionOutcome) -> Self {
        Self { order, collection }
    }

    /// A human-readable account of what happened in the ledger.
    pub fn ledger_message(&self) -> &'static str {
        match self.collection {
            CollectionOutcome::NotApplicable => "No cash to collect for this order",
            CollectionOutcome::Created(_) => "Cash collection recorded",
            CollectionOutcome::AlreadyRecorded(_) => "Cash collection was already recorded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub total_amount: Cents,
    pub offset: i64,
    pub count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, totals: CollectionTotals, pagination: Pagination) -> Self {
        Self {
            items,
            total_count: totals.count,
            total_amount: totals.amount,
            offset: pagination.offset(),
            count: pagination.count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourierSummary {
    pub courier_id: CourierId,
    pub name: String,
    /// Always recomputed from the ledger.
    pub balances: CourierBalances,
    /// True if the cached balances disagreed with the ledger and were rewritten.
    pub repaired: bool,
    pub pending: Vec<CashCollection>,
    pub by_status: Vec<StatusTotal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub by_status: Vec<StatusTotal>,
    pub total_count: i64,
    pub total_amount: Cents,
}

impl StatusReport {
    /// Every status appears exactly once, in lifecycle order, even if it has no rows.
    pub fn from_totals(totals: Vec<StatusTotal>) -> Self {
        let by_status = SubmissionStatus::ALL
            .iter()
            .map(|status| {
                totals.iter().find(|t| t.status == *status).cloned().unwrap_or(StatusTotal {
                    status: *status,
                    count: 0,
                    amount: Cents::default(),
                    submitted_amount: Cents::default(),
                })
            })
            .collect::<Vec<StatusTotal>>();
        let total_count = by_status.iter().map(|t| t.count).sum();
        let total_amount = by_status.iter().map(|t| t.amount).sum();
        Self { by_status, total_count, total_amount }
    }
}

/// Cash figures over a set of collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CashTotals {
    pub collection_count: i64,
    pub collected: Cents,
    pub pending: Cents,
    pub submitted: Cents,
    pub reconciled: Cents,
    pub discrepancy_count: i64,
    /// `Σ (actual - expected)` over discrepancies. Negative when couriers handed over less than declared.
    pub discrepancy_delta: Cents,
}

impl CashTotals {
    pub fn add(&mut self, row: &CourierStatusTotal) {
        self.collection_count += row.count;
        self.collected += row.amount;
        match row.status {
            SubmissionStatus::Pending => self.pending += row.amount,
            SubmissionStatus::Submitted => self.submitted += row.submitted_amount,
            SubmissionStatus::Reconciled => {
                self.submitted += row.submitted_amount;
                self.reconciled += row.submitted_amount;
            },
            SubmissionStatus::Discrepancy => {
                self.submitted += row.submitted_amount;
                self.discrepancy_count += row.count;
                self.discrepancy_delta += row.discrepancy_delta;
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourierCashTotals {
    pub courier_id: CourierId,
    #[serde(flatten)]
    pub totals: CashTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub couriers: Vec<CourierCashTotals>,
    pub totals: CashTotals,
}

impl CashReport {
    /// Folds per-courier, per-status rows into the report. `rows` must be sorted by courier.
    pub fn from_rows(from: DateTime<Utc>, to: DateTime<Utc>, rows: &[CourierStatusTotal]) -> Self {
        let mut couriers: Vec<CourierCashTotals> = Vec::new();
        let mut totals = CashTotals::default();
        for row in rows {
            totals.add(row);
            match couriers.last_mut() {
                Some(entry) if entry.courier_id == row.courier_id => entry.totals.add(row),
                _ => {
                    let mut entry = CourierCashTotals { courier_id: row.courier_id, totals: CashTotals::default() };
                    entry.totals.add(row);
                    couriers.push(entry);
                },
            }
        }
        Self { from, to, couriers, totals }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourierDashboardEntry {
    pub courier_id: CourierId,
    pub name: String,
    pub status: CourierStatus,
    pub pending: CollectionTotals,
    pub submitted: CollectionTotals,
    pub reconciled: CollectionTotals,
    pub discrepancy: CollectionTotals,
    /// Collections made since midnight UTC.
    pub today: CollectionTotals,
    pub recent_pending: Vec<CashCollection>,
}

impl CourierDashboardEntry {
    pub(crate) fn absorb(&mut self, row: &CourierStatusTotal) {
        let slot = match row.status {
            SubmissionStatus::Pending => &mut self.pending,
            SubmissionStatus::Submitted => &mut self.submitted,
            SubmissionStatus::Reconciled => &mut self.reconciled,
            SubmissionStatus::Discrepancy => &mut self.discrepancy,
        };
        slot.count += row.count;
        slot.amount += row.amount;
    }
}
