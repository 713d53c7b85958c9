//! # Backend contracts
//!
//! The traits a storage backend implements to host the cash-on-delivery ledger.
//!
//! * [`OrderManagement`] stores orders and performs the courier-driven status transitions. The `delivered`
//!   transition writes the cash collection in the same transaction.
//! * [`ConfirmationCodeManagement`] stores the delivery-confirmation code on each order.
//! * [`CashLedgerDatabase`] owns the collection lifecycle (`pending -> submitted -> reconciled | discrepancy`) and the
//!   courier balance projection.
//! * [`LedgerReporting`] provides read-only aggregations for the operator console.
//!
//! All methods report failures as [`CashLedgerError`].
mod cash_ledger_database;
mod confirmation_codes;
mod data_objects;
mod errors;
mod ledger_reporting;
mod order_management;

pub use cash_ledger_database::CashLedgerDatabase;
pub use confirmation_codes::ConfirmationCodeManagement;
pub use data_objects::{
    BulkReconcileResult,
    CollectionOutcome,
    CollectionQueryFilter,
    CollectionSelection,
    CollectionTotals,
    CourierStatusTotal,
    NewCashCollection,
    ReconciliationUpdate,
    SortOrder,
    StatusTotal,
    SubmissionResult,
};
pub use errors::CashLedgerError;
pub use ledger_reporting::LedgerReporting;
pub use order_management::OrderManagement;
