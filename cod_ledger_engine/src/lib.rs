//! Cash-on-Delivery Ledger Engine
//!
//! The engine tracks the physical cash that delivery couriers collect on behalf of the marketplace, from the moment an
//! order is delivered, through the courier handing the cash over, to the operator reconciling it.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`traits`] and the SQLite backend). The traits describe what a backend must provide. The ledger rows
//!    (`cash_collections`) are the source of truth; the cash figures cached on each courier are a projection that every
//!    write recomputes from the ledger in the same transaction. The data types used in the database are defined in
//!    the [`db_types`] module and are public.
//! 2. The public API ([`ledger_api`]). [`DeliveryFlowApi`] drives the courier side of order fulfilment,
//!    [`CashLedgerApi`] manages collections, submissions and reconciliation, and [`ReportingApi`] serves the read-only
//!    views.
//!
//! The engine also publishes events (see [`events`]) when an order is delivered, cash is collected, or a confirmation
//! code must be sent to a customer.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ledger_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use ledger_api::{
    cash_ledger_api::CashLedgerApi,
    delivery_flow_api::DeliveryFlowApi,
    ledger_objects,
    reporting_api::ReportingApi,
};
pub use traits::{CashLedgerDatabase, CashLedgerError, ConfirmationCodeManagement, LedgerReporting, OrderManagement};
