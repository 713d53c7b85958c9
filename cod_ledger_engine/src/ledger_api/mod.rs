//! # Cash ledger public API
//!
//! The API is split by audience, so that a deployment can pick the parts it needs:
//!
//! * [`delivery_flow_api`] is used by couriers to move orders through pickup and delivery, and to manage the
//!   customer's delivery-confirmation code.
//! * [`cash_ledger_api`] records cash collections, courier submissions and operator reconciliation.
//! * [`reporting_api`] provides the read-only summaries, dashboards and reports.
//!
//! # API usage
//!
//! Each API wraps a database backend that implements the traits it needs. [`crate::SqliteDatabase`] implements all of
//! them, and is cheap to clone.
//!
//! ```rust,ignore
//! use cod_ledger_engine::{events::EventProducers, CashLedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/cod_ledger.db", 25).await?;
//! let api = CashLedgerApi::new(db, EventProducers::default());
//! let result = api.submit(courier_id, CollectionSelection::AllPending, None, None).await?;
//! ```
pub mod cash_ledger_api;
pub mod delivery_flow_api;
pub mod ledger_objects;
pub mod reporting_api;
