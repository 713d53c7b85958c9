//! # Cash-on-delivery ledger server
//! This crate hosts the HTTP surface of the cash-on-delivery ledger. It is responsible for:
//! Authenticating couriers and operators with bearer tokens.
//! Driving the delivery flow (pickup, confirmation codes, delivery) on behalf of couriers.
//! Exposing the courier cash ledger, and the reconciliation console used by operators.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//!
//! Courier routes (require the `courier` role):
//! * `POST /api/delivery/cash/collect`: Record the cash for a delivered order.
//! * `POST /api/delivery/cash/submit`: Hand pending collections over to the operator.
//! * `GET /api/delivery/cash/summary`: The caller's balances and pending collections.
//! * `GET /api/delivery/cash/history`: The caller's collections, filterable by status.
//! * `PUT /api/mobile/delivery/orders/{id}/status`: Mark an order picked up or delivered.
//! * `POST /api/mobile/delivery/orders/{id}/send-otp`: Issue a confirmation code to the customer.
//! * `POST /api/mobile/delivery/orders/{id}/resend-otp`: Send the outstanding code again.
//! * `POST /api/mobile/delivery/orders/{id}/otp/verify`: Check the code the customer read out.
//!
//! Operator routes (require the `operator` role):
//! * `GET /api/admin/cash/pending`: Submitted collections awaiting reconciliation.
//! * `POST /api/admin/cash/reconcile/{id}`: Settle one submitted collection.
//! * `POST /api/admin/cash/reconcile/bulk`: Settle many submitted collections at face value.
//! * `POST /api/admin/cash/repair`: Record collections missing from delivered cash orders.
//! * `GET /api/admin/cash/delivery-personnel`: Per-courier dashboard.
//! * `GET /api/admin/cash/report`: Cash report for a date range.
//! * `GET /api/admin/cash/totals`: Totals per submission status.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod server;
