use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use cod_common::Cents;
use cod_ledger_engine::{
    db_types::{CollectionId, Courier, CourierBalances, CourierStatus, OperatorId, Role, SubmissionStatus},
    events::EventProducers,
    traits::{CollectionTotals, StatusTotal},
    CashLedgerApi,
    ReportingApi,
};
use serde_json::json;

use super::{
    helpers::{collection, get_request, issue_token, parse_json, post_request},
    mocks::MockBackend,
};
use crate::routes::configure_routes;

fn configure_cash(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CashLedgerApi::new(backend, EventProducers::default())));
        configure_routes::<MockBackend>(cfg);
    }
}

fn configure_reports(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(ReportingApi::new(backend)));
        configure_routes::<MockBackend>(cfg);
    }
}

fn operator_token() -> String {
    issue_token(2, vec![Role::Operator])
}

#[actix_web::test]
async fn couriers_cannot_reconcile() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, _) = post_request(&token, "/api/admin/cash/reconcile/5", json!({}), configure_cash(MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn short_handover_is_recorded_as_a_discrepancy() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_collection()
        .returning(|id| Ok(Some(collection(id.0, 7, SubmissionStatus::Submitted, 10_000))));
    backend.expect_apply_reconciliation().times(1).returning(|id, update| {
        assert_eq!(update.status, SubmissionStatus::Discrepancy);
        assert_eq!(update.operator, OperatorId(2));
        let mut c = collection(id.0, 7, SubmissionStatus::Discrepancy, 10_000);
        c.reconciled_at = Some(update.reconciled_at);
        c.reconciled_by = Some(update.operator);
        c.reconciliation_notes = update.notes.clone();
        c.discrepancy_expected = update.expected;
        c.discrepancy_actual = update.actual;
        c.discrepancy_reason = update.reason.clone();
        Ok(Some(c))
    });
    let (status, body) = post_request(
        &operator_token(),
        "/api/admin/cash/reconcile/5",
        json!({"actual_amount": 9_000, "notes": "One note missing"}),
        configure_cash(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["submission_status"], "discrepancy");
    assert_eq!(body["discrepancy_expected"], 10_000);
    assert_eq!(body["discrepancy_actual"], 9_000);
    assert_eq!(body["discrepancy_reason"], "One note missing");
    assert_eq!(body["reconciled_by"], 2);
}

#[actix_web::test]
async fn pending_collections_cannot_be_reconciled() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_collection().returning(|id| Ok(Some(collection(id.0, 7, SubmissionStatus::Pending, 10_000))));
    backend.expect_apply_reconciliation().never();
    let (status, body) =
        post_request(&operator_token(), "/api/admin/cash/reconcile/5", json!({}), configure_cash(backend))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(&body)["error"], "Cash collection collection#5 is pending and cannot become reconciled");
}

#[actix_web::test]
async fn unknown_collection() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_collection().returning(|_| Ok(None));
    let (status, _) = post_request(&operator_token(), "/api/admin/cash/reconcile/99", json!({}), configure_cash(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bulk_reconcile_reports_what_was_skipped() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_bulk_reconcile().times(1).returning(|ids, operator, _, _| {
        assert_eq!(ids, &[CollectionId(1), CollectionId(2), CollectionId(3)]);
        assert_eq!(operator, OperatorId(2));
        Ok(vec![
            collection(1, 7, SubmissionStatus::Reconciled, 5_000),
            collection(3, 7, SubmissionStatus::Reconciled, 7_000),
        ])
    });
    let (status, body) = post_request(
        &operator_token(),
        "/api/admin/cash/reconcile/bulk",
        json!({"collection_ids": [3, 1, 2, 1], "notes": "Friday float"}),
        configure_cash(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["count"], 2);
    assert_eq!(body["reconciled"], json!([1, 3]));
    assert_eq!(body["skipped"], json!([2]));
}

#[actix_web::test]
async fn bulk_reconcile_needs_ids() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request(
        &operator_token(),
        "/api/admin/cash/reconcile/bulk",
        json!({"collection_ids": []}),
        configure_cash(MockBackend::new()),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn repair_with_nothing_missing() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_orders_missing_collection().times(1).returning(|| Ok(vec![]));
    let (status, body) = post_request(&operator_token(), "/api/admin/cash/repair", json!({}), configure_cash(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["repaired"], 0);
    assert_eq!(body["outcomes"], json!([]));
}

#[actix_web::test]
async fn pending_reconciliation_page() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_collections().times(1).returning(|filter, pagination| {
        assert_eq!(filter.statuses, vec![SubmissionStatus::Submitted]);
        assert_eq!(pagination.count(), 2);
        Ok(vec![
            collection(4, 7, SubmissionStatus::Submitted, 1_000),
            collection(5, 8, SubmissionStatus::Submitted, 2_000),
        ])
    });
    backend
        .expect_collection_totals()
        .returning(|_| Ok(CollectionTotals { count: 3, amount: Cents::from(6_000) }));
    let (status, body) = get_request(&operator_token(), "/api/admin/cash/pending?count=2", configure_reports(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["total_count"], 3);
    assert_eq!(body["total_amount"], 6_000);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["count"], 2);
}

#[actix_web::test]
async fn report_needs_a_range() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(
        &operator_token(),
        "/api/admin/cash/report?from=2026-10-01T00:00:00Z",
        configure_reports(MockBackend::new()),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(&body)["error"], "Could not read request query: Supply both 'from' and 'to', or neither");
}

#[actix_web::test]
async fn report_range_must_not_be_empty() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_courier_status_totals().never();
    let (status, _) = get_request(
        &operator_token(),
        "/api/admin/cash/report?from=2026-10-02T00:00:00Z&to=2026-10-01T00:00:00Z",
        configure_reports(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn totals_list_every_status() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_status_totals().times(1).returning(|filter| {
        assert!(filter.collected_since.is_none());
        Ok(vec![StatusTotal {
            status: SubmissionStatus::Submitted,
            count: 2,
            amount: Cents::from(3_000),
            submitted_amount: Cents::from(3_000),
        }])
    });
    let (status, body) = get_request(&operator_token(), "/api/admin/cash/totals", configure_reports(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    let statuses = body["by_status"].as_array().unwrap().iter().map(|t| t["status"].clone()).collect::<Vec<_>>();
    assert_eq!(statuses, vec![json!("pending"), json!("submitted"), json!("reconciled"), json!("discrepancy")]);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["total_amount"], 3_000);
}

#[actix_web::test]
async fn courier_summary_repairs_drifted_balances() {
    let _ = env_logger::try_init().ok();
    let ledger = CourierBalances {
        cash_in_hand: Cents::from(25_000),
        total_cash_collected: Cents::from(25_000),
        total_cash_submitted: Cents::from(0),
        pending_cash_submission: Cents::from(25_000),
    };
    let mut backend = MockBackend::new();
    backend.expect_fetch_courier().returning(|id| {
        let now = Utc::now();
        Ok(Some(Courier {
            id,
            name: "Ada".into(),
            status: CourierStatus::OnDuty,
            balances: CourierBalances::default(),
            balances_updated_at: None,
            created_at: now,
            updated_at: now,
        }))
    });
    backend.expect_compute_courier_balances().returning(move |_| Ok(ledger));
    backend.expect_refresh_courier_balances().times(1).returning(move |_, _| Ok(ledger));
    backend
        .expect_fetch_collections()
        .returning(|_, _| Ok(vec![collection(1, 7, SubmissionStatus::Pending, 25_000)]));
    backend.expect_status_totals().returning(|_| Ok(vec![]));
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) =
        get_request(&token, "/api/delivery/cash/summary", configure_reports(backend)).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["courier_id"], 7);
    assert_eq!(body["repaired"], true);
    assert_eq!(body["balances"]["cash_in_hand"], 25_000);
    assert_eq!(body["pending"].as_array().unwrap().len(), 1);
}
