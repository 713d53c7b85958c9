use actix_web::{http::StatusCode, web, web::ServiceConfig};
use cod_common::Cents;
use cod_ledger_engine::{
    db_types::{CourierId, OrderId, OrderStatusType, Role, SubmissionStatus},
    events::EventProducers,
    traits::{CollectionOutcome, CollectionSelection, SubmissionResult},
    CashLedgerApi,
};
use serde_json::json;

use super::{
    helpers::{collection, expired_token, issue_token, order, parse_json, post_request},
    mocks::MockBackend,
};
use crate::routes::configure_routes;

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(CashLedgerApi::new(backend, EventProducers::default())));
        configure_routes::<MockBackend>(cfg);
    }
}

#[actix_web::test]
async fn collect_without_a_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("", "/api/delivery/cash/collect", json!({"order_id": 1}), configure(MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(parse_json(&body)["error"], "Authentication Error. No bearer token was provided.");
}

#[actix_web::test]
async fn collect_with_an_expired_token() {
    let _ = env_logger::try_init().ok();
    let token = expired_token(7, vec![Role::Courier]);
    let (status, _) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn collect_with_a_tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = issue_token(7, vec![Role::Courier]);
    token.replace_range(token.len() - 10..token.len() - 5, "AAAAA");
    let (status, _) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn operators_cannot_collect() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(2, vec![Role::Operator]);
    let (status, body) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(MockBackend::new()))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(&body)["error"], "Authentication Error. Insufficient Permissions. Requires the courier role");
}

#[actix_web::test]
async fn collect_records_the_order_once() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_order()
        .withf(|id| *id == OrderId(1))
        .returning(|id| Ok(Some(order(id.0, OrderStatusType::Delivered, 7))));
    backend.expect_collect_cash().times(1).returning(|c| {
        assert_eq!(c.courier_id, CourierId(7));
        assert_eq!(c.amount, Cents::from(25_000));
        Ok(CollectionOutcome::AlreadyRecorded(collection(11, 7, SubmissionStatus::Pending, 25_000)))
    });
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["ledger"], "already_recorded");
    assert_eq!(body["collection"]["id"], 11);
    assert_eq!(body["collection"]["amount"], 25_000);
    assert_eq!(body["message"], "Cash collection was already recorded");
}

#[actix_web::test]
async fn collect_for_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::Delivered, 8))));
    backend.expect_collect_cash().never();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(&body)["error"], "Order #1 is not assigned to courier#7");
}

#[actix_web::test]
async fn collect_before_delivery() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::PickedUp, 7))));
    let token = issue_token(7, vec![Role::Courier]);
    let (status, _) = post_request(&token, "/api/delivery/cash/collect", json!({"order_id": 1}), configure(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn collect_with_a_malformed_body() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) =
        post_request(&token, "/api/delivery/cash/collect", json!({"order": "one"}), configure(MockBackend::new()))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(&body)["error"].as_str().unwrap().starts_with("Could not read request body:"));
}

#[actix_web::test]
async fn submit_everything_pending() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_submit_collections().times(1).returning(|courier, selection, amount, proof, _, _| {
        assert_eq!(*selection, CollectionSelection::AllPending);
        assert_eq!(amount, None);
        assert_eq!(proof.as_deref(), Some("slip-77"));
        Ok(SubmissionResult {
            courier_id: courier,
            submitted_amount: Cents::from(40_000),
            collections: vec![
                collection(1, courier.0, SubmissionStatus::Submitted, 15_000),
                collection(2, courier.0, SubmissionStatus::Submitted, 25_000),
            ],
            skipped: vec![],
            balances: Default::default(),
        })
    });
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) =
        post_request(&token, "/api/delivery/cash/submit", json!({"deposit_proof": "slip-77"}), configure(backend))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["submitted_amount"], 40_000);
    assert_eq!(body["collections"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn submit_with_nothing_pending() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_submit_collections()
        .returning(|_, _, _, _, _, _| Err(cod_ledger_engine::CashLedgerError::NoPendingCollections));
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = post_request(&token, "/api/delivery/cash/submit", json!({}), configure(backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(&body)["error"], "There are no pending collections to submit");
}

#[actix_web::test]
async fn submit_a_negative_amount() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_submit_collections().never();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, _) =
        post_request(&token, "/api/delivery/cash/submit", json!({"submitted_amount": -5}), configure(backend))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
