use std::time::Duration as StdDuration;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use cod_ledger_engine::{
    db_types::{DeliveryConfirmation, OrderId, OrderStatusType, Role, SubmissionStatus},
    events::EventProducers,
    helpers::RetryPolicy,
    traits::CollectionOutcome,
    CashLedgerError,
    DeliveryFlowApi,
};
use serde_json::json;

use super::{
    helpers::{collection, issue_token, order, parse_json, post_request, put_request},
    mocks::MockBackend,
};
use crate::routes::configure_routes;

fn configure(backend: MockBackend) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = DeliveryFlowApi::new(backend, EventProducers::default())
            .with_retry_policy(RetryPolicy::new(2, StdDuration::ZERO));
        cfg.app_data(web::Data::new(api));
        configure_routes::<MockBackend>(cfg);
    }
}

fn verified(code: &str) -> DeliveryConfirmation {
    let now = Utc::now();
    DeliveryConfirmation {
        code: Some(code.into()),
        expires_at: Some(now + Duration::hours(1)),
        resend_count: 0,
        verified: true,
        verified_at: Some(now),
    }
}

#[actix_web::test]
async fn pick_up_a_confirmed_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::Confirmed, 7))));
    backend.expect_mark_picked_up().times(1).returning(|id, _, at| {
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.picked_up_at = Some(at);
        Ok(Some(order))
    });
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = put_request(
        &token,
        "/api/mobile/delivery/orders/3/status",
        json!({"status": "picked_up"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["order"]["status"], "picked_up");
    assert_eq!(body["ledger"], "not_applicable");
}

#[actix_web::test]
async fn deliver_without_a_verified_code() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::PickedUp, 7))));
    backend.expect_mark_delivered().never();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = put_request(
        &token,
        "/api/mobile/delivery/orders/3/status",
        json!({"status": "delivered"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        parse_json(&body)["error"],
        "Order #3 cannot be delivered until the customer's confirmation code is verified"
    );
}

#[actix_web::test]
async fn deliver_records_the_cash() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.confirmation = verified("123456");
        Ok(Some(order))
    });
    backend.expect_mark_delivered().times(1).returning(|id, _, _| {
        let order = order(id.0, OrderStatusType::Delivered, 7);
        Ok(Some((order, CollectionOutcome::Created(collection(21, 7, SubmissionStatus::Pending, 25_000)))))
    });
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = put_request(
        &token,
        "/api/mobile/delivery/orders/3/status",
        json!({"status": "delivered"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["ledger"], "created");
    assert_eq!(body["message"], "Cash collection recorded");
    assert_eq!(body["collection"]["amount"], 25_000);
    assert_eq!(body["collection"]["submission_status"], "pending");
    assert_eq!(body["order"]["status"], "delivered");
}

#[actix_web::test]
async fn couriers_cannot_cancel_orders() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::PickedUp, 7))));
    let token = issue_token(7, vec![Role::Courier]);
    let (status, _) = put_request(
        &token,
        "/api/mobile/delivery/orders/3/status",
        json!({"status": "cancelled"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn order_ids_must_be_numbers() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = put_request(
        &token,
        "/api/mobile/delivery/orders/three/status",
        json!({"status": "picked_up"}),
        configure(MockBackend::new()),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(&body)["error"].as_str().unwrap().starts_with("Could not read request path:"));
}

#[actix_web::test]
async fn aborted_transactions_are_retried_then_reported() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::Confirmed, 7))));
    backend
        .expect_mark_picked_up()
        .times(2)
        .returning(|_, _, _| Err(CashLedgerError::TransactionAborted("database is locked".into())));
    let token = issue_token(7, vec![Role::Courier]);
    let (status, _) = put_request(
        &token,
        "/api/mobile/delivery/orders/3/status",
        json!({"status": "picked_up"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn sending_a_code_never_reveals_it() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(order(id.0, OrderStatusType::PickedUp, 7))));
    backend.expect_issue_confirmation_code().times(1).returning(|id, code, expires_at, _| {
        assert_eq!(code.len(), 6);
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.confirmation = DeliveryConfirmation {
            code: Some(code.to_string()),
            expires_at: Some(expires_at),
            resend_count: 0,
            verified: false,
            verified_at: None,
        };
        Ok(Some(order))
    });
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) =
        post_request(&token, "/api/mobile/delivery/orders/3/send-otp", json!({}), configure(backend))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let body = parse_json(&body);
    assert_eq!(body["message"], "Confirmation code sent to the customer");
    let confirmation = &body["order"]["confirmation"];
    assert!(confirmation.get("code").is_none());
    assert_eq!(confirmation["verified"], false);
}

#[actix_web::test]
async fn resend_limit() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.confirmation = DeliveryConfirmation {
            code: Some("654321".into()),
            expires_at: Some(Utc::now() + Duration::hours(2)),
            resend_count: 3,
            verified: false,
            verified_at: None,
        };
        Ok(Some(order))
    });
    backend.expect_record_confirmation_resend().never();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) =
        post_request(&token, "/api/mobile/delivery/orders/3/resend-otp", json!({}), configure(backend))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(&body)["error"], "The confirmation code has already been resent 3 times");
}

#[actix_web::test]
async fn wrong_codes_are_rejected() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.confirmation = DeliveryConfirmation {
            code: Some("111111".into()),
            expires_at: Some(Utc::now() + Duration::hours(2)),
            resend_count: 0,
            verified: false,
            verified_at: None,
        };
        Ok(Some(order))
    });
    backend.expect_mark_confirmation_verified().never();
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = post_request(
        &token,
        "/api/mobile/delivery/orders/3/otp/verify",
        json!({"code": "222222"}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(parse_json(&body)["error"], "The confirmation code does not match");
}

#[actix_web::test]
async fn right_code_verifies_the_order() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        let mut order = order(id.0, OrderStatusType::PickedUp, 7);
        order.confirmation = DeliveryConfirmation {
            code: Some("111111".into()),
            expires_at: Some(Utc::now() + Duration::hours(2)),
            resend_count: 1,
            verified: false,
            verified_at: None,
        };
        Ok(Some(order))
    });
    backend.expect_mark_confirmation_verified().times(1).withf(|id, code, _| *id == OrderId(3) && code == "111111").returning(
        |id, code, _| {
            let mut order = order(id.0, OrderStatusType::PickedUp, 7);
            order.confirmation = verified(code);
            Ok(Some(order))
        },
    );
    let token = issue_token(7, vec![Role::Courier]);
    let (status, body) = post_request(
        &token,
        "/api/mobile/delivery/orders/3/otp/verify",
        json!({"code": " 111111 "}),
        configure(backend),
    )
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(&body)["confirmation"]["verified"], true);
}
