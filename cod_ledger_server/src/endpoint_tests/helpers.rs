use actix_web::{
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, Utc};
use cod_common::Cents;
use cod_ledger_engine::db_types::{
    CashCollection,
    CollectionId,
    CourierId,
    DeliveryConfirmation,
    Order,
    OrderId,
    OrderStatusType,
    PaymentMethod,
    Role,
    SubmissionStatus,
};
use log::debug;

use crate::{
    auth::{JwtClaims, TokenIssuer, TokenValidator},
    config::AuthConfig,
    middleware::JwtAuthFactory,
};

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("endpoint-tests-only-secret-0123456789abcdef")
}

pub fn issue_token(subject: i64, roles: Vec<Role>) -> String {
    TokenIssuer::new(&get_auth_config()).issue_token(subject, roles).expect("Failed to sign token")
}

pub fn expired_token(subject: i64, roles: Vec<Role>) -> String {
    let claims = JwtClaims::new(subject, roles, Duration::hours(-2));
    TokenIssuer::new(&get_auth_config()).sign(&claims).expect("Failed to sign token")
}

/// Sends `req` to an app whose `/api` scope is set up by `configure`, behind the bearer-token middleware.
pub async fn send_request<F>(req: TestRequest, token: &str, configure: F) -> anyhow::Result<(StatusCode, String)>
where F: FnOnce(&mut ServiceConfig) {
    let mut req = req;
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    let validator = TokenValidator::new(&get_auth_config());
    let app = App::new().service(web::scope("/api").wrap(JwtAuthFactory::new(validator)).configure(configure));
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    Ok((status, String::from_utf8(body.to_vec())?))
}

pub async fn get_request<F>(token: &str, path: &str, configure: F) -> anyhow::Result<(StatusCode, String)>
where F: FnOnce(&mut ServiceConfig) {
    send_request(TestRequest::get().uri(path), token, configure).await
}

pub async fn post_request<F>(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: F,
) -> anyhow::Result<(StatusCode, String)>
where
    F: FnOnce(&mut ServiceConfig),
{
    send_request(TestRequest::post().uri(path).set_json(body), token, configure).await
}

pub async fn put_request<F>(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: F,
) -> anyhow::Result<(StatusCode, String)>
where
    F: FnOnce(&mut ServiceConfig),
{
    send_request(TestRequest::put().uri(path).set_json(body), token, configure).await
}

pub fn parse_json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).expect("Response was not JSON")
}

//----------------------------------------------   Fixtures  ----------------------------------------------------

pub fn order(id: i64, status: OrderStatusType, courier: i64) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId(id),
        order_number: format!("ORD-{id}"),
        status,
        payment_method: PaymentMethod::CashOnDelivery,
        total_amount: Cents::from(25_000),
        delivery_fee: Cents::from(500),
        courier_id: Some(CourierId(courier)),
        customer_ref: Some("cust-42".into()),
        restaurant_ref: None,
        delivery_zone: None,
        confirmation: DeliveryConfirmation::default(),
        picked_up_at: None,
        delivered_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn collection(id: i64, courier: i64, status: SubmissionStatus, amount: i64) -> CashCollection {
    let now = Utc::now();
    let submitted = status != SubmissionStatus::Pending;
    CashCollection {
        id: CollectionId(id),
        courier_id: CourierId(courier),
        order_id: OrderId(100 + id),
        order_number: format!("ORD-{}", 100 + id),
        amount: Cents::from(amount),
        collected_at: now,
        submission_status: status,
        submitted_at: submitted.then_some(now),
        submitted_amount: submitted.then_some(Cents::from(amount)),
        deposit_proof: None,
        reconciled_at: None,
        reconciled_by: None,
        reconciliation_notes: None,
        discrepancy_expected: None,
        discrepancy_actual: None,
        discrepancy_reason: None,
        created_at: now,
        updated_at: now,
    }
}
