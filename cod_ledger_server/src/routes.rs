//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into the engine's API layer. Keep this module neat and tidy 🙏
//!
//! Every route under `/api` is authenticated by the JWT middleware on the enclosing scope, and guarded by an ACL
//! naming the role it requires. Courier routes act on behalf of the courier in the token's subject; operator routes
//! record the operator in the token's subject.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database call is therefore awaited, never blocked on.
use actix_web::{get, web, web::ServiceConfig, HttpResponse, Responder};
use cod_ledger_engine::{
    db_types::{CollectionId, OrderId, Pagination, Role},
    CashLedgerApi,
    CashLedgerDatabase,
    ConfirmationCodeManagement,
    DeliveryFlowApi,
    LedgerReporting,
    OrderManagement,
    ReportingApi,
};
use log::*;
use serde_json::json;

use crate::{
    auth::JwtClaims,
    data_objects::{
        BulkReconcileRequest,
        CollectCashRequest,
        CollectionResponse,
        DateRangeQuery,
        DeliveryResponse,
        HistoryQuery,
        OrderStatusUpdate,
        ReconcileRequest,
        SubmitCashRequest,
        VerifyCodeRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:path),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// Registers every ledger route, for a backend `B`. The caller wraps the enclosing scope in the JWT middleware and
/// supplies the API objects as app data.
pub fn configure_routes<B>(cfg: &mut ServiceConfig)
where B: OrderManagement + ConfirmationCodeManagement + CashLedgerDatabase + LedgerReporting + 'static {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|e, _| ServerError::InvalidRequestBody(e.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|e, _| ServerError::InvalidRequestQuery(e.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|e, _| ServerError::InvalidRequestPath(e.to_string()).into()))
    // Courier cash
    .service(CollectCashRoute::<B>::new())
    .service(SubmitCashRoute::<B>::new())
    .service(MyCashSummaryRoute::<B>::new())
    .service(MyCashHistoryRoute::<B>::new())
    // Courier delivery flow
    .service(UpdateOrderStatusRoute::<B>::new())
    .service(SendOtpRoute::<B>::new())
    .service(ResendOtpRoute::<B>::new())
    .service(VerifyOtpRoute::<B>::new())
    // Operator console. The bulk route must come before `/reconcile/{id}`
    .service(PendingReconciliationRoute::<B>::new())
    .service(BulkReconcileRoute::<B>::new())
    .service(ReconcileCollectionRoute::<B>::new())
    .service(RepairCollectionsRoute::<B>::new())
    .service(CourierDashboardRoute::<B>::new())
    .service(CashReportRoute::<B>::new())
    .service(StatusTotalsRoute::<B>::new());
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Courier cash  ----------------------------------------------------
route!(collect_cash => Post "/delivery/cash/collect" impl CashLedgerDatabase, OrderManagement where requires [Role::Courier]);
/// Records the cash for a delivered cash-on-delivery order assigned to the caller.
///
/// Delivering an order already records its cash, so this normally answers `already_recorded`. It is safe to call any
/// number of times: the order never gets a second collection.
pub async fn collect_cash<B>(
    claims: JwtClaims,
    body: web::Json<CollectCashRequest>,
    api: web::Data<CashLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CashLedgerDatabase + OrderManagement,
{
    let courier = claims.courier_id()?;
    let CollectCashRequest { order_id } = body.into_inner();
    debug!("💻️ POST collect cash for order {order_id} by {courier}");
    let outcome = api.collect_for_order(order_id, courier).await.map_err(|e| {
        debug!("💻️ Could not collect cash for order {order_id}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(CollectionResponse::from(outcome)))
}

route!(submit_cash => Post "/delivery/cash/submit" impl CashLedgerDatabase, OrderManagement where requires [Role::Courier]);
/// Hands pending collections over to the operator.
///
/// ## Parameters
/// * `collection_ids` - optional. The collections to submit. Absent or empty means every pending collection.
/// * `submitted_amount` - optional. The cash actually handed over, in cents. Defaults to the collected amounts.
/// * `deposit_proof` - optional. An opaque reference to a deposit slip or photo.
pub async fn submit_cash<B>(
    claims: JwtClaims,
    body: web::Json<SubmitCashRequest>,
    api: web::Data<CashLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CashLedgerDatabase + OrderManagement,
{
    let courier = claims.courier_id()?;
    let request = body.into_inner();
    debug!("💻️ POST submit cash for {courier}: {request:?}");
    let selection = request.selection();
    let result = api.submit(courier, selection, request.submitted_amount, request.deposit_proof).await.map_err(|e| {
        debug!("💻️ Could not submit cash for {courier}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(result))
}

route!(my_cash_summary => Get "/delivery/cash/summary" impl LedgerReporting, CashLedgerDatabase where requires [Role::Courier]);
/// The caller's balances, as computed from the ledger, and their pending collections.
pub async fn my_cash_summary<B>(claims: JwtClaims, api: web::Data<ReportingApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerReporting + CashLedgerDatabase {
    let courier = claims.courier_id()?;
    debug!("💻️ GET cash summary for {courier}");
    let summary = api.courier_summary(courier).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(my_cash_history => Get "/delivery/cash/history" impl LedgerReporting, CashLedgerDatabase where requires [Role::Courier]);
pub async fn my_cash_history<B>(
    claims: JwtClaims,
    query: web::Query<HistoryQuery>,
    api: web::Data<ReportingApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerReporting + CashLedgerDatabase,
{
    let courier = claims.courier_id()?;
    let query = query.into_inner();
    debug!("💻️ GET cash history for {courier}: {query:?}");
    let page = api.collection_history(courier, query.status, query.pagination()).await?;
    Ok(HttpResponse::Ok().json(page))
}

//----------------------------------------------   Delivery flow  ----------------------------------------------------
route!(update_order_status => Put "/mobile/delivery/orders/{id}/status" impl OrderManagement, ConfirmationCodeManagement where requires [Role::Courier]);
/// Moves an assigned order to `picked_up` or `delivered`.
///
/// Delivery requires the customer's confirmation code to have been verified. For a cash-on-delivery order the cash
/// collection is recorded in the same transaction, and the response says whether it was `created` or
/// `already_recorded`.
pub async fn update_order_status<B>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<DeliveryFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + ConfirmationCodeManagement,
{
    let courier = claims.courier_id()?;
    let id = path.into_inner();
    let OrderStatusUpdate { status } = body.into_inner();
    info!("💻️ PUT order {id} status {status} by {courier}");
    let outcome = api.update_order_status(id, courier, status).await.map_err(|e| {
        debug!("💻️ Could not move order {id} to {status}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(DeliveryResponse::from(outcome)))
}

route!(send_otp => Post "/mobile/delivery/orders/{id}/send-otp" impl OrderManagement, ConfirmationCodeManagement where requires [Role::Courier]);
/// Issues a fresh confirmation code to the customer. The code itself is never part of the response.
pub async fn send_otp<B>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<DeliveryFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + ConfirmationCodeManagement,
{
    let courier = claims.courier_id()?;
    let id = path.into_inner();
    debug!("💻️ POST send confirmation code for order {id} by {courier}");
    let order = api.send_confirmation_code(id, courier).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Confirmation code sent to the customer",
        "order": order,
    })))
}

route!(resend_otp => Post "/mobile/delivery/orders/{id}/resend-otp" impl OrderManagement, ConfirmationCodeManagement where requires [Role::Courier]);
/// Sends the outstanding code to the customer again. The code and its expiry do not change.
pub async fn resend_otp<B>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<DeliveryFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + ConfirmationCodeManagement,
{
    let courier = claims.courier_id()?;
    let id = path.into_inner();
    debug!("💻️ POST resend confirmation code for order {id} by {courier}");
    let order = api.resend_confirmation_code(id, courier).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Confirmation code sent to the customer again",
        "order": order,
    })))
}

route!(verify_otp => Post "/mobile/delivery/orders/{id}/otp/verify" impl OrderManagement, ConfirmationCodeManagement where requires [Role::Courier]);
pub async fn verify_otp<B>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<VerifyCodeRequest>,
    api: web::Data<DeliveryFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + ConfirmationCodeManagement,
{
    let courier = claims.courier_id()?;
    let id = path.into_inner();
    debug!("💻️ POST verify confirmation code for order {id} by {courier}");
    let order = api.verify_confirmation_code(id, courier, &body.code).await.map_err(|e| {
        info!("💻️ Confirmation code for order {id} was not accepted. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Operator console  ----------------------------------------------------
route!(pending_reconciliation => Get "/admin/cash/pending" impl LedgerReporting, CashLedgerDatabase where requires [Role::Operator]);
/// Submitted collections awaiting reconciliation, oldest submission first. Supports `offset` and `count`.
pub async fn pending_reconciliation<B>(
    query: web::Query<Pagination>,
    api: web::Data<ReportingApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerReporting + CashLedgerDatabase,
{
    let pagination = query.into_inner();
    debug!("💻️ GET pending reconciliation {pagination:?}");
    let page = api.pending_reconciliation(pagination).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(reconcile_collection => Post "/admin/cash/reconcile/{id}" impl CashLedgerDatabase, OrderManagement where requires [Role::Operator]);
/// Settles one submitted collection.
///
/// ## Parameters
/// * `actual_amount` - optional. The cash received, in cents. Defaults to the expected amount.
/// * `notes` - optional. Recorded on the collection, and used as the discrepancy reason if there is one.
/// * `status` - optional. `reconciled` or `discrepancy`. Omit it to let the amounts decide.
pub async fn reconcile_collection<B>(
    claims: JwtClaims,
    path: web::Path<CollectionId>,
    body: web::Json<ReconcileRequest>,
    api: web::Data<CashLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CashLedgerDatabase + OrderManagement,
{
    let operator = claims.operator_id()?;
    let id = path.into_inner();
    let ReconcileRequest { actual_amount, notes, status } = body.into_inner();
    info!("💻️ POST reconcile {id} by {operator}");
    let collection = api.reconcile(id, operator, actual_amount, notes, status).await.map_err(|e| {
        debug!("💻️ Could not reconcile {id}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(collection))
}

route!(bulk_reconcile => Post "/admin/cash/reconcile/bulk" impl CashLedgerDatabase, OrderManagement where requires [Role::Operator]);
/// Marks every listed collection that is still `submitted` as reconciled, without comparing amounts.
pub async fn bulk_reconcile<B>(
    claims: JwtClaims,
    body: web::Json<BulkReconcileRequest>,
    api: web::Data<CashLedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CashLedgerDatabase + OrderManagement,
{
    let operator = claims.operator_id()?;
    let BulkReconcileRequest { collection_ids, notes } = body.into_inner();
    info!("💻️ POST bulk reconcile of {} collections by {operator}", collection_ids.len());
    let result = api.bulk_reconcile(&collection_ids, operator, notes).await?;
    Ok(HttpResponse::Ok().json(json!({
        "count": result.count(),
        "reconciled": result.reconciled,
        "skipped": result.skipped,
    })))
}

route!(repair_collections => Post "/admin/cash/repair" impl CashLedgerDatabase, OrderManagement where requires [Role::Operator]);
/// Records the missing collection of every delivered cash-on-delivery order that has none.
pub async fn repair_collections<B>(api: web::Data<CashLedgerApi<B>>) -> Result<HttpResponse, ServerError>
where B: CashLedgerDatabase + OrderManagement {
    info!("💻️ POST repair missing collections");
    let outcomes = api.repair_missing_collections().await?;
    let repaired = outcomes.iter().filter(|o| o.is_created()).count();
    Ok(HttpResponse::Ok().json(json!({
        "repaired": repaired,
        "outcomes": outcomes,
    })))
}

route!(courier_dashboard => Get "/admin/cash/delivery-personnel" impl LedgerReporting, CashLedgerDatabase where requires [Role::Operator]);
/// One entry per courier: all-time totals per status, today's collections and the most recent pending ones.
pub async fn courier_dashboard<B>(api: web::Data<ReportingApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerReporting + CashLedgerDatabase {
    debug!("💻️ GET courier dashboard");
    let entries = api.courier_dashboard().await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(cash_report => Get "/admin/cash/report" impl LedgerReporting, CashLedgerDatabase where requires [Role::Operator]);
/// Per-courier and overall totals for collections made in `[from, to)`. Both bounds are required, as RFC 3339
/// timestamps.
pub async fn cash_report<B>(
    query: web::Query<DateRangeQuery>,
    api: web::Data<ReportingApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerReporting + CashLedgerDatabase,
{
    let (from, to) = query.required_range()?;
    debug!("💻️ GET cash report from {from} to {to}");
    let report = api.cash_report(from, to).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(status_totals => Get "/admin/cash/totals" impl LedgerReporting, CashLedgerDatabase where requires [Role::Operator]);
/// Count and amount per submission status, optionally restricted to `[from, to)`.
pub async fn status_totals<B>(
    query: web::Query<DateRangeQuery>,
    api: web::Data<ReportingApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerReporting + CashLedgerDatabase,
{
    let range = query.range()?;
    debug!("💻️ GET status totals {range:?}");
    let report = api.status_totals(range).await?;
    Ok(HttpResponse::Ok().json(report))
}
