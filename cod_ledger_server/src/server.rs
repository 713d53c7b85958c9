use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use cod_ledger_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CashLedgerApi,
    DeliveryFlowApi,
    ReportingApi,
    SqliteDatabase,
};
use log::*;

use crate::{
    auth::TokenValidator,
    config::ServerConfig,
    errors::ServerError,
    middleware::JwtAuthFactory,
    routes::{configure_routes, health},
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        info!("🚀️ Running database migrations");
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    }
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Customer notifications. There is no SMS gateway wired in, so issued codes are announced in the log, without the
/// code itself.
fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_code_issued(|ev| {
            Box::pin(async move {
                let recipient = ev.customer_ref.as_deref().unwrap_or("the customer");
                info!(
                    "📬️ Confirmation code for order {} sent to {recipient} (resend #{}, expires {})",
                    ev.order_number, ev.resend_count, ev.expires_at
                );
            })
        })
        .on_cash_collected(|ev| {
            Box::pin(async move {
                debug!(
                    "📬️ {} collected {} for order {}",
                    ev.collection.courier_id, ev.collection.amount, ev.collection.order_number
                );
            })
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let options = config.ledger;
        let delivery_api = DeliveryFlowApi::new(db.clone(), producers.clone())
            .with_code_policy(options.confirmation)
            .with_retry_policy(options.retry);
        let cash_api = CashLedgerApi::new(db.clone(), producers.clone())
            .with_allocation(options.allocation)
            .with_retry_policy(options.retry);
        let reporting_api = ReportingApi::new(db.clone());
        let validator = TokenValidator::new(&config.auth);
        // Routes that require authentication
        let api_scope =
            web::scope("/api").wrap(JwtAuthFactory::new(validator)).configure(configure_routes::<SqliteDatabase>);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cod::access_log"))
            .app_data(web::Data::new(delivery_api))
            .app_data(web::Data::new(cash_api))
            .app_data(web::Data::new(reporting_api))
            .service(api_scope)
            .service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
