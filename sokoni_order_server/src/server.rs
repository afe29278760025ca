use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use sokoni_order_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    DeliveryApi, DisputeApi, EscrowApi, OrderFlowApi, SqliteDatabase,
};

use crate::{
    auth::{AdminAuth, WebhookAuth},
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    routes::{
        health, CancelOrderRoute, ConfirmDeliveryRoute, CreateOrderRoute, CreateShipmentRoute, OpenDisputeRoute,
        OrderByIdRoute, PaymentWebhookRoute, ResolveDisputeRoute, ReviewDisputeRoute, TrackRoute,
        UpdateShipmentStatusRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(10, default_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The stock hook set: log-only subscribers for every engine event. Deployments
/// wanting notifications or analytics replace these with their own handlers.
pub fn default_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("🪝️ Order {} paid. Escrow #{} holds {}.", ev.order.order_id, ev.escrow.id, ev.escrow.amount);
        })
    });
    hooks.on_order_delivered(|ev| {
        Box::pin(async move {
            info!("🪝️ Shipment [{}] delivered for order {}.", ev.shipment.tracking_number, ev.shipment.order_id);
        })
    });
    hooks.on_escrow_released(|ev| {
        Box::pin(async move {
            info!("🪝️ Escrow #{} for order {} released to the seller.", ev.escrow.id, ev.escrow.order_id);
        })
    });
    hooks.on_dispute_opened(|ev| {
        Box::pin(async move {
            info!("🪝️ Dispute #{} opened against order {}.", ev.dispute.id, ev.dispute.order_id);
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let escrow_api = EscrowApi::new(db.clone(), producers.clone());
        let delivery_api = DeliveryApi::new(db.clone(), producers.clone());
        let dispute_api = DisputeApi::new(db.clone(), producers.clone());
        let admin_auth = AdminAuth::new(config.admin_api_key.clone());
        let webhook_auth = WebhookAuth::new(config.payment_webhook_secret.clone(), config.webhook_signature_checks);
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sok::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(escrow_api))
            .app_data(web::Data::new(delivery_api))
            .app_data(web::Data::new(dispute_api))
            .app_data(web::Data::new(admin_auth))
            .app_data(web::Data::new(webhook_auth))
            .app_data(web::Data::new(options));
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(ConfirmDeliveryRoute::<SqliteDatabase>::new())
            .service(OpenDisputeRoute::<SqliteDatabase>::new())
            .service(ReviewDisputeRoute::<SqliteDatabase>::new())
            .service(ResolveDisputeRoute::<SqliteDatabase>::new())
            .service(CreateShipmentRoute::<SqliteDatabase>::new())
            .service(UpdateShipmentStatusRoute::<SqliteDatabase>::new())
            .service(TrackRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook").service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
