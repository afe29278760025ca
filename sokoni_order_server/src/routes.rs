//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. For this reason, any long, non-cpu-bound operation (e.g. I/O,
//! database operations, etc.) must be expressed as futures or asynchronous functions; async handlers get executed
//! concurrently by worker threads and thus don't block execution.
use actix_web::{get, web, HttpRequest, HttpResponse};
use log::*;
use sokoni_order_engine::{
    db_types::OrderId,
    order_objects::{NewOrderRequest, ShipmentRequest},
    DeliveryApi, DisputeApi, DisputeManagement, EscrowApi, MarketplaceDatabase, OrderFlowApi, OrderManagement,
    ShipmentManagement,
};

use crate::{
    auth::{RequireAdmin, WebhookAuth, WEBHOOK_SIGNATURE_HEADER},
    config::ServerOptions,
    data_objects::{
        ConfirmDeliveryRequest, JsonResponse, OpenDisputeRequest, PaymentNotification, ResolveDisputeRequest,
        ShipmentStatusRequest,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

// Actix-web cannot handle generics in handlers, so route registration is implemented manually using the `route!`
// macro. `route!(my_handler => Post "/path" impl SomeTrait, OtherTrait)` emits a `MyHandlerRoute<B>` service factory
// that registers `my_handler::<B>` with the trait bounds applied.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! {
            impl<B> [<$name:camel Route>]<B> {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self(core::marker::PhantomData)
                }
            }
        }
        paste::paste! {
            impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
            where B: $($bounds +)+ 'static
            {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name::<B>);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().json(JsonResponse::success("👍️"))
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl MarketplaceDatabase);
/// Checkout. The buyer-facing UI posts a [`NewOrderRequest`]; pricing is
/// computed server-side from the listing and the order is created `Pending`
/// awaiting payment capture.
pub async fn create_order<B: MarketplaceDatabase>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.create_order(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(order_by_id => Get "/orders/{order_id}" impl MarketplaceDatabase);
pub async fn order_by_id<B: MarketplaceDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id}");
    let result = api
        .order_with_escrow(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(result))
}

route!(cancel_order => Post "/orders/{order_id}/cancel" impl MarketplaceDatabase);
pub async fn cancel_order<B: MarketplaceDatabase>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api.cancel_order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Escrow  ----------------------------------------------------

route!(confirm_delivery => Post "/orders/{order_id}/confirm" impl MarketplaceDatabase);
/// The buyer confirms receipt, releasing escrow to the seller. This is the
/// only non-admin path that releases funds.
pub async fn confirm_delivery<B: MarketplaceDatabase>(
    path: web::Path<String>,
    body: web::Json<ConfirmDeliveryRequest>,
    api: web::Data<EscrowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let escrow = api.confirm_delivery(&order_id, &body.buyer_id).await?;
    Ok(HttpResponse::Ok().json(escrow))
}

//----------------------------------------------   Disputes  ----------------------------------------------------

route!(open_dispute => Post "/orders/{order_id}/disputes" impl DisputeManagement, OrderManagement);
pub async fn open_dispute<B: DisputeManagement + OrderManagement>(
    path: web::Path<String>,
    body: web::Json<OpenDisputeRequest>,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let dispute = api.open_dispute(&order_id, &body.buyer_id, &body.reason).await?;
    Ok(HttpResponse::Created().json(dispute))
}

route!(review_dispute => Post "/disputes/{dispute_id}/review" impl DisputeManagement, OrderManagement);
pub async fn review_dispute<B: DisputeManagement + OrderManagement>(
    _admin: RequireAdmin,
    path: web::Path<i64>,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let dispute = api.begin_review(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

route!(resolve_dispute => Post "/disputes/{dispute_id}/resolve" impl DisputeManagement, OrderManagement);
/// Admin adjudication: refund the buyer, or force-release to the seller.
pub async fn resolve_dispute<B: DisputeManagement + OrderManagement>(
    _admin: RequireAdmin,
    path: web::Path<i64>,
    body: web::Json<ResolveDisputeRequest>,
    api: web::Data<DisputeApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (dispute, escrow) = api.resolve_dispute(path.into_inner(), body.outcome).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "dispute": dispute, "escrow": escrow })))
}

//----------------------------------------------   Delivery  ----------------------------------------------------

route!(create_shipment => Post "/shipments" impl ShipmentManagement, MarketplaceDatabase);
/// The seller dispatches a paid order. Partner selection, pricing and the
/// initial tracking event all happen here.
pub async fn create_shipment<B: ShipmentManagement + MarketplaceDatabase>(
    body: web::Json<ShipmentRequest>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let shipment = api.create_shipment(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(shipment))
}

route!(update_shipment_status => Post "/shipments/{shipment_id}/status" impl ShipmentManagement, MarketplaceDatabase);
/// Couriers report progress here. Transitions are forward-only; an
/// out-of-order report is a 409.
pub async fn update_shipment_status<B: ShipmentManagement + MarketplaceDatabase>(
    path: web::Path<i64>,
    body: web::Json<ShipmentStatusRequest>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let req = body.into_inner();
    let shipment = api.update_shipment_status(path.into_inner(), req.status, req.update).await?;
    Ok(HttpResponse::Ok().json(shipment))
}

route!(track => Get "/tracking/{tracking_number}" impl ShipmentManagement, MarketplaceDatabase);
pub async fn track<B: ShipmentManagement + MarketplaceDatabase>(
    path: web::Path<String>,
    api: web::Data<DeliveryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let history = api.track(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

//----------------------------------------------   Payment webhook  ----------------------------------------------------

route!(payment_webhook => Post "/payments" impl MarketplaceDatabase);
/// Inbound notifications from the payment collaborator. The raw body is
/// HMAC-verified before anything is parsed.
pub async fn payment_webhook<B: MarketplaceDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    auth: web::Data<WebhookAuth>,
    options: web::Data<ServerOptions>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let remote = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    trace!("💻️💰️ Payment webhook received from {remote:?}");
    let signature = req.headers().get(WEBHOOK_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    auth.verify(&body, signature)?;
    let notification: PaymentNotification =
        serde_json::from_slice(&body).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
    match notification {
        PaymentNotification::Captured { order_id, amount } => {
            let (order, escrow) = api.payment_captured(&order_id, amount).await?;
            debug!("💻️💰️ Order {} confirmed; escrow #{} holds {amount}", order.order_id, escrow.id);
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {} confirmed", order.order_id))))
        },
        PaymentNotification::Failed { order_id, reason } => {
            api.payment_failed(&order_id, &reason).await?;
            Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Payment failure for {order_id} recorded"))))
        },
    }
}
