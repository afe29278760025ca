use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};
use sok_common::{Cents, Secret};
use sokoni_order_engine::{
    events::EventProducers,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_biker, seed_listing},
    },
    DeliveryApi, DisputeApi, EscrowApi, OrderFlowApi, SqliteDatabase,
};

use crate::{
    auth::{sign_payload, AdminAuth, WebhookAuth, ADMIN_KEY_HEADER, WEBHOOK_SIGNATURE_HEADER},
    config::ServerOptions,
    routes::{
        health, CancelOrderRoute, ConfirmDeliveryRoute, CreateOrderRoute, CreateShipmentRoute, OpenDisputeRoute,
        OrderByIdRoute, PaymentWebhookRoute, ResolveDisputeRoute, ReviewDisputeRoute, TrackRoute,
        UpdateShipmentStatusRoute,
    },
};

const ADMIN_KEY: &str = "test-admin-key";
const WEBHOOK_SECRET: &str = "test-webhook-secret";

async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Builds a test service wired exactly like [`crate::server::create_server_instance`].
macro_rules! test_app {
    ($db:expr) => {{
        let producers = EventProducers::default();
        let db = $db.clone();
        test::init_service(
            App::new()
                .app_data(web::Data::new(OrderFlowApi::new(db.clone(), producers.clone())))
                .app_data(web::Data::new(EscrowApi::new(db.clone(), producers.clone())))
                .app_data(web::Data::new(DeliveryApi::new(db.clone(), producers.clone())))
                .app_data(web::Data::new(DisputeApi::new(db.clone(), producers.clone())))
                .app_data(web::Data::new(AdminAuth::new(Secret::new(ADMIN_KEY.to_string()))))
                .app_data(web::Data::new(WebhookAuth::new(Secret::new(WEBHOOK_SECRET.to_string()), true)))
                .app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false, use_forwarded: false }))
                .service(health)
                .service(
                    web::scope("/api")
                        .service(CreateOrderRoute::<SqliteDatabase>::new())
                        .service(OrderByIdRoute::<SqliteDatabase>::new())
                        .service(CancelOrderRoute::<SqliteDatabase>::new())
                        .service(ConfirmDeliveryRoute::<SqliteDatabase>::new())
                        .service(OpenDisputeRoute::<SqliteDatabase>::new())
                        .service(ReviewDisputeRoute::<SqliteDatabase>::new())
                        .service(ResolveDisputeRoute::<SqliteDatabase>::new())
                        .service(CreateShipmentRoute::<SqliteDatabase>::new())
                        .service(UpdateShipmentStatusRoute::<SqliteDatabase>::new())
                        .service(TrackRoute::<SqliteDatabase>::new()),
                )
                .service(web::scope("/webhook").service(PaymentWebhookRoute::<SqliteDatabase>::new())),
        )
        .await
    }};
}

fn checkout_body(listing_id: i64, quantity: i64) -> Value {
    json!({
        "buyer_id": "buyer-1",
        "listing_id": listing_id,
        "quantity": quantity,
        "payment_method": "MobileMoney",
        "ship_to": { "street": "14 Moi Avenue", "city": "Nairobi", "lat": -1.2864, "lng": 36.8172 },
        "shipping_cost": 500
    })
}

#[actix_web::test]
async fn health_check() {
    let db = new_db().await;
    let app = test_app!(db);
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn create_and_fetch_an_order() {
    let db = new_db().await;
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let app = test_app!(db);

    let req = test::TestRequest::post().uri("/api/orders").set_json(checkout_body(listing_id, 2)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = test::read_body_json(resp).await;
    assert_eq!(order["total_amount"], json!(20_500));
    let order_id = order["order_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get().uri(&format!("/api/orders/{order_id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let result: Value = test::read_body_json(resp).await;
    assert_eq!(result["order"]["status"], json!("Pending"));
    assert!(result["escrow"].is_null());

    let req = test::TestRequest::get().uri("/api/orders/SO-DOESNOTEXIST").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn invalid_orders_are_bad_requests() {
    let db = new_db().await;
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let app = test_app!(db);

    let req = test::TestRequest::post().uri("/api/orders").set_json(checkout_body(listing_id, 0)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_requires_a_valid_signature() {
    let db = new_db().await;
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let app = test_app!(db);

    let req = test::TestRequest::post().uri("/api/orders").set_json(checkout_body(listing_id, 1)).to_request();
    let order: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let order_id = order["order_id"].as_str().unwrap().to_string();
    let total = order["total_amount"].as_i64().unwrap();

    let body = serde_json::to_vec(&json!({ "event": "captured", "order_id": order_id, "amount": total })).unwrap();

    // Unsigned and mis-signed notifications are rejected
    let req = test::TestRequest::post()
        .uri("/webhook/payments")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/webhook/payments")
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, sign_payload("wrong-secret", &body)))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A correctly signed capture confirms the order and holds escrow
    let req = test::TestRequest::post()
        .uri("/webhook/payments")
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, sign_payload(WEBHOOK_SECRET, &body)))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri(&format!("/api/orders/{order_id}")).to_request();
    let result: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(result["order"]["status"], json!("Confirmed"));
    assert_eq!(result["escrow"]["status"], json!("Held"));

    // A duplicate capture is a conflict
    let req = test::TestRequest::post()
        .uri("/webhook/payments")
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, sign_payload(WEBHOOK_SECRET, &body)))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
async fn admin_endpoints_are_fenced_by_the_admin_key() {
    let db = new_db().await;
    let app = test_app!(db);

    let req = test::TestRequest::post().uri("/api/disputes/999/review").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // With the key, the request reaches the handler (and 404s on the unknown dispute)
    let req = test::TestRequest::post()
        .uri("/api/disputes/999/review")
        .insert_header((ADMIN_KEY_HEADER, ADMIN_KEY))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn full_lifecycle_over_http() {
    let db = new_db().await;
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    seed_biker(&db, "Boda Express", 4.9).await.unwrap();
    let app = test_app!(db);

    // Checkout
    let req = test::TestRequest::post().uri("/api/orders").set_json(checkout_body(listing_id, 1)).to_request();
    let order: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let order_id = order["order_id"].as_str().unwrap().to_string();
    let total = order["total_amount"].as_i64().unwrap();

    // Payment capture
    let body = serde_json::to_vec(&json!({ "event": "captured", "order_id": order_id, "amount": total })).unwrap();
    let req = test::TestRequest::post()
        .uri("/webhook/payments")
        .insert_header(("content-type", "application/json"))
        .insert_header((WEBHOOK_SIGNATURE_HEADER, sign_payload(WEBHOOK_SECRET, &body)))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // Dispatch
    let req = test::TestRequest::post().uri("/api/shipments").set_json(json!({ "order_id": order_id })).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let shipment: Value = test::read_body_json(resp).await;
    let shipment_id = shipment["id"].as_i64().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap().to_string();

    // Courier progress
    for status in ["PickedUp", "InTransit", "Delivered"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/shipments/{shipment_id}/status"))
            .set_json(json!({ "status": status }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    // Tracking timeline shows the full forward-only history
    let req = test::TestRequest::get().uri(&format!("/api/tracking/{tracking_number}")).to_request();
    let history: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let statuses = history["events"].as_array().unwrap().iter().map(|e| e["status"].clone()).collect::<Vec<_>>();
    assert_eq!(statuses, vec![json!("Assigned"), json!("PickedUp"), json!("InTransit"), json!("Delivered")]);

    // Buyer confirms; escrow releases
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{order_id}/confirm"))
        .set_json(json!({ "buyer_id": "buyer-1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let escrow: Value = test::read_body_json(resp).await;
    assert_eq!(escrow["status"], json!("Released"));

    // A second confirmation is a conflict, not a double release
    let req = test::TestRequest::post()
        .uri(&format!("/api/orders/{order_id}/confirm"))
        .set_json(json!({ "buyer_id": "buyer-1" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
}
