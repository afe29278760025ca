use sok_common::Cents;
use sokoni_order_engine::{
    db_types::{DisputeOutcome, DisputeStatus, EscrowStatus, OrderId, PaymentMethod, PaymentStatus, ShipmentStatus},
    events::EventProducers,
    order_objects::{NewOrderRequest, ShipmentRequest},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{nairobi, seed_biker, seed_listing},
    },
    DeliveryApi, DisputeApi, DisputeApiError, DisputeError, EscrowApi, EscrowApiError, MarketplaceError, OrderFlowApi,
    OrderManagement, SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Runs an order from checkout all the way to courier-delivered. Escrow is
/// held; release is still pending buyer confirmation.
async fn delivered_order(db: &SqliteDatabase) -> OrderId {
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let delivery = DeliveryApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(db, "seller-1", Cents::from_whole(100)).await.unwrap();
    seed_biker(db, "Boda Express", 4.9).await.unwrap();
    let order = flow
        .create_order(NewOrderRequest {
            buyer_id: "buyer-1".to_string(),
            listing_id,
            quantity: 2,
            payment_method: PaymentMethod::MobileMoney,
            ship_to: nairobi("14 Moi Avenue"),
            shipping_cost: Some(Cents::from_whole(50)),
        })
        .await
        .unwrap();
    flow.payment_captured(&order.order_id, order.total_amount).await.unwrap();
    let shipment = delivery
        .create_shipment(ShipmentRequest { order_id: order.order_id.clone(), scheduled_pickup_at: None })
        .await
        .unwrap();
    for status in [ShipmentStatus::PickedUp, ShipmentStatus::InTransit, ShipmentStatus::Delivered] {
        delivery.update_shipment_status(shipment.id, status, Default::default()).await.unwrap();
    }
    order.order_id
}

#[tokio::test]
async fn buyer_confirmation_releases_escrow_exactly_once() {
    let db = new_db().await;
    let escrow_api = EscrowApi::new(db.clone(), EventProducers::default());
    let order_id = delivered_order(&db).await;

    let escrow = escrow_api.confirm_delivery(&order_id, "buyer-1").await.unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    let order = db.fetch_order_by_order_id(&order_id).await.unwrap().unwrap();
    assert!(order.escrow_released);

    // The second confirmation loses the conditional update and reports the
    // conflict; the escrow is not touched again.
    let err = escrow_api.confirm_delivery(&order_id, "buyer-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::EscrowNotHeld(_))));
    let escrow = escrow_api.escrow_for_order(&order_id).await.unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
}

#[tokio::test]
async fn only_the_buyer_may_confirm_delivery() {
    let db = new_db().await;
    let escrow_api = EscrowApi::new(db.clone(), EventProducers::default());
    let order_id = delivered_order(&db).await;

    let err = escrow_api.confirm_delivery(&order_id, "seller-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::NotBuyer));
    let escrow = escrow_api.escrow_for_order(&order_id).await.unwrap().unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);
}

#[tokio::test]
async fn confirmation_requires_a_delivered_order() {
    let db = new_db().await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let escrow_api = EscrowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = flow
        .create_order(NewOrderRequest {
            buyer_id: "buyer-1".to_string(),
            listing_id,
            quantity: 1,
            payment_method: PaymentMethod::Card,
            ship_to: nairobi("14 Moi Avenue"),
            shipping_cost: None,
        })
        .await
        .unwrap();
    flow.payment_captured(&order.order_id, order.total_amount).await.unwrap();

    let err = escrow_api.confirm_delivery(&order.order_id, "buyer-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::OrderNotDelivered(_))));
}

#[tokio::test]
async fn hold_funds_is_idempotent_in_the_error_sense() {
    let db = new_db().await;
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let escrow_api = EscrowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = flow
        .create_order(NewOrderRequest {
            buyer_id: "buyer-1".to_string(),
            listing_id,
            quantity: 1,
            payment_method: PaymentMethod::Card,
            ship_to: nairobi("14 Moi Avenue"),
            shipping_cost: None,
        })
        .await
        .unwrap();

    let (_, escrow) = escrow_api.hold_funds(&order.order_id, order.total_amount).await.unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);
    let err = escrow_api.hold_funds(&order.order_id, order.total_amount).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::EscrowAlreadyExists(_))));
}

#[tokio::test]
async fn an_open_dispute_blocks_release_until_resolved() {
    let db = new_db().await;
    let escrow_api = EscrowApi::new(db.clone(), EventProducers::default());
    let dispute_api = DisputeApi::new(db.clone(), EventProducers::default());
    let order_id = delivered_order(&db).await;

    let dispute = dispute_api.open_dispute(&order_id, "buyer-1", "Box arrived empty").await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);

    let err = escrow_api.confirm_delivery(&order_id, "buyer-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::DisputeOpen(_))));

    // Under review the gate still holds
    dispute_api.begin_review(dispute.id).await.unwrap();
    let err = escrow_api.confirm_delivery(&order_id, "buyer-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::DisputeOpen(_))));

    // Refund resolution: money goes back to the buyer, never to the seller
    let (resolved, escrow) = dispute_api.resolve_dispute(dispute.id, DisputeOutcome::Refund).await.unwrap();
    assert_eq!(resolved.status, DisputeStatus::Resolved);
    assert_eq!(resolved.outcome, DisputeOutcome::Refund);
    assert_eq!(escrow.status, EscrowStatus::Refunded);
    let order = db.fetch_order_by_order_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Refunded);
    assert!(!order.escrow_released);

    // With the escrow refunded, a late confirmation is a conflict
    let err = escrow_api.confirm_delivery(&order_id, "buyer-1").await.unwrap_err();
    assert!(matches!(err, EscrowApiError::Backend(MarketplaceError::EscrowNotHeld(_))));
}

#[tokio::test]
async fn release_resolution_is_the_admin_override_path() {
    let db = new_db().await;
    let dispute_api = DisputeApi::new(db.clone(), EventProducers::default());
    let order_id = delivered_order(&db).await;
    let dispute = dispute_api.open_dispute(&order_id, "buyer-1", "Changed my mind").await.unwrap();

    // No buyer confirmation happens; the admin releases directly
    let (_, escrow) = dispute_api.resolve_dispute(dispute.id, DisputeOutcome::Release).await.unwrap();
    assert_eq!(escrow.status, EscrowStatus::Released);
    let order = db.fetch_order_by_order_id(&order_id).await.unwrap().unwrap();
    assert!(order.escrow_released);
}

#[tokio::test]
async fn dispute_rules() {
    let db = new_db().await;
    let dispute_api = DisputeApi::new(db.clone(), EventProducers::default());
    let order_id = delivered_order(&db).await;

    // Only the buyer may dispute
    let err = dispute_api.open_dispute(&order_id, "seller-1", "I want the money now").await.unwrap_err();
    assert!(matches!(err, DisputeApiError::NotBuyer));

    let dispute = dispute_api.open_dispute(&order_id, "buyer-1", "Wrong colour").await.unwrap();

    // One open dispute per order
    let err = dispute_api.open_dispute(&order_id, "buyer-1", "Also late").await.unwrap_err();
    assert!(matches!(err, DisputeApiError::Backend(DisputeError::DisputeAlreadyOpen(_))));

    // Resolution without an outcome is rejected
    let err = dispute_api.resolve_dispute(dispute.id, DisputeOutcome::None).await.unwrap_err();
    assert!(matches!(err, DisputeApiError::Backend(DisputeError::OutcomeRequired)));

    dispute_api.resolve_dispute(dispute.id, DisputeOutcome::Refund).await.unwrap();
    let err = dispute_api.resolve_dispute(dispute.id, DisputeOutcome::Refund).await.unwrap_err();
    assert!(matches!(err, DisputeApiError::Backend(DisputeError::DisputeAlreadyResolved(_))));

    // Resolved disputes unblock the order; a fresh dispute may be opened
    let second = dispute_api.open_dispute(&order_id, "buyer-1", "Still wrong colour").await.unwrap();
    assert_eq!(second.status, DisputeStatus::Open);

    let err = dispute_api.dispute_by_id(9_999).await.unwrap();
    assert!(err.is_none());
}
