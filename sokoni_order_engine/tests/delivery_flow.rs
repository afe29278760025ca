use sok_common::Cents;
use sokoni_order_engine::{
    db_types::{OrderId, OrderStatusType, PaymentMethod, ShipmentStatus, ShipmentType},
    events::EventProducers,
    helpers::is_valid_tracking_number,
    order_objects::{NewOrderRequest, ShipmentRequest},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{kisumu, mombasa, nairobi, seed_biker, seed_carrier, seed_listing},
    },
    DeliveryApi, DeliveryApiError, OrderFlowApi, ShipmentError, ShipmentManagement, ShipmentStatusUpdate,
    SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Creates a paid order for one unit of a seeded Nairobi listing, shipped to
/// the given address.
async fn paid_order(db: &SqliteDatabase, ship_to: sokoni_order_engine::db_types::Location) -> OrderId {
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = api
        .create_order(NewOrderRequest {
            buyer_id: "buyer-1".to_string(),
            listing_id,
            quantity: 1,
            payment_method: PaymentMethod::Card,
            ship_to,
            shipping_cost: Some(Cents::from_whole(5)),
        })
        .await
        .unwrap();
    api.payment_captured(&order.order_id, order.total_amount).await.unwrap();
    order.order_id
}

#[tokio::test]
async fn candidates_are_ordered_by_rating_then_load_then_id() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    let low = seed_biker(&db, "Pole Pole Couriers", 4.1).await.unwrap();
    let high_late = seed_biker(&db, "Haraka Riders", 4.9).await.unwrap();
    let high_early = seed_biker(&db, "Boda Express", 4.9).await.unwrap();

    let candidates =
        api.find_available_partners(&nairobi("City Market"), &nairobi("14 Moi Avenue")).await.unwrap();
    let ids = candidates.iter().map(|p| p.id).collect::<Vec<_>>();
    // Equal ratings tie-break on fewest deliveries, then lowest id
    assert_eq!(ids, vec![high_late, high_early, low]);
}

#[tokio::test]
async fn unverified_or_inactive_partners_are_never_candidates() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    let id = db
        .insert_partner("Shadow Riders", sokoni_order_engine::db_types::PartnerType::Biker, Cents::from(2_00), Cents::from(50), 5.0, false, true)
        .await
        .unwrap();
    db.add_partner_city(id, "Nairobi").await.unwrap();

    let candidates =
        api.find_available_partners(&nairobi("City Market"), &nairobi("14 Moi Avenue")).await.unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn no_route_means_no_coverage() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    // A carrier exists, but only on the Nairobi ↔ Mombasa route
    seed_carrier(&db, "Trans-Rift Coaches", 4.6).await.unwrap();

    let candidates = api.find_available_partners(&nairobi("City Market"), &kisumu("Oginga St")).await.unwrap();
    assert!(candidates.is_empty());

    let order_id = paid_order(&db, kisumu("Oginga St")).await;
    let err = api.create_shipment(ShipmentRequest { order_id, scheduled_pickup_at: None }).await.unwrap_err();
    assert!(matches!(err, DeliveryApiError::NoCoverageAvailable { .. }));
}

#[tokio::test]
async fn routes_match_in_either_direction() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    seed_carrier(&db, "Trans-Rift Coaches", 4.6).await.unwrap();

    let outbound = api.find_available_partners(&nairobi("City Market"), &mombasa("Nyali Rd")).await.unwrap();
    let inbound = api.find_available_partners(&mombasa("Nyali Rd"), &nairobi("City Market")).await.unwrap();
    assert_eq!(outbound.len(), 1);
    assert_eq!(inbound.len(), 1);
}

#[tokio::test]
async fn shipment_round_trip() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    seed_biker(&db, "Boda Express", 4.9).await.unwrap();
    let order_id = paid_order(&db, nairobi("14 Moi Avenue")).await;

    let shipment = api.create_shipment(ShipmentRequest { order_id: order_id.clone(), scheduled_pickup_at: None }).await.unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Assigned);
    assert_eq!(shipment.shipment_type, ShipmentType::Local);
    assert!(is_valid_tracking_number(&shipment.tracking_number));
    // Same-city seed coordinates: distance rounds to zero, so cost is the base rate
    assert_eq!(shipment.cost, Cents::from(2_00));

    let history = api.track(&shipment.tracking_number).await.unwrap();
    assert_eq!(history.shipment.id, shipment.id);
    assert_eq!(history.events.len(), 1);
    assert_eq!(history.events[0].status, ShipmentStatus::Assigned);

    // The order carries the tracking number and is now Shipped
    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = flow.order_with_escrow(&order_id).await.unwrap().unwrap().order;
    assert_eq!(order.status, OrderStatusType::Shipped);
    assert_eq!(order.tracking_number.as_deref(), Some(shipment.tracking_number.as_str()));

    // One shipment per order
    let err = api.create_shipment(ShipmentRequest { order_id, scheduled_pickup_at: None }).await.unwrap_err();
    assert!(matches!(err, DeliveryApiError::Backend(ShipmentError::ShipmentAlreadyExists(_))));
}

#[tokio::test]
async fn intercity_shipments_are_priced_by_distance() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    seed_carrier(&db, "Trans-Rift Coaches", 4.6).await.unwrap();
    let order_id = paid_order(&db, mombasa("Nyali Rd")).await;

    let shipment = api.create_shipment(ShipmentRequest { order_id, scheduled_pickup_at: None }).await.unwrap();
    assert_eq!(shipment.shipment_type, ShipmentType::Intercity);
    assert!(shipment.distance_km > 400.0 && shipment.distance_km < 500.0);
    // cost = base 10.00 + distance × 0.10/km
    let expected = Cents::from(10_00) + Cents::from(10).scale_by(shipment.distance_km);
    assert_eq!(shipment.cost, expected);
    // 300+ km bucket promises 48 h
    assert_eq!(shipment.eta_at - shipment.scheduled_pickup_at, chrono::Duration::hours(48));
}

#[tokio::test]
async fn status_updates_are_forward_only() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    seed_biker(&db, "Boda Express", 4.9).await.unwrap();
    let order_id = paid_order(&db, nairobi("14 Moi Avenue")).await;
    let shipment = api.create_shipment(ShipmentRequest { order_id, scheduled_pickup_at: None }).await.unwrap();

    // Skipping a step is rejected
    let err = api.update_shipment_status(shipment.id, ShipmentStatus::InTransit, Default::default()).await.unwrap_err();
    assert!(matches!(err, DeliveryApiError::Backend(ShipmentError::InvalidStatusTransition { .. })));

    for status in [ShipmentStatus::PickedUp, ShipmentStatus::InTransit, ShipmentStatus::Delivered] {
        api.update_shipment_status(shipment.id, status, Default::default()).await.unwrap();
    }

    // Terminal: no more transitions, not even Failed
    let err = api.update_shipment_status(shipment.id, ShipmentStatus::Failed, Default::default()).await.unwrap_err();
    assert!(matches!(err, DeliveryApiError::Backend(ShipmentError::InvalidStatusTransition { .. })));

    // Every transition appended an event, in order
    let history = api.track(&shipment.tracking_number).await.unwrap();
    let statuses = history.events.iter().map(|e| e.status).collect::<Vec<_>>();
    assert_eq!(
        statuses,
        vec![ShipmentStatus::Assigned, ShipmentStatus::PickedUp, ShipmentStatus::InTransit, ShipmentStatus::Delivered]
    );
}

#[tokio::test]
async fn delivery_accrues_partner_earnings_and_marks_the_order() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    let partner_id = seed_biker(&db, "Boda Express", 4.9).await.unwrap();
    let order_id = paid_order(&db, nairobi("14 Moi Avenue")).await;
    let shipment =
        api.create_shipment(ShipmentRequest { order_id: order_id.clone(), scheduled_pickup_at: None }).await.unwrap();

    for status in [ShipmentStatus::PickedUp, ShipmentStatus::InTransit, ShipmentStatus::Delivered] {
        api.update_shipment_status(shipment.id, status, Default::default()).await.unwrap();
    }

    let partner = db.fetch_partner(partner_id).await.unwrap().unwrap();
    assert_eq!(partner.total_deliveries, 1);
    assert_eq!(partner.earnings, shipment.cost.percent(80));

    let flow = OrderFlowApi::new(db.clone(), EventProducers::default());
    let order = flow.order_with_escrow(&order_id).await.unwrap().unwrap().order;
    assert_eq!(order.status, OrderStatusType::Delivered);
    // Delivery alone never releases escrow
    assert!(!order.escrow_released);
}

#[tokio::test]
async fn failed_is_reachable_from_any_non_terminal_state() {
    let db = new_db().await;
    let api = DeliveryApi::new(db.clone(), EventProducers::default());
    seed_biker(&db, "Boda Express", 4.9).await.unwrap();
    let order_id = paid_order(&db, nairobi("14 Moi Avenue")).await;
    let shipment = api.create_shipment(ShipmentRequest { order_id, scheduled_pickup_at: None }).await.unwrap();

    api.update_shipment_status(shipment.id, ShipmentStatus::PickedUp, Default::default()).await.unwrap();
    let update = ShipmentStatusUpdate { note: Some("Motorbike breakdown on Thika Road".into()), ..Default::default() };
    let failed = api.update_shipment_status(shipment.id, ShipmentStatus::Failed, update).await.unwrap();
    assert_eq!(failed.status, ShipmentStatus::Failed);
}
