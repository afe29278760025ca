use sok_common::Cents;
use sokoni_order_engine::{
    db_types::{OrderStatusType, PaymentMethod, PaymentStatus},
    events::EventProducers,
    order_objects::NewOrderRequest,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{nairobi, seed_auction_listing, seed_listing},
    },
    MarketplaceError, OrderFlowApi, OrderFlowError, SqliteDatabase,
};

async fn new_db() -> SqliteDatabase {
    let _ = env_logger::try_init();
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

fn checkout(buyer: &str, listing_id: i64, quantity: i64, shipping: Option<Cents>) -> NewOrderRequest {
    NewOrderRequest {
        buyer_id: buyer.to_string(),
        listing_id,
        quantity,
        payment_method: PaymentMethod::MobileMoney,
        ship_to: nairobi("14 Moi Avenue"),
        shipping_cost: shipping,
    }
}

#[tokio::test]
async fn create_order_computes_total() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();

    let order = api.create_order(checkout("buyer-1", listing_id, 2, Some(Cents::from_whole(50)))).await.unwrap();
    assert_eq!(order.total_amount, Cents::from(25_000));
    assert_eq!(order.unit_price, Cents::from_whole(100));
    assert_eq!(order.quantity, 2);
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    assert!(!order.escrow_released);

    // No escrow exists before payment capture
    let result = api.order_with_escrow(&order.order_id).await.unwrap().unwrap();
    assert!(result.escrow.is_none());
}

#[tokio::test]
async fn create_order_rejects_bad_requests() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();

    let err = api.create_order(checkout("buyer-1", listing_id, 0, None)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::InvalidQuantity(0)));

    let err = api.create_order(checkout("buyer-1", 9999, 1, None)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductUnavailable(9999)));

    let err = api.create_order(checkout("seller-1", listing_id, 1, None)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::SelfPurchaseDenied));

    db.set_listing_active(listing_id, false).await.unwrap();
    let err = api.create_order(checkout("buyer-1", listing_id, 1, None)).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::ProductUnavailable(_)));
}

#[tokio::test]
async fn auction_orders_use_the_highest_bid() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_auction_listing(&db, "seller-1", Cents::from_whole(80)).await.unwrap();
    db.insert_bid(listing_id, "bidder-a", Cents::from_whole(90)).await.unwrap();
    db.insert_bid(listing_id, "bidder-b", Cents::from_whole(120)).await.unwrap();

    let order = api.create_order(checkout("bidder-b", listing_id, 1, Some(Cents::from(0)))).await.unwrap();
    assert_eq!(order.unit_price, Cents::from_whole(120));
    assert_eq!(order.total_amount, Cents::from_whole(120));
}

#[tokio::test]
async fn auction_with_no_bids_falls_back_to_reserve() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_auction_listing(&db, "seller-1", Cents::from_whole(80)).await.unwrap();

    let order = api.create_order(checkout("buyer-1", listing_id, 1, Some(Cents::from(0)))).await.unwrap();
    assert_eq!(order.unit_price, Cents::from_whole(80));
}

#[tokio::test]
async fn payment_capture_confirms_order_and_holds_escrow() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = api.create_order(checkout("buyer-1", listing_id, 1, Some(Cents::from_whole(5)))).await.unwrap();

    let (order, escrow) = api.payment_captured(&order.order_id, order.total_amount).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(escrow.amount, order.total_amount);

    // A duplicate capture is a deterministic error, and exactly one escrow row exists
    let err = api.payment_captured(&order.order_id, order.total_amount).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Backend(MarketplaceError::EscrowAlreadyExists(_))));
    let result = api.order_with_escrow(&order.order_id).await.unwrap().unwrap();
    assert_eq!(result.escrow.unwrap().id, escrow.id);
}

#[tokio::test]
async fn payment_failure_leaves_the_order_pending() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = api.create_order(checkout("buyer-1", listing_id, 1, None)).await.unwrap();

    let order = api.payment_failed(&order.order_id, "card declined").await.unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
}

#[tokio::test]
async fn cancelling_a_confirmed_order_refunds_escrow() {
    let db = new_db().await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let listing_id = seed_listing(&db, "seller-1", Cents::from_whole(100)).await.unwrap();
    let order = api.create_order(checkout("buyer-1", listing_id, 1, None)).await.unwrap();
    api.payment_captured(&order.order_id, order.total_amount).await.unwrap();

    let cancelled = api.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
    let result = api.order_with_escrow(&order.order_id).await.unwrap().unwrap();
    assert_eq!(result.escrow.unwrap().status, sokoni_order_engine::db_types::EscrowStatus::Refunded);

    // Terminal: cancelling twice is a conflict
    let err = api.cancel_order(&order.order_id).await.unwrap_err();
    assert!(matches!(err, OrderFlowError::Backend(MarketplaceError::CannotCancel { .. })));
}
