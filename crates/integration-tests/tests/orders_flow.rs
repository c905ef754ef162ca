//! Checkout: building an order from the cart and placing it.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use prepbox_client::error::ApiError;
use prepbox_client::events::Topic;
use prepbox_core::AddressId;
use prepbox_integration_tests::{MockApi, init_tracing, signed_in_client};

fn fill_cart(app: &prepbox_client::state::AppState) {
    let meal = serde_json::from_value(prepbox_integration_tests::fixture_meal(
        "m1",
        "Grilled Chicken Bowl",
        "15.500",
    ))
    .expect("meal fixture");
    app.cart().add_meal(meal, 5);
    app.cart().set_delivery_address(Some(AddressId::from("addr-1")));
}

#[tokio::test]
async fn test_place_order_clears_cart_and_announces() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    app.subscriptions().fetch_current().await.expect("subscription");
    fill_cart(&app);

    let created = Arc::new(Mutex::new(false));
    let created_flag = Arc::clone(&created);
    app.bus().subscribe(Topic::OrderCreated, move |_| {
        *created_flag.lock().expect("flag lock") = true;
    });

    let order = app.orders().place_order().await.expect("place order");

    assert_eq!(app.cart().meal_count(), 0);
    assert!(*created.lock().expect("flag lock"));
    assert_eq!(app.orders_store().order(&order.id).expect("stored").id, order.id);

    // The wire request carried the cart verbatim.
    let posted = api.state.orders_posted.lock().expect("posted lock");
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0]["subscriptionId"], "sub-1");
    assert_eq!(posted[0]["deliveryAddressId"], "addr-1");
    assert_eq!(posted[0]["meals"][0]["mealId"], "m1");
    assert_eq!(posted[0]["meals"][0]["quantity"], 5);
    assert!(posted[0].get("discountCode").is_none());
}

#[tokio::test]
async fn test_underfilled_cart_is_rejected_before_the_network() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    app.subscriptions().fetch_current().await.expect("subscription");
    let meal = serde_json::from_value(prepbox_integration_tests::fixture_meal(
        "m1",
        "Grilled Chicken Bowl",
        "15.500",
    ))
    .expect("meal fixture");
    app.cart().add_meal(meal, 2);
    app.cart().set_delivery_address(Some(AddressId::from("addr-1")));

    let result = app.orders().place_order().await;
    assert!(matches!(result, Err(ApiError::Validation { .. })));
    assert!(api.state.orders_posted.lock().expect("posted lock").is_empty());
    // The cart is kept so the user can fix it.
    assert_eq!(app.cart().meal_count(), 2);
}

#[tokio::test]
async fn test_order_without_subscription_is_rejected() {
    init_tracing();
    let api = MockApi::start().await;
    api.state.has_subscription.store(false, Ordering::Relaxed);
    let app = signed_in_client(&api).await;

    assert!(app.subscriptions().fetch_current().await.expect("fetch").is_none());
    fill_cart(&app);

    let result = app.orders().place_order().await;
    assert!(matches!(result, Err(ApiError::Validation { .. })));
    assert!(api.state.orders_posted.lock().expect("posted lock").is_empty());
}

#[tokio::test]
async fn test_order_history_lists_placed_orders() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    app.subscriptions().fetch_current().await.expect("subscription");
    fill_cart(&app);
    app.orders().place_order().await.expect("place order");

    let orders = app.orders().list_orders(1).await.expect("history");
    assert_eq!(orders.items.len(), 1);
    assert_eq!(app.orders_store().upcoming().len(), 1);
}
