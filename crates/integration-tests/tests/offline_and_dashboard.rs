//! Offline fallback, the error side-channel, and the dashboard startup
//! orchestration.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use prepbox_client::error::ApiError;
use prepbox_client::events::{AppEvent, Topic};
use prepbox_integration_tests::{MockApi, init_tracing, signed_in_client};

#[tokio::test]
async fn test_catalog_survives_the_backend_going_away() {
    init_tracing();
    let api = MockApi::start().await;
    let data_dir = prepbox_integration_tests::fresh_data_dir();

    {
        let config = api.client_config_with_dir(data_dir.clone());
        let app = prepbox_client::state::AppState::new(config).expect("app state");
        let meals = app.meals().list_meals().await.expect("first fetch");
        assert_eq!(meals.len(), 2);
    }

    // Take the backend down, restart the client on the same disk.
    let config = api.client_config_with_dir(data_dir);
    drop(api);
    let app = prepbox_client::state::AppState::new(config).expect("app state");

    let meals = app.meals().list_meals().await.expect("cached fetch");
    assert_eq!(meals.len(), 2);
    assert_eq!(app.meals_store().meals().len(), 2);

    let menu = app.meals().current_menu().await;
    // The menu was never fetched, so there is nothing cached to fall
    // back on.
    assert!(matches!(menu, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn test_offline_with_empty_cache_surfaces_network_error() {
    init_tracing();
    let api = MockApi::start().await;
    let config = api.client_config();
    drop(api);

    let app = prepbox_client::state::AppState::new(config).expect("app state");
    let result = app.meals().list_meals().await;
    assert!(matches!(result, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn test_non_2xx_responses_are_announced_on_the_bus() {
    init_tracing();
    let api = MockApi::start().await;
    api.state.has_subscription.store(false, Ordering::Relaxed);
    let app = signed_in_client(&api).await;

    let announced = Arc::new(Mutex::new(None));
    let announced_inner = Arc::clone(&announced);
    app.bus().subscribe(Topic::ServerError, move |event| {
        if let AppEvent::ServerError { status, message } = event {
            *announced_inner.lock().expect("flag lock") = Some((*status, message.clone()));
        }
    });

    // The service absorbs the 404, but the error surface still hears about
    // it with the server's own message.
    let current = app.subscriptions().fetch_current().await.expect("fetch");
    assert!(current.is_none());

    let (status, message) = announced
        .lock()
        .expect("flag lock")
        .clone()
        .expect("announced server error");
    assert_eq!(status, 404);
    assert_eq!(message, "No subscription");
}

#[tokio::test]
async fn test_dashboard_initialize_loads_everything_once() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    let load = app.dashboard().initialize().await;
    app.notifications().stop_stream();

    assert!(load.authenticated);
    assert!(load.profile && load.meals && load.menu);
    assert!(load.orders && load.subscription && load.notifications);

    // One catalog fetch, one order-history fetch; nothing duplicated.
    assert_eq!(api.state.meals_calls.load(Ordering::Relaxed), 1);
    assert_eq!(api.state.deliveries_calls.load(Ordering::Relaxed), 1);

    assert_eq!(app.meals_store().meals().len(), 2);
    assert!(app.subscription_store().is_active());
    assert_eq!(app.notifications_store().unread_count(), 1);
}

#[tokio::test]
async fn test_dashboard_initialize_signed_out_loads_public_catalog() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    let load = app.dashboard().initialize().await;

    assert!(!load.authenticated);
    assert!(load.meals && load.menu);
    assert!(!load.orders && !load.subscription && !load.notifications);
    assert_eq!(api.state.deliveries_calls.load(Ordering::Relaxed), 0);
}
