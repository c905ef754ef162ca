//! Session lifecycle against the mock backend: refresh-and-retry, refresh
//! single-flight, restart restore, and expiry.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use prepbox_client::error::ApiError;
use prepbox_client::events::Topic;
use prepbox_integration_tests::{MockApi, init_tracing, signed_in_client};

#[tokio::test]
async fn test_expired_access_token_refreshes_and_retries_once() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    api.state.expire_access_tokens();

    let orders = app.orders().list_orders(1).await.expect("orders after refresh");
    assert!(orders.items.is_empty());

    // One failed attempt, one refresh, one successful retry.
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);
    assert_eq!(api.state.deliveries_calls.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn test_revoked_refresh_token_fails_without_looping() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    let expired = Arc::new(Mutex::new(false));
    let expired_flag = Arc::clone(&expired);
    app.bus().subscribe(Topic::SessionExpired, move |_| {
        *expired_flag.lock().expect("flag lock") = true;
    });

    api.state.expire_access_tokens();
    api.state.revoke_refresh_tokens();

    let result = app.orders().list_orders(1).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    // Exactly one refresh attempt, exactly one delivery attempt.
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);
    assert_eq!(api.state.deliveries_calls.load(Ordering::Relaxed), 1);

    // The session ended and the UI was told.
    assert!(!app.session().is_authenticated());
    assert!(*expired.lock().expect("flag lock"));
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    api.state.expire_access_tokens();
    // Hold the first refresher on the wire long enough for the others to
    // queue behind it.
    api.state.refresh_delay_ms.store(200, Ordering::Relaxed);

    let (a, b, c) = tokio::join!(
        app.orders().list_orders(1),
        app.orders().list_orders(1),
        app.orders().list_orders(1),
    );
    a.expect("first caller");
    b.expect("second caller");
    c.expect("third caller");

    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_refresh_outage_mid_request_ends_the_session() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    let expired = Arc::new(Mutex::new(false));
    let expired_flag = Arc::clone(&expired);
    app.bus().subscribe(Topic::SessionExpired, move |_| {
        *expired_flag.lock().expect("flag lock") = true;
    });

    api.state.expire_access_tokens();
    api.state.fail_refresh.store(true, Ordering::Relaxed);

    let result = app.orders().list_orders(1).await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));

    // A refresh the server cannot honor leaves no half-alive session: the
    // dead access token is dropped and the UI is routed to sign-in.
    assert!(!app.session().is_authenticated());
    assert!(*expired.lock().expect("flag lock"));
}

#[tokio::test]
async fn test_session_restores_across_restart() {
    init_tracing();
    let api = MockApi::start().await;
    let data_dir = prepbox_integration_tests::fresh_data_dir();

    {
        let config = api.client_config_with_dir(data_dir.clone());
        let app = prepbox_client::state::AppState::new(config).expect("app state");
        app.auth()
            .login("amira@prepbox.tn", "correct-password")
            .await
            .expect("login");
    }

    // New process, same disk: init exchanges the persisted refresh token.
    let config = api.client_config_with_dir(data_dir);
    let app = prepbox_client::state::AppState::new(config).expect("app state");
    assert!(app.session().init().await);
    assert!(app.session().is_authenticated());
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);

    // The persisted profile is available without any fetch.
    let user = app.auth_store().user().expect("restored profile");
    assert_eq!(user.email, "amira@prepbox.tn");
}

#[tokio::test]
async fn test_failed_restore_purges_the_persisted_token() {
    init_tracing();
    let api = MockApi::start().await;
    let data_dir = prepbox_integration_tests::fresh_data_dir();

    {
        let config = api.client_config_with_dir(data_dir.clone());
        let app = prepbox_client::state::AppState::new(config).expect("app state");
        app.auth()
            .login("amira@prepbox.tn", "correct-password")
            .await
            .expect("login");
    }

    api.state.revoke_refresh_tokens();

    // The restore fails and the stale token goes with it.
    let config = api.client_config_with_dir(data_dir.clone());
    let app = prepbox_client::state::AppState::new(config).expect("app state");
    assert!(!app.session().init().await);
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);

    // The next launch finds nothing to retry with.
    let config = api.client_config_with_dir(data_dir);
    let app = prepbox_client::state::AppState::new(config).expect("app state");
    assert!(!app.session().init().await);
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn test_init_is_idempotent() {
    init_tracing();
    let api = MockApi::start().await;
    let data_dir = prepbox_integration_tests::fresh_data_dir();

    {
        let config = api.client_config_with_dir(data_dir.clone());
        let app = prepbox_client::state::AppState::new(config).expect("app state");
        app.auth()
            .login("amira@prepbox.tn", "correct-password")
            .await
            .expect("login");
    }

    let config = api.client_config_with_dir(data_dir);
    let app = prepbox_client::state::AppState::new(config).expect("app state");
    assert!(app.session().init().await);
    assert!(app.session().init().await);
    assert!(app.session().init().await);

    // Only the first init hit the network.
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 1);
    assert!(app.session().has_pending_renewal());
}

#[tokio::test]
async fn test_fresh_device_initializes_signed_out() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    assert!(!app.session().init().await);
    assert!(!app.session().is_authenticated());
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 0);
}
