//! Sign-in, registration, and sign-out flows.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use prepbox_client::error::ApiError;
use prepbox_client::events::Topic;
use prepbox_client::services::{LoginOutcome, NewAccount};
use prepbox_integration_tests::{MockApi, init_tracing, signed_in_client};

#[tokio::test]
async fn test_login_populates_session_store_and_bus() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    let login_seen = Arc::new(Mutex::new(false));
    let login_flag = Arc::clone(&login_seen);
    app.bus().subscribe(Topic::AuthLogin, move |_| {
        *login_flag.lock().expect("flag lock") = true;
    });

    let outcome = app
        .auth()
        .login("amira@prepbox.tn", "correct-password")
        .await
        .expect("login");

    let LoginOutcome::SignedIn(user) = outcome else {
        panic!("expected a full sign-in");
    };
    assert_eq!(user.email, "amira@prepbox.tn");
    assert!(app.session().is_authenticated());
    assert!(app.auth_store().is_signed_in());
    assert!(app.session().has_pending_renewal());
    assert!(*login_seen.lock().expect("flag lock"));
}

#[tokio::test]
async fn test_login_with_wrong_password_stays_signed_out() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    let result = app.auth().login("amira@prepbox.tn", "wrong").await;
    assert!(matches!(result, Err(ApiError::Unauthorized)));
    assert!(!app.session().is_authenticated());
    assert!(!app.auth_store().is_signed_in());
    // A failed login must not trigger a refresh attempt.
    assert_eq!(api.state.refresh_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_two_factor_login_holds_the_temp_token_until_verified() {
    init_tracing();
    let api = MockApi::start().await;
    api.state
        .two_factor_enabled
        .store(true, std::sync::atomic::Ordering::Relaxed);
    let app = api.client();

    let outcome = app
        .auth()
        .login("amira@prepbox.tn", "correct-password")
        .await
        .expect("login");
    assert!(matches!(outcome, LoginOutcome::TwoFactorRequired));

    // Gated, not signed in: the temp token is the only thing held.
    assert!(!app.session().is_authenticated());
    assert!(app.auth_store().requires_two_factor());
    assert_eq!(
        app.auth_store().two_factor_temp_token().as_deref(),
        Some(prepbox_integration_tests::TEMP_TOKEN)
    );

    let user = app
        .auth()
        .verify_two_factor(prepbox_integration_tests::TWO_FACTOR_CODE)
        .await
        .expect("verify code");

    assert_eq!(user.email, "amira@prepbox.tn");
    assert!(app.session().is_authenticated());
    assert!(!app.auth_store().requires_two_factor());
    assert!(app.auth_store().two_factor_temp_token().is_none());
}

#[tokio::test]
async fn test_verify_without_pending_login_is_rejected_locally() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    let result = app.auth().verify_two_factor("123456").await;
    assert!(matches!(result, Err(ApiError::Validation { .. })));
}

#[tokio::test]
async fn test_register_signs_the_new_account_in() {
    init_tracing();
    let api = MockApi::start().await;
    let app = api.client();

    let user = app
        .auth()
        .register(&NewAccount {
            first_name: "Yassine".into(),
            last_name: "Gharbi".into(),
            email: "yassine@prepbox.tn".into(),
            password: "s3cure-enough".into(),
            phone: None,
        })
        .await
        .expect("register");

    assert_eq!(user.email, "yassine@prepbox.tn");
    assert!(app.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_every_trace() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    // Leave residue everywhere a session writes.
    app.meals().list_meals().await.expect("meals");
    app.subscriptions().fetch_current().await.expect("subscription");

    let logout_seen = Arc::new(Mutex::new(false));
    let logout_flag = Arc::clone(&logout_seen);
    app.bus().subscribe(Topic::AuthLogout, move |_| {
        *logout_flag.lock().expect("flag lock") = true;
    });

    app.auth().logout().await;

    assert!(!app.session().is_authenticated());
    assert!(!app.auth_store().is_signed_in());
    assert!(app.subscription_store().current().is_none());
    assert_eq!(app.cart().meal_count(), 0);
    assert!(!app.session().has_pending_renewal());
    assert!(*logout_seen.lock().expect("flag lock"));

    // Nothing left on disk to restore from.
    assert!(!app.session().init().await);
}

#[tokio::test]
async fn test_profile_fetch_updates_store() {
    init_tracing();
    let api = MockApi::start().await;
    let app = signed_in_client(&api).await;

    let user = app.auth().fetch_profile().await.expect("profile");
    assert_eq!(user.first_name, "Amira");
    assert_eq!(
        app.auth_store().user().expect("stored user").id,
        user.id
    );
}
