//! Integration tests for the PrepBox client.
//!
//! Tests run against an in-process mock of the backend API, bound to an
//! ephemeral port per test. [`MockApi`] exposes knobs (expiring access
//! tokens, revoking refresh tokens, slowing the refresh endpoint) and
//! counters so tests can assert exactly how the client behaved on the wire.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use prepbox_client::config::{ClientConfig, FeatureFlags};
use prepbox_client::state::AppState;

/// Install a tracing subscriber once per test binary. Safe to call from
/// every test.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Knobs and counters shared between a test and its mock backend.
#[derive(Default)]
pub struct MockState {
    pub login_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub deliveries_calls: AtomicU32,
    pub meals_calls: AtomicU32,
    /// Milliseconds the refresh endpoint sleeps before answering. Lets
    /// tests hold several 401 victims in the refresh queue at once.
    pub refresh_delay_ms: AtomicU64,
    /// When set, the refresh endpoint answers 500 instead of rotating.
    pub fail_refresh: AtomicBool,
    /// When set, login answers with a two-factor gate instead of tokens.
    pub two_factor_enabled: AtomicBool,
    /// Request bodies received by `POST /deliveries`, for wire assertions.
    pub orders_posted: Mutex<Vec<Value>>,
    /// Orders the mock has minted, served by `GET /deliveries`.
    pub orders_created: Mutex<Vec<Value>>,
    pub has_subscription: AtomicBool,
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    token_seq: AtomicU32,
}

impl MockState {
    /// Invalidate every outstanding access token, as the server would after
    /// its lifetime lapses. Refresh tokens stay valid.
    pub fn expire_access_tokens(&self) {
        self.lock(&self.valid_access).clear();
    }

    /// Revoke every refresh token, dooming the session.
    pub fn revoke_refresh_tokens(&self) {
        self.lock(&self.valid_refresh).clear();
    }

    fn issue_pair(&self) -> (String, String) {
        let n = self.token_seq.fetch_add(1, Ordering::Relaxed);
        let access = format!("access-{n}");
        let refresh = format!("refresh-{n}");
        self.lock(&self.valid_access).insert(access.clone());
        self.lock(&self.valid_refresh).insert(refresh.clone());
        (access, refresh)
    }

    fn bearer_is_valid(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.lock(&self.valid_access).contains(token))
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// An in-process mock backend bound to an ephemeral port.
pub struct MockApi {
    pub state: Arc<MockState>,
    pub base_url: url::Url,
    server: JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl MockApi {
    /// Bind and start serving. The URL includes the `/api/v1` prefix the
    /// client expects.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            has_subscription: AtomicBool::new(true),
            ..MockState::default()
        });

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/2fa/verify", post(verify_two_factor))
            .route("/auth/refresh-token", post(refresh))
            .route("/auth/logout", post(ok_empty))
            .route("/auth/me", get(me))
            .route("/meals", get(meals))
            .route("/menus/current", get(current_menu))
            .route("/deliveries", get(list_deliveries).post(create_delivery))
            .route("/subscriptions/current", get(current_subscription))
            .route("/notifications", get(notifications))
            .route("/notifications/read-all", post(ok_empty))
            .route("/notifications/{id}/read", post(notification_read));

        let app = Router::new()
            .nest("/api/v1", api)
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock listener");
        let addr: SocketAddr = listener.local_addr().expect("mock local addr");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = format!("http://{addr}/api/v1")
            .parse()
            .expect("mock base url");
        Self {
            state,
            base_url,
            server,
        }
    }

    /// A client configuration aimed at this mock, with a fresh data dir.
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with_dir(fresh_data_dir())
    }

    /// Same, but reusing an existing data dir (restart scenarios).
    pub fn client_config_with_dir(&self, data_dir: PathBuf) -> ClientConfig {
        ClientConfig {
            api_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(5),
            data_dir,
            storage_prefix: "prepbox_".to_owned(),
            page_size: 20,
            notification_page_size: 50,
            token_refresh_after: Duration::from_secs(6 * 24 * 60 * 60),
            sse_reconnect_delay: Duration::from_millis(50),
            features: FeatureFlags::default(),
        }
    }

    /// A ready application state aimed at this mock.
    pub fn client(&self) -> AppState {
        AppState::new(self.client_config()).expect("build app state")
    }
}

/// A unique scratch directory for one client instance.
pub fn fresh_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("prepbox-it-{}", uuid::Uuid::new_v4()))
}

/// Sign in with the fixture account and return the client.
pub async fn signed_in_client(api: &MockApi) -> AppState {
    let app = api.client();
    app.auth()
        .login("amira@prepbox.tn", "correct-password")
        .await
        .expect("login");
    app
}

// ============================================================================
// Handlers
// ============================================================================

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "success": false, "error": message })))
}

fn fixture_user() -> Value {
    json!({
        "id": "u1",
        "email": "amira@prepbox.tn",
        "firstName": "Amira",
        "lastName": "Trabelsi",
        "role": "CUSTOMER"
    })
}

pub fn fixture_meal(id: &str, name: &str, price: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "category": "BULKING",
        "price": price,
        "isAvailable": true
    })
}

async fn login(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.login_calls.fetch_add(1, Ordering::Relaxed);
    if body["password"] != "correct-password" {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    }
    if state.two_factor_enabled.load(Ordering::Relaxed) {
        return envelope(json!({
            "twoFactorRequired": true,
            "tempToken": TEMP_TOKEN,
        }))
        .into_response();
    }
    let (access, refresh) = state.issue_pair();
    envelope(json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": fixture_user(),
    }))
    .into_response()
}

/// Temp token minted by a gated login, expected back by 2FA verification.
pub const TEMP_TOKEN: &str = "temp-2fa-1";

/// One-time code the mock accepts.
pub const TWO_FACTOR_CODE: &str = "123456";

async fn verify_two_factor(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if body["tempToken"] != TEMP_TOKEN || body["code"] != TWO_FACTOR_CODE {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid verification code")
            .into_response();
    }
    let (access, refresh) = state.issue_pair();
    envelope(json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": fixture_user(),
    }))
    .into_response()
}

async fn register(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let (access, refresh) = state.issue_pair();
    envelope(json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": {
            "id": "u2",
            "email": body["email"],
            "firstName": body["firstName"],
            "lastName": body["lastName"],
            "role": "CUSTOMER"
        },
    }))
}

async fn refresh(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    state.refresh_calls.fetch_add(1, Ordering::Relaxed);

    let delay = state.refresh_delay_ms.load(Ordering::Relaxed);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.fail_refresh.load(Ordering::Relaxed) {
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Token service down")
            .into_response();
    }

    let presented = body["refreshToken"].as_str().unwrap_or_default().to_owned();
    let known = state.lock(&state.valid_refresh).remove(&presented);
    if !known {
        return error_body(StatusCode::UNAUTHORIZED, "Refresh token revoked").into_response();
    }

    let (access, refresh) = state.issue_pair();
    envelope(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn ok_empty() -> Json<Value> {
    Json(json!({ "success": true, "data": {} }))
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> axum::response::Response {
    if state.bearer_is_valid(&headers) {
        envelope(fixture_user()).into_response()
    } else {
        error_body(StatusCode::UNAUTHORIZED, "Invalid token").into_response()
    }
}

async fn meals(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.meals_calls.fetch_add(1, Ordering::Relaxed);
    envelope(json!([
        fixture_meal("m1", "Grilled Chicken Bowl", "15.500"),
        fixture_meal("m2", "Kafteji Light", "11.900"),
    ]))
}

async fn current_menu() -> Json<Value> {
    envelope(json!({
        "id": "menu-1",
        "meals": [
            { "meal": fixture_meal("m1", "Grilled Chicken Bowl", "15.500"), "day": "MONDAY" }
        ]
    }))
}

async fn list_deliveries(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    state.deliveries_calls.fetch_add(1, Ordering::Relaxed);
    if !state.bearer_is_valid(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }
    let orders: Vec<Value> = state.lock(&state.orders_created).clone();
    envelope(Value::Array(orders)).into_response()
}

async fn create_delivery(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !state.bearer_is_valid(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }

    let order = json!({
        "id": format!("o-{}", state.lock(&state.orders_posted).len() + 1),
        "subscriptionId": body["subscriptionId"],
        "status": "SCHEDULED",
        "scheduledDate": "2030-01-06T10:00:00Z",
        "meals": body["meals"],
        "totalPrice": "77.500"
    });
    state.lock(&state.orders_posted).push(body);
    state.lock(&state.orders_created).push(order.clone());
    envelope(order).into_response()
}

async fn current_subscription(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !state.bearer_is_valid(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }
    if !state.has_subscription.load(Ordering::Relaxed) {
        return error_body(StatusCode::NOT_FOUND, "No subscription").into_response();
    }
    envelope(json!({
        "id": "sub-1",
        "planType": "FIVE_DAY",
        "status": "ACTIVE",
        "nextDeliveryDate": "2030-01-06T10:00:00Z"
    }))
    .into_response()
}

async fn notifications(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !state.bearer_is_valid(&headers) {
        return error_body(StatusCode::UNAUTHORIZED, "Invalid token").into_response();
    }
    Json(json!({
        "success": true,
        "data": [{
            "id": "n1",
            "type": "DELIVERY_REMINDER",
            "status": "UNREAD",
            "title": "Delivery tomorrow",
            "message": "Your box arrives Monday morning",
            "createdAt": "2030-01-05T08:00:00Z"
        }],
        "pagination": { "page": 1, "limit": 50, "total": 1, "totalPages": 1 }
    }))
    .into_response()
}

async fn notification_read(Path(_id): Path<String>) -> Json<Value> {
    Json(json!({ "success": true, "data": {} }))
}
