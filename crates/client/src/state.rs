//! Application state shared across the UI layer.
//!
//! The composition root: builds storage, cache, session, HTTP client,
//! stores, and services, and wires the bus listeners that turn transport
//! failures into toasts. Everything hangs off one `AppState`, so tests and
//! alternate front ends can assemble a client without globals.

use std::sync::Arc;

use crate::cache::OfflineCache;
use crate::config::{ClientConfig, ConfigError};
use crate::events::EventBus;
use crate::http::ApiClient;
use crate::services::{
    AddressService, AuthService, DashboardService, DiscountService, MealService,
    NotificationService, OrderService, PaymentService, ReferralService, SubscriptionService,
};
use crate::session::SessionManager;
use crate::storage::KvStore;
use crate::stores::{
    AuthStore, CartStore, MealsStore, NotificationsStore, OrdersStore, SubscriptionStore, UiStore,
};

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across the UI layer.
///
/// Cheaply cloneable via `Arc`; clones share every resource.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClientConfig,
    bus: EventBus,
    session: SessionManager,
    api: ApiClient,
    auth_store: AuthStore,
    cart_store: CartStore,
    meals_store: MealsStore,
    orders_store: OrdersStore,
    notifications_store: NotificationsStore,
    subscription_store: SubscriptionStore,
    ui_store: UiStore,
    auth: AuthService,
    meals: MealService,
    orders: OrderService,
    subscriptions: SubscriptionService,
    notifications: NotificationService,
    addresses: AddressService,
    payments: PaymentService,
    referrals: ReferralService,
    discounts: DiscountService,
    dashboard: DashboardService,
}

impl AppState {
    /// Build the state from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the HTTP client
    /// cannot be constructed.
    pub fn from_env() -> Result<Self, BuildError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Build the state from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let bus = EventBus::new();
        let storage = KvStore::open(config.data_dir.join("storage"), &config.storage_prefix);
        let cache = OfflineCache::new(config.data_dir.join("cache.redb"));

        let session = SessionManager::new(
            http.clone(),
            &config.api_url,
            storage.clone(),
            bus.clone(),
            config.token_refresh_after,
        );
        let api = ApiClient::new(http, config.api_url.clone(), session.clone(), bus.clone());

        let auth_store = AuthStore::new(storage.clone(), bus.clone());
        let cart_store = CartStore::new(storage, bus.clone());
        let meals_store = MealsStore::new();
        let orders_store = OrdersStore::new();
        let notifications_store = NotificationsStore::new();
        let subscription_store = SubscriptionStore::new();
        let ui_store = UiStore::new();
        ui_store.attach(&bus);

        let auth = AuthService::new(
            api.clone(),
            cache.clone(),
            bus.clone(),
            auth_store.clone(),
            cart_store.clone(),
            meals_store.clone(),
            orders_store.clone(),
            notifications_store.clone(),
            subscription_store.clone(),
        );
        let meals = MealService::new(api.clone(), cache.clone(), meals_store.clone());
        let orders = OrderService::new(
            api.clone(),
            cache,
            bus.clone(),
            cart_store.clone(),
            orders_store.clone(),
            subscription_store.clone(),
            config.page_size,
        );
        let subscriptions =
            SubscriptionService::new(api.clone(), bus.clone(), subscription_store.clone());
        let notifications = NotificationService::new(
            api.clone(),
            bus.clone(),
            notifications_store.clone(),
            config.notification_page_size,
            config.sse_reconnect_delay,
        );
        let addresses = AddressService::new(api.clone());
        let payments = PaymentService::new(api.clone(), config.page_size);
        let referrals = ReferralService::new(api.clone());
        let discounts = DiscountService::new(api.clone(), cart_store.clone());
        let dashboard = DashboardService::new(
            session.clone(),
            auth.clone(),
            meals.clone(),
            orders.clone(),
            subscriptions.clone(),
            notifications.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                bus,
                session,
                api,
                auth_store,
                cart_store,
                meals_store,
                orders_store,
                notifications_store,
                subscription_store,
                ui_store,
                auth,
                meals,
                orders,
                subscriptions,
                notifications,
                addresses,
                payments,
                referrals,
                discounts,
                dashboard,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn auth_store(&self) -> &AuthStore {
        &self.inner.auth_store
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart_store
    }

    #[must_use]
    pub fn meals_store(&self) -> &MealsStore {
        &self.inner.meals_store
    }

    #[must_use]
    pub fn orders_store(&self) -> &OrdersStore {
        &self.inner.orders_store
    }

    #[must_use]
    pub fn notifications_store(&self) -> &NotificationsStore {
        &self.inner.notifications_store
    }

    #[must_use]
    pub fn subscription_store(&self) -> &SubscriptionStore {
        &self.inner.subscription_store
    }

    #[must_use]
    pub fn ui(&self) -> &UiStore {
        &self.inner.ui_store
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn meals(&self) -> &MealService {
        &self.inner.meals
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionService {
        &self.inner.subscriptions
    }

    #[must_use]
    pub fn notifications(&self) -> &NotificationService {
        &self.inner.notifications
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService {
        &self.inner.payments
    }

    #[must_use]
    pub fn referrals(&self) -> &ReferralService {
        &self.inner.referrals
    }

    #[must_use]
    pub fn discounts(&self) -> &DiscountService {
        &self.inner.discounts
    }

    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.inner.dashboard
    }
}
