//! Subscription lifecycle: start, pause, resume, cancel.

use tracing::{info, instrument};

use prepbox_core::PlanType;

use crate::endpoints;
use crate::error::{ApiError, ApiResult};
use crate::events::{AppEvent, EventBus};
use crate::http::ApiClient;
use crate::models::{NewSubscription, Subscription};
use crate::stores::SubscriptionStore;

#[derive(Clone)]
pub struct SubscriptionService {
    api: ApiClient,
    bus: EventBus,
    store: SubscriptionStore,
}

impl SubscriptionService {
    #[must_use]
    pub fn new(api: ApiClient, bus: EventBus, store: SubscriptionStore) -> Self {
        Self { api, bus, store }
    }

    /// Fetch the current subscription. A 404 means the user simply has
    /// none; that clears the store instead of erroring.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn fetch_current(&self) -> ApiResult<Option<Subscription>> {
        match self
            .api
            .get::<Subscription>(endpoints::CURRENT_SUBSCRIPTION)
            .await
        {
            Ok(subscription) => {
                self.store.set(Some(subscription.clone()));
                Ok(Some(subscription))
            }
            Err(ApiError::Server { status: 404, .. }) => {
                self.store.set(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Every subscription the account has held, current and past.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn list(&self) -> ApiResult<Vec<Subscription>> {
        self.api.get(endpoints::SUBSCRIPTIONS).await
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn get(&self, id: &prepbox_core::SubscriptionId) -> ApiResult<Subscription> {
        self.api.get(&endpoints::subscription(id)).await
    }

    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn subscribe(&self, plan_type: PlanType) -> ApiResult<Subscription> {
        let subscription: Subscription = self
            .api
            .post(endpoints::SUBSCRIPTIONS, &NewSubscription { plan_type })
            .await?;
        info!(subscription = %subscription.id, "subscription started");
        self.store.set(Some(subscription.clone()));
        self.bus
            .emit(&AppEvent::SubscriptionCreated(subscription.clone()));
        Ok(subscription)
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn pause(&self) -> ApiResult<Subscription> {
        self.transition(endpoints::subscription_pause, AppEvent::SubscriptionPaused)
            .await
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn resume(&self) -> ApiResult<Subscription> {
        self.transition(endpoints::subscription_resume, AppEvent::SubscriptionResumed)
            .await
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn cancel(&self) -> ApiResult<Subscription> {
        self.transition(
            endpoints::subscription_cancel,
            AppEvent::SubscriptionCancelled,
        )
        .await
    }

    async fn transition(
        &self,
        path: fn(&prepbox_core::SubscriptionId) -> String,
        event: fn(Subscription) -> AppEvent,
    ) -> ApiResult<Subscription> {
        let current = self.store.current().ok_or_else(|| ApiError::Validation {
            message: "No subscription to update".to_owned(),
            fields: std::collections::HashMap::new(),
        })?;

        let subscription: Subscription = self.api.post_empty(&path(&current.id)).await?;
        info!(subscription = %subscription.id, status = ?subscription.status, "subscription updated");
        self.store.set(Some(subscription.clone()));
        self.bus.emit(&event(subscription.clone()));
        Ok(subscription)
    }
}
