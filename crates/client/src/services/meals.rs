//! Meal catalog and weekly menu fetching, with offline fallback.

use tracing::{debug, instrument, warn};

use prepbox_core::MealId;

use crate::cache::{OfflineCache, Partition};
use crate::endpoints;
use crate::error::{ApiError, ApiResult};
use crate::http::ApiClient;
use crate::models::{AddOn, Meal, WeeklyMenu};
use crate::stores::MealsStore;

const MENU_CACHE_KEY: &str = "current";

#[derive(Clone)]
pub struct MealService {
    api: ApiClient,
    cache: OfflineCache,
    store: MealsStore,
}

impl MealService {
    #[must_use]
    pub fn new(api: ApiClient, cache: OfflineCache, store: MealsStore) -> Self {
        Self { api, cache, store }
    }

    /// Fetch the catalog, refreshing the store and the offline cache. When
    /// the network is unreachable the last cached catalog is served instead.
    ///
    /// # Errors
    /// See [`ApiError`]; a network failure with an empty cache is returned
    /// as-is.
    #[instrument(skip(self))]
    pub async fn list_meals(&self) -> ApiResult<Vec<Meal>> {
        match self.api.get::<Vec<Meal>>(endpoints::MEALS).await {
            Ok(meals) => {
                self.cache.clear(Partition::Meals);
                self.cache.put_many(Partition::Meals, &meals);
                self.store.set_meals(meals.clone());
                Ok(meals)
            }
            Err(ApiError::Network(e)) => {
                let cached: Vec<Meal> = self.cache.get_all(Partition::Meals);
                if cached.is_empty() {
                    return Err(ApiError::Network(e));
                }
                debug!(count = cached.len(), "serving meals from offline cache");
                self.store.set_meals(cached.clone());
                Ok(cached)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch one meal, serving the cached copy when the network is
    /// unreachable.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn get_meal(&self, id: &MealId) -> ApiResult<Meal> {
        match self.api.get::<Meal>(&endpoints::meal(id)).await {
            Ok(meal) => {
                self.cache.put_entity(Partition::Meals, &meal);
                Ok(meal)
            }
            Err(ApiError::Network(e)) => self
                .cache
                .get::<Meal>(Partition::Meals, id.as_str())
                .ok_or(ApiError::Network(e)),
            Err(e) => Err(e),
        }
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn list_add_ons(&self) -> ApiResult<Vec<AddOn>> {
        let add_ons: Vec<AddOn> = self.api.get(endpoints::ADD_ONS).await?;
        self.store.set_add_ons(add_ons.clone());
        Ok(add_ons)
    }

    /// Fetch this week's menu, with the same offline fallback as the
    /// catalog.
    ///
    /// # Errors
    /// See [`ApiError`].
    #[instrument(skip(self))]
    pub async fn current_menu(&self) -> ApiResult<WeeklyMenu> {
        match self.api.get::<WeeklyMenu>(endpoints::CURRENT_MENU).await {
            Ok(menu) => {
                self.cache
                    .put_keyed(Partition::Menus, MENU_CACHE_KEY, &menu);
                self.store.set_current_menu(Some(menu.clone()));
                Ok(menu)
            }
            Err(ApiError::Network(e)) => {
                if let Some(menu) = self
                    .cache
                    .get::<WeeklyMenu>(Partition::Menus, MENU_CACHE_KEY)
                {
                    warn!("network unreachable, serving cached menu");
                    self.store.set_current_menu(Some(menu.clone()));
                    return Ok(menu);
                }
                Err(ApiError::Network(e))
            }
            Err(e) => Err(e),
        }
    }
}
