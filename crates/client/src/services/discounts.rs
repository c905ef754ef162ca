//! Discount codes: browsing, validation, and usage history.

use tracing::instrument;

use prepbox_core::Price;

use crate::endpoints;
use crate::error::ApiResult;
use crate::http::ApiClient;
use crate::models::{Discount, DiscountUsage, DiscountValidation};
use crate::stores::CartStore;

#[derive(Clone)]
pub struct DiscountService {
    api: ApiClient,
    cart: CartStore,
}

impl DiscountService {
    #[must_use]
    pub fn new(api: ApiClient, cart: CartStore) -> Self {
        Self { api, cart }
    }

    /// Currently published campaigns.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn list(&self) -> ApiResult<Vec<Discount>> {
        self.api.get(endpoints::DISCOUNTS).await
    }

    /// Validate a code against the given order amount and attach the result
    /// to the cart either way, so the checkout screen can explain a miss.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self))]
    pub async fn apply_to_cart(&self, code: &str, amount: Price) -> ApiResult<DiscountValidation> {
        let validation: DiscountValidation = self
            .api
            .post(
                endpoints::DISCOUNT_VALIDATE,
                &serde_json::json!({ "code": code, "amount": amount }),
            )
            .await?;
        self.cart.apply_discount(validation.clone());
        Ok(validation)
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn history(&self) -> ApiResult<Vec<DiscountUsage>> {
        self.api.get(endpoints::DISCOUNT_HISTORY).await
    }
}
