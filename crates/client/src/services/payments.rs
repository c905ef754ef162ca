//! Payment lifecycle: gateway handoff, history, and spending stats.
//!
//! The gateway itself is external; the client initiates a payment, sends the
//! user to the gateway, and completes or verifies the payment with what the
//! gateway hands back.

use serde::Serialize;
use tracing::{info, instrument};

use prepbox_core::{OrderId, PaymentId};

use crate::endpoints;
use crate::error::ApiResult;
use crate::http::{ApiClient, Page};
use crate::models::{Payment, PaymentStats};

/// Completion details handed back by the gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompletion {
    pub transaction_id: String,
    pub payment_method: String,
}

#[derive(Clone)]
pub struct PaymentService {
    api: ApiClient,
    page_size: u32,
}

impl PaymentService {
    #[must_use]
    pub fn new(api: ApiClient, page_size: u32) -> Self {
        Self { api, page_size }
    }

    /// Open a pending payment for a delivery order.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self))]
    pub async fn initiate(&self, delivery_id: &OrderId) -> ApiResult<Payment> {
        let payment: Payment = self
            .api
            .post(
                endpoints::PAYMENT_INITIATE,
                &serde_json::json!({ "deliveryId": delivery_id }),
            )
            .await?;
        info!(payment = %payment.id, "payment initiated");
        Ok(payment)
    }

    /// Complete a payment with the gateway's transaction details.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self, completion))]
    pub async fn process(
        &self,
        id: &PaymentId,
        completion: &PaymentCompletion,
    ) -> ApiResult<Payment> {
        let payment: Payment = self
            .api
            .post(&endpoints::payment_process(id), completion)
            .await?;
        info!(payment = %payment.id, status = ?payment.status, "payment processed");
        Ok(payment)
    }

    /// Verify a gateway redirect. The parameter set is gateway-specific, so
    /// the body is passed through untyped.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn handle_callback(&self, params: &serde_json::Value) -> ApiResult<Payment> {
        self.api.post(endpoints::PAYMENT_CALLBACK, params).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn get(&self, id: &PaymentId) -> ApiResult<Payment> {
        self.api.get(&endpoints::payment(id)).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn list(&self, page: u32) -> ApiResult<Page<Payment>> {
        self.api
            .get_paged(endpoints::MY_PAYMENTS, page, self.page_size)
            .await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn stats(&self) -> ApiResult<PaymentStats> {
        self.api.get(endpoints::PAYMENT_STATS).await
    }
}
