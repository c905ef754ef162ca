//! Refer-and-save program.

use tracing::{info, instrument};

use crate::endpoints;
use crate::error::ApiResult;
use crate::http::ApiClient;
use crate::models::{AppliedReferral, NewReferral, Referral, ReferralStats};

#[derive(Clone)]
pub struct ReferralService {
    api: ApiClient,
}

impl ReferralService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Mint a new referral code for the account.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self, options))]
    pub async fn create(&self, options: &NewReferral) -> ApiResult<Referral> {
        let referral: Referral = self.api.post(endpoints::REFERRALS, options).await?;
        info!(code = %referral.code, "referral code created");
        Ok(referral)
    }

    /// Every referral code the account has issued.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn my_referrals(&self) -> ApiResult<Vec<Referral>> {
        self.api.get(endpoints::MY_REFERRALS).await
    }

    /// Look up someone else's code before applying it.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn by_code(&self, code: &str) -> ApiResult<Referral> {
        self.api.get(&endpoints::referral_by_code(code)).await
    }

    /// Redeem a referral code against this account.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self))]
    pub async fn apply(&self, code: &str) -> ApiResult<AppliedReferral> {
        let applied: AppliedReferral = self
            .api
            .post(
                endpoints::REFERRAL_APPLY,
                &serde_json::json!({ "referralCode": code }),
            )
            .await?;
        info!(discount = applied.discount, "referral code applied");
        Ok(applied)
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn stats(&self) -> ApiResult<ReferralStats> {
        self.api.get(endpoints::REFERRAL_STATS).await
    }
}
