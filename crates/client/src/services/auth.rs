//! Account lifecycle: sign-in, registration, two-factor, and sign-out.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::cache::{OfflineCache, Partition};
use crate::endpoints;
use crate::error::ApiResult;
use crate::events::{AppEvent, EventBus};
use crate::http::ApiClient;
use crate::models::UserProfile;
use crate::stores::{
    AuthStore, CartStore, MealsStore, NotificationsStore, OrdersStore, SubscriptionStore,
};

const PROFILE_CACHE_KEY: &str = "profile";

/// Registration payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Profile update payload; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Result of a credential check.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    SignedIn(UserProfile),
    /// Credentials accepted but a one-time code is required to finish.
    TwoFactorRequired,
}

/// Enrollment material for an authenticator app.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetup {
    pub secret: String,
    #[serde(default)]
    pub qr_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionGrant {
    access_token: String,
    refresh_token: String,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginData {
    #[serde(default)]
    two_factor_required: bool,
    /// Proof the password step succeeded; presented with the one-time code.
    #[serde(default)]
    temp_token: Option<String>,
    #[serde(flatten)]
    grant: Option<SessionGrant>,
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    cache: OfflineCache,
    bus: EventBus,
    auth: AuthStore,
    cart: CartStore,
    meals: MealsStore,
    orders: OrdersStore,
    notifications: NotificationsStore,
    subscription: SubscriptionStore,
}

impl AuthService {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: ApiClient,
        cache: OfflineCache,
        bus: EventBus,
        auth: AuthStore,
        cart: CartStore,
        meals: MealsStore,
        orders: OrdersStore,
        notifications: NotificationsStore,
        subscription: SubscriptionStore,
    ) -> Self {
        Self {
            api,
            cache,
            bus,
            auth,
            cart,
            meals,
            orders,
            notifications,
            subscription,
        }
    }

    /// Check credentials and, unless two-factor interposes, open a session.
    ///
    /// # Errors
    /// [`crate::error::ApiError::Validation`] on bad input, otherwise see
    /// [`crate::error::ApiError`].
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<LoginOutcome> {
        let data: LoginData = self
            .api
            .post(
                endpoints::LOGIN,
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;

        if data.two_factor_required {
            let temp_token = data
                .temp_token
                .ok_or(crate::error::ApiError::MissingData)?;
            self.auth.set_two_factor_pending(Some(temp_token));
            self.bus.emit(&AppEvent::AuthTwoFactorRequired);
            return Ok(LoginOutcome::TwoFactorRequired);
        }

        let grant = data.grant.ok_or(crate::error::ApiError::MissingData)?;
        let user = self.install_session(grant);
        info!(user = %user.email, "signed in");
        self.bus.emit(&AppEvent::AuthLogin(user.clone()));
        Ok(LoginOutcome::SignedIn(user))
    }

    /// Finish a two-factor sign-in with the one-time code, presenting the
    /// temp token the password step returned.
    ///
    /// # Errors
    /// [`crate::error::ApiError::Validation`] when no sign-in is awaiting a
    /// code, otherwise see [`crate::error::ApiError`].
    #[instrument(skip(self, code))]
    pub async fn verify_two_factor(&self, code: &str) -> ApiResult<UserProfile> {
        let temp_token =
            self.auth
                .two_factor_temp_token()
                .ok_or_else(|| crate::error::ApiError::Validation {
                    message: "No sign-in awaiting a verification code".to_owned(),
                    fields: std::collections::HashMap::new(),
                })?;
        let grant: SessionGrant = self
            .api
            .post(
                endpoints::TWO_FACTOR_VERIFY,
                &serde_json::json!({ "tempToken": temp_token, "code": code }),
            )
            .await?;
        self.auth.set_two_factor_pending(None);
        let user = self.install_session(grant);
        self.bus.emit(&AppEvent::AuthLogin(user.clone()));
        Ok(user)
    }

    /// Create an account; the backend signs the new user straight in.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn register(&self, account: &NewAccount) -> ApiResult<UserProfile> {
        let grant: SessionGrant = self.api.post(endpoints::REGISTER, account).await?;
        let user = self.install_session(grant);
        info!(user = %user.email, "account created");
        self.bus.emit(&AppEvent::AuthRegister(user.clone()));
        Ok(user)
    }

    /// End the session. Local state is always cleared, even when the server
    /// cannot be told; sign-out never fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if self.api.session().is_authenticated()
            && let Err(e) = self
                .api
                .post_no_data(endpoints::LOGOUT, &serde_json::json!({}))
                .await
        {
            warn!(error = %e, "server-side logout failed, clearing locally anyway");
        }

        self.api.session().clear();
        self.auth.clear();
        self.cart.clear();
        self.meals.set_current_menu(None);
        self.orders.clear();
        self.notifications.clear();
        self.subscription.clear();
        self.cache.clear_all();
        self.bus.emit(&AppEvent::AuthLogout);
        info!("signed out");
    }

    /// Fetch the signed-in profile, refreshing the store and cache.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn fetch_profile(&self) -> ApiResult<UserProfile> {
        match self.api.get::<UserProfile>(endpoints::CURRENT_USER).await {
            Ok(user) => {
                self.remember_user(&user);
                Ok(user)
            }
            Err(e) if matches!(e, crate::error::ApiError::Network(_)) => {
                if let Some(user) = self.cache.get::<UserProfile>(Partition::User, PROFILE_CACHE_KEY)
                {
                    self.auth.set_user(user.clone());
                    return Ok(user);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn update_profile(&self, patch: &ProfilePatch) -> ApiResult<UserProfile> {
        let user: UserProfile = self.api.patch(endpoints::PROFILE, patch).await?;
        self.remember_user(&user);
        Ok(user)
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        self.api
            .post_no_data(
                endpoints::FORGOT_PASSWORD,
                &serde_json::json!({ "email": email }),
            )
            .await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn change_password(&self, current: &str, new_password: &str) -> ApiResult<()> {
        self.api
            .post_no_data(
                endpoints::CHANGE_PASSWORD,
                &serde_json::json!({ "currentPassword": current, "newPassword": new_password }),
            )
            .await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ApiResult<()> {
        self.api
            .post_no_data(
                endpoints::RESET_PASSWORD,
                &serde_json::json!({ "token": token, "password": new_password }),
            )
            .await
    }

    /// Begin two-factor enrollment; returns material for the authenticator.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn setup_two_factor(&self) -> ApiResult<TwoFactorSetup> {
        self.api.post_empty(endpoints::TWO_FACTOR_SETUP).await
    }

    /// Confirm enrollment with a first code from the authenticator.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn verify_two_factor_setup(&self, code: &str) -> ApiResult<()> {
        self.api
            .post_no_data(
                endpoints::TWO_FACTOR_VERIFY_SETUP,
                &serde_json::json!({ "code": code }),
            )
            .await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn disable_two_factor(&self, code: &str) -> ApiResult<()> {
        self.api
            .post_no_data(
                endpoints::TWO_FACTOR_DISABLE,
                &serde_json::json!({ "code": code }),
            )
            .await
    }

    fn install_session(&self, grant: SessionGrant) -> UserProfile {
        self.api
            .session()
            .set_tokens(grant.access_token, grant.refresh_token);
        self.remember_user(&grant.user);
        grant.user
    }

    fn remember_user(&self, user: &UserProfile) {
        self.auth.set_user(user.clone());
        self.cache
            .put_keyed(Partition::User, PROFILE_CACHE_KEY, user);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_data_decodes_two_factor_gate() {
        let data: LoginData = serde_json::from_value(
            serde_json::json!({ "twoFactorRequired": true, "tempToken": "temp-1" }),
        )
        .unwrap();
        assert!(data.two_factor_required);
        assert_eq!(data.temp_token.as_deref(), Some("temp-1"));
        assert!(data.grant.is_none());
    }

    #[test]
    fn test_login_data_decodes_full_grant() {
        let data: LoginData = serde_json::from_value(serde_json::json!({
            "accessToken": "at",
            "refreshToken": "rt",
            "user": {
                "id": "u1",
                "email": "a@b.tn",
                "firstName": "A",
                "lastName": "B",
                "role": "CUSTOMER"
            }
        }))
        .unwrap();
        assert!(!data.two_factor_required);
        let grant = data.grant.unwrap();
        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.user.email, "a@b.tn");
    }
}
