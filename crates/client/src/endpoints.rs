//! API route table.
//!
//! Paths are relative to the configured base URL and joined by
//! [`crate::http::ApiClient`]. Parameterized routes are functions so callers
//! cannot forget the id segment.

use prepbox_core::{AddressId, MealId, NotificationId, OrderId, PaymentId, SubscriptionId};

/// Join a route onto the configured base URL.
///
/// Plain concatenation, not [`url::Url::join`]: the base carries a path
/// prefix (`/api/v1`) that rooted routes must not displace.
#[must_use]
pub(crate) fn join(base: &url::Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

// ============================================================================
// Auth
// ============================================================================

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
pub const CURRENT_USER: &str = "/auth/me";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/auth/reset-password";
pub const CHANGE_PASSWORD: &str = "/auth/change-password";
pub const TWO_FACTOR_SETUP: &str = "/auth/2fa/setup";
pub const TWO_FACTOR_VERIFY_SETUP: &str = "/auth/2fa/verify-setup";
pub const TWO_FACTOR_VERIFY: &str = "/auth/2fa/verify";
pub const TWO_FACTOR_DISABLE: &str = "/auth/2fa/disable";

// ============================================================================
// Catalog
// ============================================================================

pub const MEALS: &str = "/meals";
pub const ADD_ONS: &str = "/add-ons";
pub const CURRENT_MENU: &str = "/menus/current";

#[must_use]
pub fn meal(id: &MealId) -> String {
    format!("/meals/{id}")
}

// ============================================================================
// Orders (deliveries)
// ============================================================================

pub const DELIVERIES: &str = "/deliveries";

#[must_use]
pub fn delivery(id: &OrderId) -> String {
    format!("/deliveries/{id}")
}

#[must_use]
pub fn delivery_confirm(id: &OrderId) -> String {
    format!("/deliveries/{id}/confirm")
}

#[must_use]
pub fn delivery_cancel(id: &OrderId) -> String {
    format!("/deliveries/{id}/cancel")
}

#[must_use]
pub fn delivery_verification(id: &OrderId) -> String {
    format!("/deliveries/{id}/verification")
}

// ============================================================================
// Subscriptions
// ============================================================================

pub const SUBSCRIPTIONS: &str = "/subscriptions";
pub const CURRENT_SUBSCRIPTION: &str = "/subscriptions/current";

#[must_use]
pub fn subscription(id: &SubscriptionId) -> String {
    format!("/subscriptions/{id}")
}

#[must_use]
pub fn subscription_pause(id: &SubscriptionId) -> String {
    format!("/subscriptions/{id}/pause")
}

#[must_use]
pub fn subscription_resume(id: &SubscriptionId) -> String {
    format!("/subscriptions/{id}/resume")
}

#[must_use]
pub fn subscription_cancel(id: &SubscriptionId) -> String {
    format!("/subscriptions/{id}/cancel")
}

// ============================================================================
// Notifications
// ============================================================================

pub const NOTIFICATIONS: &str = "/notifications";
pub const NOTIFICATION_STREAM: &str = "/notifications/stream";
pub const NOTIFICATIONS_READ_ALL: &str = "/notifications/read-all";

#[must_use]
pub fn notification_read(id: &NotificationId) -> String {
    format!("/notifications/{id}/read")
}

#[must_use]
pub fn notification_archive(id: &NotificationId) -> String {
    format!("/notifications/{id}/archive")
}

#[must_use]
pub fn notification(id: &NotificationId) -> String {
    format!("/notifications/{id}")
}

// ============================================================================
// Account
// ============================================================================

pub const PROFILE: &str = "/users/profile";
pub const ADDRESSES: &str = "/addresses";

#[must_use]
pub fn address(id: &AddressId) -> String {
    format!("/addresses/{id}")
}

#[must_use]
pub fn address_default(id: &AddressId) -> String {
    format!("/addresses/{id}/default")
}

pub const MY_PAYMENTS: &str = "/payments/my-payments";
pub const PAYMENT_INITIATE: &str = "/payments/initiate";
pub const PAYMENT_CALLBACK: &str = "/payments/callback";
pub const PAYMENT_STATS: &str = "/payments/stats";

#[must_use]
pub fn payment(id: &PaymentId) -> String {
    format!("/payments/{id}")
}

#[must_use]
pub fn payment_process(id: &PaymentId) -> String {
    format!("/payments/{id}/process")
}

pub const REFERRALS: &str = "/referrals";
pub const MY_REFERRALS: &str = "/referrals/my-referrals";
pub const REFERRAL_STATS: &str = "/referrals/my-stats";
pub const REFERRAL_APPLY: &str = "/referrals/apply";

#[must_use]
pub fn referral_by_code(code: &str) -> String {
    format!("/referrals/code/{code}")
}

pub const DISCOUNTS: &str = "/discounts";
pub const DISCOUNT_VALIDATE: &str = "/discounts/validate";
pub const DISCOUNT_HISTORY: &str = "/discounts/history";
