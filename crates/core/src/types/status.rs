//! Status and category enums mirroring the API wire format.
//!
//! The API uses SCREAMING_SNAKE_CASE string constants for all of these.
//! Unknown variants fail deserialization loudly rather than being coerced,
//! so an API change shows up as a parse error, not silent misclassification.

use serde::{Deserialize, Serialize};

/// Role attached to a user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    SuperAdmin,
    Manager,
    Support,
    DeliveryGuy,
}

impl UserRole {
    /// Whether this role grants access to administrative screens.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Manager)
    }
}

/// Lifecycle of a meal subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Paused,
    Cancelled,
}

/// Subscription plan size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    FiveDay,
    SevenDay,
}

impl PlanType {
    /// Number of meals included per week.
    #[must_use]
    pub const fn meals_per_week(self) -> u32 {
        match self {
            Self::FiveDay => 5,
            Self::SevenDay => 7,
        }
    }
}

/// Nutritional category of a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealCategory {
    Bulking,
    Cutting,
}

/// Lifecycle of a delivery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Scheduled,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// Terminal states no longer count as upcoming.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }
}

/// Lifecycle of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Kind of an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    DeliveryReminder,
    DeliveryConfirmed,
    DeliveryOutForDelivery,
    DeliveryDelivered,
    PaymentPending,
    PaymentCompleted,
    PaymentFailed,
    SubscriptionPaused,
    SubscriptionResumed,
    SubscriptionCancelled,
    ReferralReward,
    DiscountApplied,
    SystemAnnouncement,
}

/// Read state of an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Read,
    Archived,
}
