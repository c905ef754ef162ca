//! Service layer: the only place that talks to the backend.
//!
//! Each service wraps the API client, updates its stores and the offline
//! cache, and announces outcomes on the bus. Read paths fall back to the
//! offline cache when the network is unreachable; write paths never do.

pub mod addresses;
pub mod auth;
pub mod dashboard;
pub mod discounts;
pub mod meals;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod referrals;
pub mod subscriptions;

pub use addresses::AddressService;
pub use auth::{AuthService, LoginOutcome, NewAccount, ProfilePatch, TwoFactorSetup};
pub use dashboard::DashboardService;
pub use discounts::DiscountService;
pub use meals::MealService;
pub use notifications::NotificationService;
pub use orders::OrderService;
pub use payments::{PaymentCompletion, PaymentService};
pub use referrals::ReferralService;
pub use subscriptions::SubscriptionService;
