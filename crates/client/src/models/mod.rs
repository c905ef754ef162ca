//! Data transfer objects for the PrepBox REST API.
//!
//! All wire payloads are camelCase JSON; every struct here mirrors that with
//! `#[serde(rename_all = "camelCase")]`. Request bodies skip absent optional
//! fields so the API's validators see them as omitted, not null.

pub mod address;
pub mod discount;
pub mod meal;
pub mod notification;
pub mod order;
pub mod payment;
pub mod referral;
pub mod subscription;
pub mod user;

pub use address::{Address, NewAddress};
pub use discount::{Discount, DiscountUsage, DiscountValidation};
pub use meal::{AddOn, Macros, Meal, MenuItem, WeeklyMenu};
pub use notification::Notification;
pub use order::{NewOrder, Order, OrderAddOn, OrderMeal, VerificationDetails};
pub use payment::{Payment, PaymentStats};
pub use referral::{AppliedReferral, NewReferral, Referral, ReferralStats};
pub use subscription::{NewSubscription, Subscription};
pub use user::UserProfile;
