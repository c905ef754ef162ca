//! Reactive state containers.
//!
//! Each store owns one slice of client state behind a mutex and announces
//! changes on the event bus after the write lands. Stores never call the
//! network; the service layer feeds them.

pub mod auth;
pub mod cart;
pub mod meals;
pub mod notifications;
pub mod orders;
pub mod subscription;
pub mod ui;

pub use auth::AuthStore;
pub use cart::{CartItem, CartStore, CartTotals};
pub use meals::{MealSort, MealsStore};
pub use notifications::NotificationsStore;
pub use orders::OrdersStore;
pub use subscription::SubscriptionStore;
pub use ui::{Toast, ToastKind, UiStore};
