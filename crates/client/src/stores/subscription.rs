//! Current subscription state.

use std::sync::{Arc, Mutex};

use prepbox_core::SubscriptionStatus;

use crate::models::Subscription;

#[derive(Clone, Default)]
pub struct SubscriptionStore {
    inner: Arc<Mutex<Option<Subscription>>>,
}

impl SubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, subscription: Option<Subscription>) {
        *self.lock() = subscription;
    }

    #[must_use]
    pub fn current(&self) -> Option<Subscription> {
        self.lock().clone()
    }

    /// Whether orders can currently be placed against the subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|s| s.status == SubscriptionStatus::Active)
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Subscription>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn subscription(status: &str) -> Subscription {
        serde_json::from_value(serde_json::json!({
            "id": "s1",
            "planType": "FIVE_DAY",
            "status": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_only_active_status_counts_as_active() {
        let store = SubscriptionStore::new();
        assert!(!store.is_active());

        store.set(Some(subscription("ACTIVE")));
        assert!(store.is_active());

        store.set(Some(subscription("PAUSED")));
        assert!(!store.is_active());
    }
}
