//! Delivery order history state.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use prepbox_core::OrderId;

use crate::models::Order;

/// Orders known to the client, newest first.
#[derive(Clone, Default)]
pub struct OrdersStore {
    inner: Arc<Mutex<Vec<Order>>>,
}

impl OrdersStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list, keeping newest-first order by scheduled date.
    pub fn set_orders(&self, mut orders: Vec<Order>) {
        orders.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));
        *self.lock() = orders;
    }

    /// Insert or replace one order by id, preserving sort order.
    pub fn upsert(&self, order: Order) {
        let mut orders = self.lock();
        orders.retain(|o| o.id != order.id);
        orders.push(order);
        orders.sort_by(|a, b| b.scheduled_date.cmp(&a.scheduled_date));
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().clone()
    }

    #[must_use]
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.lock().iter().find(|o| &o.id == id).cloned()
    }

    /// Orders still ahead of the user: scheduled in the future and not in a
    /// terminal state.
    #[must_use]
    pub fn upcoming(&self) -> Vec<Order> {
        let now = Utc::now();
        self.lock()
            .iter()
            .filter(|o| o.is_upcoming(now))
            .cloned()
            .collect()
    }

    /// Delivered or cancelled orders, plus anything already past its date.
    #[must_use]
    pub fn past(&self) -> Vec<Order> {
        let now = Utc::now();
        self.lock()
            .iter()
            .filter(|o| !o.is_upcoming(now))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Order>> {
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
    use chrono::Duration;

    fn order(id: &str, status: &str, days_from_now: i64) -> Order {
        let date = Utc::now() + Duration::days(days_from_now);
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": status,
            "scheduledDate": date.to_rfc3339(),
            "meals": [],
        }))
        .unwrap()
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = OrdersStore::new();
        store.upsert(order("o1", "SCHEDULED", 2));
        store.upsert(order("o1", "CONFIRMED", 2));

        let orders = store.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(
            orders[0].status,
            prepbox_core::DeliveryStatus::Confirmed
        );
    }

    #[test]
    fn test_upcoming_excludes_terminal_and_past() {
        let store = OrdersStore::new();
        store.set_orders(vec![
            order("future", "SCHEDULED", 3),
            order("cancelled", "CANCELLED", 3),
            order("past", "DELIVERED", -2),
        ]);

        let upcoming = store.upcoming();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, OrderId::from("future"));
        assert_eq!(store.past().len(), 2);
    }

    #[test]
    fn test_sorted_newest_first() {
        let store = OrdersStore::new();
        store.set_orders(vec![order("old", "SCHEDULED", 1), order("new", "SCHEDULED", 5)]);
        assert_eq!(store.orders()[0].id, OrderId::from("new"));
    }
}
