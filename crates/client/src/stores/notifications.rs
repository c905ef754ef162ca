//! In-app notification state.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use prepbox_core::{NotificationId, NotificationStatus};

use crate::models::Notification;

/// Notifications known to the client, newest first.
#[derive(Clone, Default)]
pub struct NotificationsStore {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_notifications(&self, mut notifications: Vec<Notification>) {
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        *self.lock() = notifications;
    }

    /// Prepend a freshly streamed notification. Duplicates (a stream
    /// reconnect replaying the last event) are dropped by id.
    pub fn push(&self, notification: Notification) {
        let mut list = self.lock();
        if list.iter().any(|n| n.id == notification.id) {
            return;
        }
        list.insert(0, notification);
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.lock().iter().filter(|n| n.is_unread()).count()
    }

    /// Mark one notification read locally. Returns the updated copy, or
    /// `None` for an unknown id.
    pub fn mark_read(&self, id: &NotificationId) -> Option<Notification> {
        let mut list = self.lock();
        let item = list.iter_mut().find(|n| &n.id == id)?;
        item.status = NotificationStatus::Read;
        item.read_at = Some(Utc::now());
        Some(item.clone())
    }

    /// Archive one notification locally. Archived entries stay listed but
    /// no longer count as unread.
    pub fn archive(&self, id: &NotificationId) -> Option<Notification> {
        let mut list = self.lock();
        let item = list.iter_mut().find(|n| &n.id == id)?;
        item.status = NotificationStatus::Archived;
        Some(item.clone())
    }

    /// Drop one notification from the list. Unknown ids are ignored.
    pub fn remove(&self, id: &NotificationId) {
        self.lock().retain(|n| &n.id != id);
    }

    pub fn mark_all_read(&self) {
        let now = Utc::now();
        for item in self.lock().iter_mut() {
            if item.is_unread() {
                item.status = NotificationStatus::Read;
                item.read_at = Some(now);
            }
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
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

    fn notification(id: &str) -> Notification {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": "DELIVERY_CONFIRMED",
            "status": "UNREAD",
            "title": "Order confirmed",
            "message": "See you Friday",
            "createdAt": Utc::now().to_rfc3339(),
        }))
        .unwrap()
    }

    #[test]
    fn test_push_dedupes_by_id() {
        let store = NotificationsStore::new();
        store.push(notification("n1"));
        store.push(notification("n1"));
        assert_eq!(store.notifications().len(), 1);
    }

    #[test]
    fn test_mark_read_updates_count() {
        let store = NotificationsStore::new();
        store.push(notification("n1"));
        store.push(notification("n2"));
        assert_eq!(store.unread_count(), 2);

        let updated = store.mark_read(&NotificationId::from("n1")).unwrap();
        assert_eq!(updated.status, NotificationStatus::Read);
        assert!(updated.read_at.is_some());
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn test_mark_all_read() {
        let store = NotificationsStore::new();
        store.push(notification("n1"));
        store.push(notification("n2"));
        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_mark_read_unknown_id_is_none() {
        let store = NotificationsStore::new();
        assert!(store.mark_read(&NotificationId::from("ghost")).is_none());
    }

    #[test]
    fn test_archive_keeps_entry_but_not_unread() {
        let store = NotificationsStore::new();
        store.push(notification("n1"));

        let archived = store.archive(&NotificationId::from("n1")).unwrap();
        assert_eq!(archived.status, NotificationStatus::Archived);
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_remove_drops_entry() {
        let store = NotificationsStore::new();
        store.push(notification("n1"));
        store.remove(&NotificationId::from("n1"));
        assert!(store.notifications().is_empty());
    }
}
