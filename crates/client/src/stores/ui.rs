//! Transient UI state: toasts, the active modal, and loading flags.
//!
//! Wired to the bus at composition time so connectivity loss and server
//! errors surface as toasts without every service knowing about the UI.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::events::{AppEvent, EventBus, Topic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Default)]
struct UiState {
    toasts: Vec<Toast>,
    active_modal: Option<String>,
    loading: HashMap<String, bool>,
    sidebar_open: bool,
    mobile_menu_open: bool,
}

#[derive(Clone, Default)]
pub struct UiStore {
    inner: Arc<UiInner>,
}

#[derive(Default)]
struct UiInner {
    next_toast_id: AtomicU64,
    state: Mutex<UiState>,
}

impl UiStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface transport and server failures as error toasts. Validation
    /// failures are deliberately not routed here; forms own those.
    pub fn attach(&self, bus: &EventBus) {
        let store = self.clone();
        bus.subscribe(Topic::ConnectivityLost, move |event| {
            if let AppEvent::ConnectivityLost { message } = event {
                store.push_toast(ToastKind::Error, format!("You appear to be offline: {message}"));
            }
        });
        let store = self.clone();
        bus.subscribe(Topic::ServerError, move |event| {
            if let AppEvent::ServerError { message, .. } = event {
                store.push_toast(ToastKind::Error, message.clone());
            }
        });
    }

    pub fn push_toast(&self, kind: ToastKind, message: String) -> u64 {
        let id = self.inner.next_toast_id.fetch_add(1, Ordering::Relaxed);
        self.lock().toasts.push(Toast { id, kind, message });
        id
    }

    pub fn dismiss_toast(&self, id: u64) {
        self.lock().toasts.retain(|t| t.id != id);
    }

    #[must_use]
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    pub fn open_modal(&self, name: &str) {
        self.lock().active_modal = Some(name.to_owned());
    }

    pub fn close_modal(&self) {
        self.lock().active_modal = None;
    }

    #[must_use]
    pub fn active_modal(&self) -> Option<String> {
        self.lock().active_modal.clone()
    }

    pub fn toggle_sidebar(&self) -> bool {
        let mut state = self.lock();
        state.sidebar_open = !state.sidebar_open;
        state.sidebar_open
    }

    #[must_use]
    pub fn sidebar_open(&self) -> bool {
        self.lock().sidebar_open
    }

    /// Opening the mobile menu closes the sidebar and vice versa; only one
    /// overlay at a time.
    pub fn set_mobile_menu(&self, open: bool) {
        let mut state = self.lock();
        state.mobile_menu_open = open;
        if open {
            state.sidebar_open = false;
        }
    }

    #[must_use]
    pub fn mobile_menu_open(&self) -> bool {
        self.lock().mobile_menu_open
    }

    pub fn set_loading(&self, scope: &str, loading: bool) {
        self.lock().loading.insert(scope.to_owned(), loading);
    }

    #[must_use]
    pub fn is_loading(&self, scope: &str) -> bool {
        self.lock().loading.get(scope).copied().unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UiState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_lifecycle() {
        let store = UiStore::new();
        let id = store.push_toast(ToastKind::Success, "Order placed".into());
        assert_eq!(store.toasts().len(), 1);

        store.dismiss_toast(id);
        assert!(store.toasts().is_empty());
    }

    #[test]
    fn test_server_errors_become_toasts() {
        let bus = EventBus::new();
        let store = UiStore::new();
        store.attach(&bus);

        bus.emit(&AppEvent::ServerError {
            status: 502,
            message: "Bad Gateway".into(),
        });

        let toasts = store.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].kind, ToastKind::Error);
        assert_eq!(toasts[0].message, "Bad Gateway");
    }

    #[test]
    fn test_mobile_menu_closes_sidebar() {
        let store = UiStore::new();
        assert!(store.toggle_sidebar());
        store.set_mobile_menu(true);
        assert!(store.mobile_menu_open());
        assert!(!store.sidebar_open());
    }

    #[test]
    fn test_loading_flags_are_scoped() {
        let store = UiStore::new();
        store.set_loading("orders", true);
        assert!(store.is_loading("orders"));
        assert!(!store.is_loading("meals"));
    }
}
