//! Publish/subscribe event bus decoupling state changes from UI reactions.
//!
//! Dispatch is synchronous and in subscription order. A handler that panics
//! is caught and logged so it cannot block delivery to later handlers. There
//! is no queue: `emit` is fire-and-forget, and handlers registered during an
//! emit do not receive the in-flight event.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::error;

use prepbox_core::MealId;

use crate::models::{Notification, Order, Subscription, UserProfile};

/// Topic identifying a class of events, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    // Auth
    AuthLogin,
    AuthLogout,
    AuthRegister,
    AuthTokenRefreshed,
    AuthTwoFactorRequired,
    SessionExpired,
    // User
    UserUpdated,
    // Cart
    CartUpdated,
    CartCleared,
    CartItemAdded,
    CartItemRemoved,
    // Orders
    OrderCreated,
    OrderConfirmed,
    OrderCancelled,
    // Subscriptions
    SubscriptionCreated,
    SubscriptionPaused,
    SubscriptionResumed,
    SubscriptionCancelled,
    // Notifications
    NotificationReceived,
    NotificationRead,
    // Error side-channel
    ConnectivityLost,
    ServerError,
}

/// An event with its payload.
#[derive(Debug, Clone)]
pub enum AppEvent {
    AuthLogin(UserProfile),
    AuthLogout,
    AuthRegister(UserProfile),
    AuthTokenRefreshed,
    AuthTwoFactorRequired,
    /// Renewal failed for an authenticated session; the UI layer should
    /// route the user to the sign-in screen.
    SessionExpired,
    UserUpdated(UserProfile),
    CartUpdated,
    CartCleared,
    CartItemAdded { meal_id: MealId, quantity: u32 },
    CartItemRemoved { meal_id: MealId },
    OrderCreated(Order),
    OrderConfirmed(Order),
    OrderCancelled(Order),
    SubscriptionCreated(Subscription),
    SubscriptionPaused(Subscription),
    SubscriptionResumed(Subscription),
    SubscriptionCancelled(Subscription),
    NotificationReceived(Notification),
    NotificationRead(Notification),
    ConnectivityLost { message: String },
    ServerError { status: u16, message: String },
}

impl AppEvent {
    /// The topic this event is delivered under.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::AuthLogin(_) => Topic::AuthLogin,
            Self::AuthLogout => Topic::AuthLogout,
            Self::AuthRegister(_) => Topic::AuthRegister,
            Self::AuthTokenRefreshed => Topic::AuthTokenRefreshed,
            Self::AuthTwoFactorRequired => Topic::AuthTwoFactorRequired,
            Self::SessionExpired => Topic::SessionExpired,
            Self::UserUpdated(_) => Topic::UserUpdated,
            Self::CartUpdated => Topic::CartUpdated,
            Self::CartCleared => Topic::CartCleared,
            Self::CartItemAdded { .. } => Topic::CartItemAdded,
            Self::CartItemRemoved { .. } => Topic::CartItemRemoved,
            Self::OrderCreated(_) => Topic::OrderCreated,
            Self::OrderConfirmed(_) => Topic::OrderConfirmed,
            Self::OrderCancelled(_) => Topic::OrderCancelled,
            Self::SubscriptionCreated(_) => Topic::SubscriptionCreated,
            Self::SubscriptionPaused(_) => Topic::SubscriptionPaused,
            Self::SubscriptionResumed(_) => Topic::SubscriptionResumed,
            Self::SubscriptionCancelled(_) => Topic::SubscriptionCancelled,
            Self::NotificationReceived(_) => Topic::NotificationReceived,
            Self::NotificationRead(_) => Topic::NotificationRead,
            Self::ConnectivityLost { .. } => Topic::ConnectivityLost,
            Self::ServerError { .. } => Topic::ServerError,
        }
    }
}

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// Unique identifier for a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

/// Handle returned by [`EventBus::subscribe`]; detaches the handler when
/// passed back to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionHandle {
    topic: Topic,
    id: HandlerId,
}

/// Synchronous in-process event bus.
///
/// Cheaply cloneable; clones share the same subscriber table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<Topic, Vec<(HandlerId, Handler)>>>,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic. Handlers run synchronously, in subscription
    /// order, on the emitting task.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        self.attach(topic, Arc::new(handler))
    }

    /// Subscribe for a single delivery; the handler detaches itself after
    /// its first invocation.
    pub fn once<F>(&self, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let bus = self.clone();
        let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));
        let slot_for_handler = Arc::clone(&slot);

        let subscription = self.attach(
            topic,
            Arc::new(move |event| {
                handler(event);
                if let Ok(mut guard) = slot_for_handler.lock()
                    && let Some(sub) = guard.take()
                {
                    bus.unsubscribe(sub);
                }
            }),
        );

        if let Ok(mut guard) = slot.lock() {
            *guard = Some(subscription);
        }
        subscription
    }

    /// Detach a previously registered handler. Unknown handles are ignored.
    pub fn unsubscribe(&self, subscription: SubscriptionHandle) {
        let mut handlers = match self.inner.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(list) = handlers.get_mut(&subscription.topic) {
            list.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Deliver an event to every handler subscribed to its topic.
    ///
    /// The handler list is snapshotted before dispatch, so handlers may
    /// subscribe or unsubscribe re-entrantly without deadlocking; additions
    /// take effect from the next emit.
    pub fn emit(&self, event: &AppEvent) {
        let snapshot: Vec<Handler> = {
            let handlers = match self.inner.handlers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            handlers
                .get(&event.topic())
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map_or_else(|| "non-string panic payload".to_owned(), ToString::to_string);
                error!(topic = ?event.topic(), detail, "event handler panicked");
            }
        }
    }

    /// Drop every handler for `topic`, or all handlers when `None`.
    pub fn clear(&self, topic: Option<Topic>) {
        let mut handlers = match self.inner.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match topic {
            Some(topic) => {
                handlers.remove(&topic);
            }
            None => handlers.clear(),
        }
    }

    /// Number of handlers currently subscribed to `topic`.
    #[must_use]
    pub fn listener_count(&self, topic: Topic) -> usize {
        let handlers = match self.inner.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.get(&topic).map_or(0, Vec::len)
    }

    fn attach(&self, topic: Topic, handler: Handler) -> SubscriptionHandle {
        let id = HandlerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = match self.inner.handlers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        handlers.entry(topic).or_default().push((id, handler));
        SubscriptionHandle { topic, id }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let log_a = Arc::clone(&log);
        bus.subscribe(Topic::CartUpdated, move |_| {
            log_a.lock().unwrap().push("a");
        });
        let log_b = Arc::clone(&log);
        bus.subscribe(Topic::CartUpdated, move |_| {
            log_b.lock().unwrap().push("b");
        });

        bus.emit(&AppEvent::CartUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_panicking_handler_does_not_block_later_ones() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(Topic::CartUpdated, |_| panic!("boom"));
        let log_b = Arc::clone(&log);
        bus.subscribe(Topic::CartUpdated, move |_| {
            log_b.lock().unwrap().push("b");
        });

        bus.emit(&AppEvent::CartUpdated);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));

        let count_inner = Arc::clone(&count);
        let sub = bus.subscribe(Topic::AuthLogout, move |_| {
            *count_inner.lock().unwrap() += 1;
        });

        bus.emit(&AppEvent::AuthLogout);
        bus.unsubscribe(sub);
        bus.emit(&AppEvent::AuthLogout);

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.listener_count(Topic::AuthLogout), 0);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));

        let count_inner = Arc::clone(&count);
        bus.once(Topic::CartCleared, move |_| {
            *count_inner.lock().unwrap() += 1;
        });

        bus.emit(&AppEvent::CartCleared);
        bus.emit(&AppEvent::CartCleared);

        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.listener_count(Topic::CartCleared), 0);
    }

    #[test]
    fn test_subscription_events_carry_the_model_payload() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));

        let seen_inner = Arc::clone(&seen);
        let handle = bus.subscribe(Topic::SubscriptionPaused, move |event| {
            if let AppEvent::SubscriptionPaused(sub) = event {
                *seen_inner.lock().unwrap() = Some(sub.id.clone());
            }
        });

        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "id": "s1",
            "planType": "FIVE_DAY",
            "status": "PAUSED",
        }))
        .unwrap();
        bus.emit(&AppEvent::SubscriptionPaused(subscription));
        bus.unsubscribe(handle);

        assert_eq!(
            seen.lock().unwrap().as_ref().map(ToString::to_string),
            Some("s1".to_owned())
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(&AppEvent::AuthTokenRefreshed);
    }

    #[test]
    fn test_clear_scoped_and_global() {
        let bus = EventBus::new();
        bus.subscribe(Topic::CartUpdated, |_| {});
        bus.subscribe(Topic::AuthLogin, |_| {});

        bus.clear(Some(Topic::CartUpdated));
        assert_eq!(bus.listener_count(Topic::CartUpdated), 0);
        assert_eq!(bus.listener_count(Topic::AuthLogin), 1);

        bus.clear(None);
        assert_eq!(bus.listener_count(Topic::AuthLogin), 0);
    }

    #[test]
    fn test_handler_subscribed_during_emit_misses_in_flight_event() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0));

        let bus_inner = bus.clone();
        let count_inner = Arc::clone(&count);
        bus.subscribe(Topic::CartUpdated, move |_| {
            let count_late = Arc::clone(&count_inner);
            bus_inner.subscribe(Topic::CartUpdated, move |_| {
                *count_late.lock().unwrap() += 1;
            });
        });

        bus.emit(&AppEvent::CartUpdated);
        assert_eq!(*count.lock().unwrap(), 0);

        bus.emit(&AppEvent::CartUpdated);
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
