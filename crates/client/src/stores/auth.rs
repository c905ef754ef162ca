//! Signed-in user state.
//!
//! The profile is persisted so the shell can greet the user before the
//! session finishes restoring. Tokens never live here; see
//! [`crate::session::SessionManager`].

use std::sync::{Arc, Mutex};

use crate::events::{AppEvent, EventBus};
use crate::models::UserProfile;
use crate::storage::KvStore;

const USER_KEY: &str = "user";
const USER_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    storage: KvStore,
    bus: EventBus,
    user: Mutex<Option<UserProfile>>,
    /// Temp token from a password check awaiting its one-time code. Proof
    /// the password step succeeded; memory-only, a restart restarts the
    /// sign-in.
    two_factor_temp_token: Mutex<Option<String>>,
}

impl AuthStore {
    /// Create the store, restoring any persisted profile.
    #[must_use]
    pub fn new(storage: KvStore, bus: EventBus) -> Self {
        let user = storage.get::<UserProfile>(USER_KEY);
        Self {
            inner: Arc::new(AuthInner {
                storage,
                bus,
                user: Mutex::new(user),
                two_factor_temp_token: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.lock().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.lock().is_some()
    }

    /// Install the profile after sign-in or a profile fetch, persist it,
    /// and announce the change.
    pub fn set_user(&self, user: UserProfile) {
        self.inner.storage.set(USER_KEY, &user, Some(USER_TTL_DAYS));
        *self.lock() = Some(user.clone());
        self.inner.bus.emit(&AppEvent::UserUpdated(user));
    }

    /// Record (or clear) the temp token of a sign-in gated on a one-time
    /// code. Setting and clearing this is also what flips
    /// [`Self::requires_two_factor`].
    pub fn set_two_factor_pending(&self, temp_token: Option<String>) {
        *self.lock_pending() = temp_token;
    }

    #[must_use]
    pub fn two_factor_temp_token(&self) -> Option<String> {
        self.lock_pending().clone()
    }

    /// Whether a sign-in is waiting on a one-time code.
    #[must_use]
    pub fn requires_two_factor(&self) -> bool {
        self.lock_pending().is_some()
    }

    /// Forget the profile and any pending sign-in, in memory and on disk.
    pub fn clear(&self) {
        *self.lock() = None;
        *self.lock_pending() = None;
        self.inner.storage.remove(USER_KEY);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<UserProfile>> {
        match self.inner.user.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        match self.inner.two_factor_temp_token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
