//! Session lifecycle: token storage, proactive renewal, and refresh.
//!
//! The backend issues a short-lived access token (held in memory only) and a
//! refresh token good for seven days. The manager persists the refresh token
//! obfuscated on disk, restores it on startup, and schedules a renewal one
//! day before expiry so an active session never lapses. Renewal rotates both
//! tokens, so the schedule is reset on every refresh.
//!
//! Refresh is single-flight: when several callers hit a 401 at once, one
//! performs the round trip and the rest reuse its result. A refresh token
//! the server rejects ends the session and announces it on the bus.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::endpoints;
use crate::events::{AppEvent, EventBus};
use crate::obfuscate::TokenCodec;
use crate::storage::KvStore;

/// Storage key for the persisted refresh token (prefix applied by the store).
const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Persisted copy expires with the token itself.
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Failures in the session lifecycle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No refresh token on hand; the user must sign in.
    #[error("not signed in")]
    NotSignedIn,

    /// The server rejected the refresh token. The session has been cleared.
    #[error("session expired")]
    Expired,

    /// The refresh request never reached the server. The session is kept;
    /// the caller may retry.
    #[error("network error during refresh: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an unexpected status or body.
    #[error("refresh failed with status {0}")]
    Server(u16),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshEnvelope {
    #[serde(default)]
    success: bool,
    data: Option<RefreshData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
    refresh_token: Option<String>,
}

/// Cheaply cloneable session handle; clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    http: reqwest::Client,
    refresh_url: String,
    storage: KvStore,
    bus: EventBus,
    codec: TokenCodec,
    /// Delay between installing tokens and proactively renewing them.
    refresh_after: Duration,
    initialized: AtomicBool,
    /// Bumped on every token install or clear. Lets a queued refresher
    /// detect that someone else already renewed while it waited.
    generation: AtomicU64,
    state: Mutex<TokenState>,
    refresh_flight: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<SecretString>,
    renewal: Option<AbortHandle>,
}

impl SessionManager {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        api_url: &Url,
        storage: KvStore,
        bus: EventBus,
        refresh_after: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                http,
                refresh_url: endpoints::join(api_url, endpoints::REFRESH_TOKEN),
                storage,
                bus,
                codec: TokenCodec::new(),
                refresh_after,
                initialized: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                state: Mutex::new(TokenState::default()),
                refresh_flight: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Restore a persisted session, exchanging the stored refresh token for
    /// a fresh access token.
    ///
    /// Idempotent: only the first call does work, later calls report the
    /// current state. A failed restore discards the persisted token, so a
    /// dead session is never retried on every launch. Returns whether the
    /// session is authenticated.
    #[instrument(skip(self))]
    pub async fn init(&self) -> bool {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return self.is_authenticated();
        }

        let Some(encoded) = self.inner.storage.get::<String>(REFRESH_TOKEN_KEY) else {
            debug!("no persisted session");
            return false;
        };
        let Some(token) = self.inner.codec.decode(&encoded) else {
            warn!("persisted refresh token is unreadable, discarding");
            self.inner.storage.remove(REFRESH_TOKEN_KEY);
            return false;
        };

        self.with_state(|state| state.refresh_token = Some(SecretString::from(token)));

        match self.refresh_access_token().await {
            Ok(_) => {
                info!("session restored");
                true
            }
            Err(e) => {
                debug!(error = %e, "could not restore session, discarding persisted token");
                self.clear();
                false
            }
        }
    }

    /// Install a token pair after sign-in, registration, or refresh.
    ///
    /// Persists the refresh token and (re)schedules proactive renewal. Any
    /// previously scheduled renewal is cancelled first, so at most one
    /// renewal is ever pending.
    pub fn set_tokens(&self, access_token: String, refresh_token: String) {
        let encoded = self.inner.codec.encode(&refresh_token);
        self.inner
            .storage
            .set(REFRESH_TOKEN_KEY, &encoded, Some(REFRESH_TOKEN_TTL_DAYS));

        self.with_state(|state| {
            state.access_token = Some(access_token);
            state.refresh_token = Some(SecretString::from(refresh_token));
            if let Some(handle) = state.renewal.take() {
                handle.abort();
            }
        });
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        self.schedule_renewal();
    }

    /// The in-memory access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        match self.inner.state.lock() {
            Ok(state) => state.access_token.clone(),
            Err(poisoned) => poisoned.into_inner().access_token.clone(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Exchange the refresh token for a new token pair.
    ///
    /// Single-flight: concurrent callers queue behind one round trip and
    /// reuse its result. On server rejection the session is cleared and
    /// [`AppEvent::SessionExpired`] is emitted; transient network failures
    /// leave the session untouched.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotSignedIn`] without a refresh token on hand,
    /// [`SessionError::Expired`] when the server rejects it, and transport
    /// or protocol errors otherwise.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<String, SessionError> {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let _flight = self.inner.refresh_flight.lock().await;

        // Another caller refreshed while we queued.
        if self.inner.generation.load(Ordering::Acquire) != generation
            && let Some(token) = self.access_token()
        {
            return Ok(token);
        }

        let refresh_token = self
            .with_state(|state| state.refresh_token.clone())
            .ok_or(SessionError::NotSignedIn)?;

        let response = self
            .inner
            .http
            .post(&self.inner.refresh_url)
            .json(&serde_json::json!({ "refreshToken": refresh_token.expose_secret() }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            info!("refresh token rejected, ending session");
            self.clear();
            self.inner.bus.emit(&AppEvent::SessionExpired);
            return Err(SessionError::Expired);
        }
        if !status.is_success() {
            return Err(SessionError::Server(status.as_u16()));
        }

        let envelope: RefreshEnvelope = response.json().await?;
        let Some(data) = envelope.data.filter(|_| envelope.success) else {
            return Err(SessionError::Server(status.as_u16()));
        };

        // Servers that do not rotate keep the old refresh token valid.
        let next_refresh = data
            .refresh_token
            .unwrap_or_else(|| refresh_token.expose_secret().to_owned());
        self.set_tokens(data.access_token.clone(), next_refresh);
        self.inner.bus.emit(&AppEvent::AuthTokenRefreshed);
        debug!("access token refreshed");

        Ok(data.access_token)
    }

    /// Drop all session state, locally only. Infallible: storage failures
    /// are logged and swallowed so sign-out always completes.
    pub fn clear(&self) {
        self.with_state(|state| {
            state.access_token = None;
            state.refresh_token = None;
            if let Some(handle) = state.renewal.take() {
                handle.abort();
            }
        });
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.storage.remove(REFRESH_TOKEN_KEY);
    }

    /// Whether a renewal is currently scheduled.
    #[must_use]
    pub fn has_pending_renewal(&self) -> bool {
        self.with_state(|state| {
            state
                .renewal
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
        })
    }

    fn schedule_renewal(&self) {
        // Outside a runtime (sync unit tests) there is nothing to drive the
        // timer; the session still works, it just will not self-renew.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, skipping renewal timer");
            return;
        };

        let manager = self.clone();
        let delay = self.inner.refresh_after;
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = manager.refresh_access_token().await {
                warn!(error = %e, "scheduled session renewal failed");
            }
        });

        self.with_state(|state| {
            if let Some(previous) = state.renewal.replace(task.abort_handle()) {
                previous.abort();
            }
        });
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut TokenState) -> T) -> T {
        let mut state = match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut state)
    }
}
