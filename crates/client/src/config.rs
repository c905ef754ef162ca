//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; the defaults target a local backend.
//!
//! - `PREPBOX_API_URL` - Backend base URL (default: <http://localhost:5000/api/v1>)
//! - `PREPBOX_REQUEST_TIMEOUT_MS` - HTTP request timeout (default: 30000)
//! - `PREPBOX_DATA_DIR` - Directory for persisted storage and the offline
//!   cache (default: `.prepbox` under the platform data dir, falling back to
//!   the current directory)
//! - `PREPBOX_STORAGE_PREFIX` - Key prefix for persisted storage (default: `prepbox_`)
//! - `PREPBOX_PAGE_SIZE` - Default page size for list endpoints (default: 20)
//! - `PREPBOX_NOTIFICATION_PAGE_SIZE` - Page size for notifications (default: 50)
//! - `PREPBOX_TOKEN_REFRESH_AFTER_SECS` - Delay before proactive session
//!   renewal (default: 518400, six days)
//! - `PREPBOX_SSE_RECONNECT_DELAY_MS` - Backoff before reconnecting the
//!   notification stream (default: 5000)
//! - `PREPBOX_ENABLE_2FA` - Two-factor enrollment surface (default: true)
//! - `PREPBOX_ENABLE_REFERRALS` - Referral program surface (default: true)
//! - `PREPBOX_ENABLE_DISCOUNTS` - Discount code entry (default: true)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, including the `/api/v1` prefix.
    pub api_url: Url,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Root directory for the key-value store and offline cache.
    pub data_dir: PathBuf,
    /// Prefix namespacing every persisted storage key.
    pub storage_prefix: String,
    /// Default page size for list endpoints.
    pub page_size: u32,
    /// Page size for the notification list.
    pub notification_page_size: u32,
    /// How long after sign-in the session renews itself. Shorter than the
    /// server's token lifetime so renewal happens while the token is valid.
    pub token_refresh_after: Duration,
    /// Backoff before reconnecting a dropped notification stream.
    pub sse_reconnect_delay: Duration,
    /// Feature switches for optional account surfaces.
    pub features: FeatureFlags,
}

/// Feature switches for optional account surfaces.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    pub two_factor: bool,
    pub referrals: bool,
    pub discounts: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            two_factor: true,
            referrals: true,
            discounts: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_env_or_default("PREPBOX_API_URL", "http://localhost:5000/api/v1")
            .parse::<Url>()
            .map_err(|e| ConfigError::InvalidEnvVar("PREPBOX_API_URL".to_string(), e.to_string()))?;

        let request_timeout =
            Duration::from_millis(parse_env_or("PREPBOX_REQUEST_TIMEOUT_MS", 30_000)?);
        let token_refresh_after = Duration::from_secs(parse_env_or(
            "PREPBOX_TOKEN_REFRESH_AFTER_SECS",
            6 * 24 * 60 * 60,
        )?);
        let sse_reconnect_delay =
            Duration::from_millis(parse_env_or("PREPBOX_SSE_RECONNECT_DELAY_MS", 5_000)?);

        let data_dir = get_optional_env("PREPBOX_DATA_DIR")
            .map_or_else(default_data_dir, PathBuf::from);

        Ok(Self {
            api_url,
            request_timeout,
            data_dir,
            storage_prefix: get_env_or_default("PREPBOX_STORAGE_PREFIX", "prepbox_"),
            page_size: parse_env_or("PREPBOX_PAGE_SIZE", 20)?,
            notification_page_size: parse_env_or("PREPBOX_NOTIFICATION_PAGE_SIZE", 50)?,
            token_refresh_after,
            sse_reconnect_delay,
            features: FeatureFlags {
                two_factor: parse_env_or("PREPBOX_ENABLE_2FA", true)?,
                referrals: parse_env_or("PREPBOX_ENABLE_REFERRALS", true)?,
                discounts: parse_env_or("PREPBOX_ENABLE_DISCOUNTS", true)?,
            },
        })
    }
}

fn default_data_dir() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(".prepbox")
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
