//! Error taxonomy for the API client and services.

use std::collections::HashMap;

use thiserror::Error;

/// Failures surfaced by API calls.
///
/// Transport failures and non-2xx envelopes are folded into one enum so the
/// service layer matches on outcome, not on which layer produced it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401 that survived a refresh-and-retry cycle, or a refresh that failed.
    #[error("unauthorized")]
    Unauthorized,

    /// 422 with per-field messages. Not surfaced as a global error banner;
    /// forms render the field map inline.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: HashMap<String, String>,
    },

    /// Any other non-success status.
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The envelope reported success but carried no `data` payload.
    #[error("response envelope had no data")]
    MissingData,

    /// The body was not the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status behind this error, where one exists.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Validation { .. } => Some(422),
            Self::Server { status, .. } => Some(*status),
            Self::Network(source) => source.status().map(|s| s.as_u16()),
            Self::MissingData | Self::Decode(_) => None,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(source) => !source.is_builder(),
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
