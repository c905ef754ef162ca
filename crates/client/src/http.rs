//! HTTP client for the PrepBox backend.
//!
//! Every response travels in a `{ success, data, error, errors }` envelope;
//! the client unwraps it and folds transport problems, envelope failures,
//! and non-2xx statuses into [`ApiError`].
//!
//! A 401 on an authenticated request triggers one refresh-and-retry cycle.
//! The retry flag is scoped to the request, so a retry that 401s again is
//! surfaced as [`ApiError::Unauthorized`] rather than looping. A refresh
//! that fails on this path ends the session. Connectivity loss and every
//! non-2xx response other than 401 are announced on the bus for the UI's
//! error surface; validation failures (422) are not, since forms render
//! those inline.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::endpoints;
use crate::error::{ApiError, ApiResult};
use crate::events::{AppEvent, EventBus};
use crate::session::{SessionError, SessionManager};

/// Response envelope used by every backend endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
    #[serde(default)]
    errors: HashMap<String, String>,
    pagination: Option<Pagination>,
}

/// Paging metadata attached to list responses.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

/// One page of a list endpoint.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Cheaply cloneable API client; clones share one connection pool and one
/// session.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    session: SessionManager,
    bus: EventBus,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        session: SessionManager,
        bus: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                session,
                bus,
            }),
        }
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    /// Base URL requests are joined onto. The notification stream builds its
    /// own long-lived request from this.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub(crate) fn raw(&self) -> &reqwest::Client {
        &self.inner.http
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(Method::GET, path, &[], None).await
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.execute(Method::GET, path, query, None).await
    }

    /// Fetch one page of a list endpoint, with its paging metadata.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> ApiResult<Page<T>> {
        let query = [("page", page.to_string()), ("limit", limit.to_string())];
        let envelope = self
            .send_enveloped::<Vec<T>>(Method::GET, path, &query, None)
            .await?;
        let items = envelope.data.ok_or(ApiError::MissingData)?;
        Ok(Page {
            items,
            pagination: envelope.pagination.unwrap_or_default(),
        })
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, &[], Some(body)).await
    }

    /// POST with an empty body.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(Method::POST, path, &[], Some(serde_json::json!({})))
            .await
    }

    /// POST whose response carries no payload worth decoding.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn post_no_data<B: serde::Serialize>(&self, path: &str, body: &B) -> ApiResult<()> {
        let body = serde_json::to_value(body)?;
        self.send_enveloped::<serde_json::Value>(Method::POST, path, &[], Some(body))
            .await?;
        Ok(())
    }

    /// # Errors
    /// See [`ApiError`].
    pub async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::PATCH, path, &[], Some(body)).await
    }

    /// DELETE whose response carries no payload worth decoding.
    ///
    /// # Errors
    /// See [`ApiError`].
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send_enveloped::<serde_json::Value>(Method::DELETE, path, &[], None)
            .await?;
        Ok(())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> ApiResult<T> {
        let envelope = self.send_enveloped(method, path, query, body).await?;
        envelope.data.ok_or(ApiError::MissingData)
    }

    async fn send_enveloped<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> ApiResult<Envelope<T>> {
        let url = endpoints::join(&self.inner.base_url, path);
        let mut retried = false;

        loop {
            let mut request = self.inner.http.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            if let Some(token) = self.inner.session.access_token() {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(%url, error = %e, "request failed to reach the server");
                    self.inner.bus.emit(&AppEvent::ConnectivityLost {
                        message: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                debug!(%url, "401, refreshing session and retrying once");
                match self.inner.session.refresh_access_token().await {
                    Ok(_) => continue,
                    Err(e) => {
                        // A session that cannot renew is over, whatever the
                        // refresh endpoint's failure mode. Expired has
                        // already torn the session down and announced it;
                        // NotSignedIn never had a session to end.
                        if !matches!(
                            e,
                            SessionError::Expired | SessionError::NotSignedIn
                        ) {
                            warn!(error = %e, "refresh failed mid-request, ending session");
                            self.inner.session.clear();
                            self.inner.bus.emit(&AppEvent::SessionExpired);
                        }
                        return Err(ApiError::Unauthorized);
                    }
                }
            }

            return self.unwrap_response(status, response).await;
        }
    }

    async fn unwrap_response<T: DeserializeOwned>(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> ApiResult<Envelope<T>> {
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        if status.is_success() {
            let envelope: Envelope<T> = response.json().await?;
            if !envelope.success {
                let message = envelope_message(envelope.error, envelope.message, status);
                return Err(ApiError::Server {
                    status: status.as_u16(),
                    message,
                });
            }
            return Ok(envelope);
        }

        // Error envelopes reuse the success shape with data absent.
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<Envelope<serde_json::Value>> = serde_json::from_str(&body).ok();
        let (error, message, errors) = parsed
            .map(|e| (e.error, e.message, e.errors))
            .unwrap_or_default();
        let message = envelope_message(error, message, status);

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ApiError::Validation {
                message,
                fields: errors,
            });
        }

        self.inner.bus.emit(&AppEvent::ServerError {
            status: status.as_u16(),
            message: message.clone(),
        });

        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

fn envelope_message(
    error: Option<String>,
    message: Option<String>,
    status: StatusCode,
) -> String {
    error
        .or(message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned())
}
