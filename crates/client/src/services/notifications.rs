//! Notification list and the live server-sent-events stream.
//!
//! The stream authenticates with the access token as a query parameter,
//! since `EventSource`-style endpoints cannot carry headers. A dropped
//! connection reconnects after a fixed delay for as long as the session
//! holds; losing the session ends the task.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use prepbox_core::NotificationId;

use crate::endpoints;
use crate::error::ApiResult;
use crate::events::{AppEvent, EventBus};
use crate::http::ApiClient;
use crate::models::Notification;
use crate::stores::NotificationsStore;

#[derive(Clone)]
pub struct NotificationService {
    api: ApiClient,
    bus: EventBus,
    store: NotificationsStore,
    page_size: u32,
    reconnect_delay: Duration,
    stream_task: Arc<Mutex<Option<AbortHandle>>>,
}

impl NotificationService {
    #[must_use]
    pub fn new(
        api: ApiClient,
        bus: EventBus,
        store: NotificationsStore,
        page_size: u32,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            api,
            bus,
            store,
            page_size,
            reconnect_delay,
            stream_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Fetch the first page of notifications into the store.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> ApiResult<Vec<Notification>> {
        let page = self
            .api
            .get_paged::<Notification>(endpoints::NOTIFICATIONS, 1, self.page_size)
            .await?;
        self.store.set_notifications(page.items.clone());
        Ok(page.items)
    }

    /// Mark one notification read, locally first for snappy UI, then on the
    /// server.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn mark_read(&self, id: &NotificationId) -> ApiResult<()> {
        if let Some(updated) = self.store.mark_read(id) {
            self.bus.emit(&AppEvent::NotificationRead(updated));
        }
        self.api
            .post_no_data(&endpoints::notification_read(id), &serde_json::json!({}))
            .await
    }

    /// Archive one notification, locally first.
    ///
    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn archive(&self, id: &NotificationId) -> ApiResult<()> {
        self.store.archive(id);
        self.api
            .post_no_data(&endpoints::notification_archive(id), &serde_json::json!({}))
            .await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn delete(&self, id: &NotificationId) -> ApiResult<()> {
        self.store.remove(id);
        self.api.delete(&endpoints::notification(id)).await
    }

    /// # Errors
    /// See [`crate::error::ApiError`].
    pub async fn mark_all_read(&self) -> ApiResult<()> {
        self.store.mark_all_read();
        self.api
            .post_no_data(endpoints::NOTIFICATIONS_READ_ALL, &serde_json::json!({}))
            .await
    }

    /// Start the live stream. Replaces any previous stream task, so at most
    /// one connection is open per client.
    pub fn start_stream(&self) {
        let service = self.clone();
        let task = tokio::spawn(async move { service.run_stream().await });

        let mut slot = match self.stream_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = slot.replace(task.abort_handle()) {
            previous.abort();
        }
    }

    /// Stop the live stream, if running.
    pub fn stop_stream(&self) {
        let mut slot = match self.stream_task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = slot.take() {
            task.abort();
            debug!("notification stream stopped");
        }
    }

    async fn run_stream(&self) {
        loop {
            let Some(token) = self.api.session().access_token() else {
                info!("no session, ending notification stream");
                return;
            };

            let url = endpoints::join(self.api.base_url(), endpoints::NOTIFICATION_STREAM);
            let request = self
                .api
                .raw()
                .get(&url)
                .query(&[("token", token)])
                .header(reqwest::header::ACCEPT, "text/event-stream");

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("notification stream connected");
                    self.consume(response).await;
                    warn!("notification stream closed, reconnecting");
                }
                Ok(response) => {
                    warn!(status = %response.status(), "notification stream rejected");
                }
                Err(e) => {
                    warn!(error = %e, "notification stream connection failed");
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn consume(&self, response: reqwest::Response) {
        let mut buffer = String::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let Ok(bytes) = chunk else { return };
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(boundary) = buffer.find("\n\n") {
                let event = buffer[..boundary].to_owned();
                buffer.drain(..boundary + 2);
                if let Some(notification) = parse_sse_event(&event) {
                    self.store.push(notification.clone());
                    self.bus
                        .emit(&AppEvent::NotificationReceived(notification));
                }
            }
        }
    }
}

/// Extract a notification from one SSE event block. Comment lines and
/// non-notification payloads (keep-alives) yield `None`.
fn parse_sse_event(block: &str) -> Option<Notification> {
    let data: String = block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n");
    if data.is_empty() {
        return None;
    }
    match serde_json::from_str(&data) {
        Ok(notification) => Some(notification),
        Err(e) => {
            debug!(error = %e, "ignoring non-notification stream payload");
            None
        }
    }
}
