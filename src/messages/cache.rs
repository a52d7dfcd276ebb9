use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::status::{mapped_status, status_for_type};
use super::{render, CachedMessage, MessageError, MessageOrigin, MessageResponse};
use crate::deadline::Deadline;

struct RefreshTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Read-mostly catalog of message templates keyed by code.
///
/// Reads share the guard. A miss asks the origin outside any lock and then
/// inserts under the write guard, keeping whichever entry landed first.
/// Reloads build the replacement map before taking the write guard, so
/// readers only ever see a whole snapshot.
pub struct MessageCache {
    origin: Arc<dyn MessageOrigin>,
    messages: RwLock<HashMap<String, Arc<CachedMessage>>>,
    refresh: Mutex<Option<RefreshTask>>,
}

impl MessageCache {
    pub fn new(origin: Arc<dyn MessageOrigin>) -> Self {
        Self {
            origin,
            messages: RwLock::new(HashMap::new()),
            refresh: Mutex::new(None),
        }
    }

    /// Replace the map with every active message. On failure the current map stays.
    pub async fn reload(&self, deadline: Deadline) -> Result<usize, MessageError> {
        let fresh = deadline
            .run(self.origin.fetch_active(deadline))
            .await
            .map_err(|_| MessageError::Timeout)??;

        let map: HashMap<String, Arc<CachedMessage>> = fresh
            .into_iter()
            .map(|m| (m.code.clone(), Arc::new(m)))
            .collect();
        let count = map.len();

        *self.messages.write().await = map;
        Ok(count)
    }

    /// Cached entry for `code`, hydrated from the origin on a miss.
    pub async fn get(&self, deadline: Deadline, code: &str) -> Option<Arc<CachedMessage>> {
        if let Some(message) = self.messages.read().await.get(code) {
            return Some(Arc::clone(message));
        }

        debug!("message {} not cached, asking origin", code);
        let fetched = match deadline.run(self.origin.fetch_by_code(deadline, code)).await {
            Ok(Ok(Some(message))) => message,
            Ok(Ok(None)) => {
                debug!("message {} does not exist", code);
                return None;
            }
            Ok(Err(e)) => {
                warn!("message {} lookup failed: {}", code, e);
                return None;
            }
            Err(_) => {
                warn!("message {} lookup timed out", code);
                return None;
            }
        };

        let mut messages = self.messages.write().await;
        let entry = messages
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(fetched));
        Some(Arc::clone(entry))
    }

    /// Render `code` with positional parameters.
    pub async fn get_response<S: AsRef<str>>(
        &self,
        deadline: Deadline,
        code: &str,
        params: &[S],
    ) -> Option<MessageResponse> {
        let message = self.get(deadline, code).await?;
        Some(MessageResponse {
            code: message.code.clone(),
            message_type: message.message_type,
            title: message.title.clone(),
            content: render(&message.content, params),
        })
    }

    /// HTTP status for `code`: static table, then message type, then 500.
    pub async fn http_status(&self, deadline: Deadline, code: &str) -> u16 {
        if let Some(status) = mapped_status(code) {
            return status;
        }
        match self.get(deadline, code).await {
            Some(message) => status_for_type(message.message_type),
            None => 500,
        }
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    /// Reload every `period` on a background task. Returns false when a
    /// task is already running or the period is zero.
    pub async fn start_auto_refresh(self: &Arc<Self>, period: Duration) -> bool {
        if period.is_zero() {
            info!("message auto-refresh disabled");
            return false;
        }

        let mut slot = self.refresh.lock().await;
        if slot.is_some() {
            return false;
        }

        let (stop, mut stopped) = watch::channel(false);
        let cache = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match cache.reload(Deadline::after(period)).await {
                            Ok(count) => debug!("message catalog refreshed, {} entries", count),
                            Err(e) => warn!("message catalog refresh failed, keeping previous map: {}", e),
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            info!("message auto-refresh stopped");
        });

        info!("message auto-refresh every {:?}", period);
        *slot = Some(RefreshTask { stop, handle });
        true
    }

    pub async fn stop_auto_refresh(&self) {
        let task = self.refresh.lock().await.take();
        if let Some(task) = task {
            let _ = task.stop.send(true);
            if let Err(e) = task.handle.await {
                warn!("message refresh task ended abnormally: {}", e);
            }
        }
    }
}
