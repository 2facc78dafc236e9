//! Project change notifications over a `tokio::sync::broadcast` channel.
//!
//! Only effective changes are published. A not-modified update never
//! reaches subscribers.

use chrono::{DateTime, Utc};
use roster_core::types::Link;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub const EVENT_PROJECT_CREATED: &str = "project.created";
pub const EVENT_PROJECT_UPDATED: &str = "project.updated";
pub const EVENT_PROJECT_ROLES_UPDATED: &str = "project.roles_updated";
pub const EVENT_PROJECT_DELETED: &str = "project.deleted";

/// A state change of one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEvent {
    /// Dot-separated event name, e.g. `"project.updated"`.
    pub event_type: String,
    pub project_link: Link,
    /// Caller that triggered the change, if known.
    pub actor: Option<String>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ProjectEvent {
    pub fn new(event_type: impl Into<String>, project_link: impl Into<Link>) -> Self {
        Self {
            event_type: event_type.into(),
            project_link: project_link.into(),
            actor: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out bus shared as `Arc<ProjectEventBus>`.
///
/// Slow receivers that fall more than the channel capacity behind observe
/// `RecvError::Lagged`.
pub struct ProjectEventBus {
    sender: broadcast::Sender<ProjectEvent>,
}

impl ProjectEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to the current subscribers, if any.
    pub fn publish(&self, event: ProjectEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Project event dropped, no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProjectEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Log every event from `receiver` until the bus closes.
///
/// A lagging receiver skips what it missed and keeps going. Returns the
/// number of events logged.
pub async fn log_project_events(mut receiver: broadcast::Receiver<ProjectEvent>) -> u64 {
    let mut logged = 0;
    loop {
        match receiver.recv().await {
            Ok(event) => {
                tracing::info!(
                    event_type = %event.event_type,
                    project = %event.project_link,
                    actor = ?event.actor,
                    "Project event"
                );
                logged += 1;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "Project event log lagged, some events were not logged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Project event bus closed, event log shutting down");
                break;
            }
        }
    }
    logged
}
