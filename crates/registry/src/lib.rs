//! Strata registry adapter: raw change notifications in, typed governance events out.
//!
//! The registry publishes `(key, value, change type)` triples. [`decode`] maps a key onto
//! the path layout below and parses the YAML payload; the dispatch loops apply the result
//! through an [`EventCoordinator`].
//!
//! ```text
//! /metadata/{schema}
//! /metadata/{schema}/versions/{version}/dataSources
//! /metadata/{schema}/versions/{version}/rules
//! /metadata/{schema}/tables/{table}
//! /rules  /users  /props
//! /status/storage_nodes/{disable|primary}/{schema.name}
//! /status/compute_nodes/{status|worker_id|labels}/{instance id}
//! ```

#![forbid(unsafe_code)]

use futures::{Stream, StreamExt};
use metrics::counter;
use serde::{Deserialize, Serialize};
use strata_mode::EventCoordinator;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

mod decode;

pub use decode::decode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
    Ignored,
}

/// One registry notification. `value` is the raw YAML stored at `key` (empty on delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataChangedEvent {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
}

impl DataChangedEvent {
    pub fn new(key: impl Into<String>, value: impl Into<String>, change_type: ChangeType) -> Self {
        Self { key: key.into(), value: value.into(), change_type }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("decode payload at `{key}`: {source}")]
    Payload {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value at `{key}`: {reason}")]
    Invalid { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Counters for one dispatch loop, returned when its input ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub applied: u64,
    pub skipped: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl DispatchStats {
    /// Decode one notification and apply it. `renew` takes the writer lock and may hit
    /// persistence, so it runs on the blocking pool.
    async fn handle(&mut self, coordinator: &EventCoordinator, raw: DataChangedEvent) {
        self.received += 1;
        let event = match decode(&raw) {
            Ok(Some(event)) => event,
            Ok(None) => {
                self.skipped += 1;
                debug!(key = %raw.key, change = ?raw.change_type, "registry: notification not mapped");
                return;
            }
            Err(e) => {
                self.dropped += 1;
                counter!("registry_events_dropped_total", 1);
                warn!(key = %raw.key, error = %e, "registry: malformed notification dropped");
                return;
            }
        };
        let c = coordinator.clone();
        // the coordinator already logs and counts failures
        match tokio::task::spawn_blocking(move || c.renew(event)).await {
            Ok(Ok(())) => self.applied += 1,
            Ok(Err(_)) => self.failed += 1,
            Err(e) => {
                self.failed += 1;
                error!(key = %raw.key, error = %e, "registry: event handler panicked");
            }
        }
    }
}

/// Spawn a dispatch loop fed by the returned sender. The loop ends once every sender is dropped.
pub fn spawn_dispatch(coordinator: EventCoordinator, cap: usize) -> (mpsc::Sender<DataChangedEvent>, JoinHandle<DispatchStats>) {
    let (tx, mut rx) = mpsc::channel::<DataChangedEvent>(cap.max(1));
    let handle = tokio::spawn(async move {
        let mut stats = DispatchStats::default();
        while let Some(raw) = rx.recv().await {
            stats.handle(&coordinator, raw).await;
        }
        info!(?stats, "registry: dispatch loop finished");
        stats
    });
    (tx, handle)
}

/// Apply every notification of `stream` in order.
pub async fn drive<S>(stream: S, coordinator: &EventCoordinator) -> DispatchStats
where
    S: Stream<Item = DataChangedEvent>,
{
    futures::pin_mut!(stream);
    let mut stats = DispatchStats::default();
    while let Some(raw) = stream.next().await {
        stats.handle(coordinator, raw).await;
    }
    debug!(?stats, "registry: stream drained");
    stats
}
