//! Per-path single-flight coordination.
//!
//! The first miss on a logical path spawns the fetch as a detached task and
//! parks a `watch` receiver in the map. Later misses on the same path clone
//! that receiver and wait for the same result. The task outlives any caller,
//! so a client hanging up never aborts a download halfway.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use super::error::FetchError;
use super::path::LogicalPath;

pub type FetchResult = Result<PathBuf, FetchError>;

type Slot = watch::Receiver<Option<FetchResult>>;

/// Result of joining a flight.
#[derive(Debug)]
pub struct Landing {
    pub result: FetchResult,
    /// True when this caller piggybacked on a fetch started by another.
    pub coalesced: bool,
}

/// In-progress fetches keyed by logical path.
#[derive(Clone, Default)]
pub struct FlightMap {
    inner: Arc<DashMap<LogicalPath, Slot>>,
}

impl FlightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches currently running.
    pub fn in_flight(&self) -> usize {
        self.inner.len()
    }

    /// Wait for the fetch of `key`, starting it with `start` if none is running.
    ///
    /// `start` is only called by the caller that wins the slot.
    pub async fn join<F, Fut>(&self, key: &LogicalPath, start: F) -> Landing
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult> + Send + 'static,
    {
        let (mut rx, sender) = match self.inner.entry(key.clone()) {
            Entry::Occupied(slot) => (slot.get().clone(), None),
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx.clone());
                (rx, Some(tx))
            }
        };
        let coalesced = sender.is_none();

        if let Some(tx) = sender {
            let fut = start();
            let guard = SlotGuard {
                map: Arc::clone(&self.inner),
                key: key.clone(),
            };
            tokio::spawn(async move {
                let result = fut.await;
                // Slot is gone before anyone sees the result.
                drop(guard);
                let _ = tx.send(Some(result));
            });
        }

        let result = match rx.wait_for(Option::is_some).await {
            Ok(landed) => (*landed).clone().unwrap_or(Err(FetchError::Interrupted)),
            // Sender dropped without a value: the task panicked.
            Err(_) => Err(FetchError::Interrupted),
        };

        Landing { result, coalesced }
    }
}

/// Frees the slot when the fetch task ends, including by panic.
struct SlotGuard {
    map: Arc<DashMap<LogicalPath, Slot>>,
    key: LogicalPath,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
