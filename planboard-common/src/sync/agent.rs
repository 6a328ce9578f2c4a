//! Background sync agent
//!
//! One task per board. Each cycle first pushes the queued local document (if
//! any), then pulls the shared one and hands it to the service when it is
//! newer than anything seen before and was not written by this board.
//!
//! Failure policy: a failed push keeps the document queued (only the newest
//! is retained) and retries next cycle; a failed pull skips the cycle. A
//! queued document is never pushed over a shared one with an equal or newer
//! stamp. Local mutations never wait on the transport.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{SyncDocument, SyncStatus, SyncTransport};
use crate::events::BoardEvent;
use crate::service::BoardService;
use crate::{time, Result};

/// Default poll interval
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(2000);

/// Shortest accepted poll interval
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_millis(100);

/// Longest accepted poll interval
pub const MAX_SYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct AgentState {
    /// Newest local document not yet accepted by the transport
    pending: Option<SyncDocument>,
    /// Highest remote stamp observed
    last_seen: i64,
    /// Stamp and author of our latest successful push
    last_pushed: Option<(i64, String)>,
    last_synced: Option<i64>,
    last_error: Option<String>,
    /// The last pull found no shared document at all
    store_empty: bool,
}

pub struct SyncAgent {
    transport: Arc<dyn SyncTransport>,
    interval: Duration,
    state: Mutex<AgentState>,
    push_now: Notify,
}

impl SyncAgent {
    /// `interval` is clamped to the accepted range
    pub fn new(transport: Arc<dyn SyncTransport>, interval: Duration) -> Self {
        Self {
            transport,
            interval: interval.clamp(MIN_SYNC_INTERVAL, MAX_SYNC_INTERVAL),
            state: Mutex::new(AgentState::default()),
            push_now: Notify::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    fn state(&self) -> MutexGuard<'_, AgentState> {
        // State updates are plain field writes, so a poisoned lock still holds consistent data
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the board's latest document and wake the agent
    pub fn queue_push(&self, document: SyncDocument) {
        self.state().pending = Some(document);
        self.push_now.notify_one();
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state();
        SyncStatus {
            enabled: true,
            transport: Some(self.transport.describe()),
            last_synced: state.last_synced,
            pending_push: state.pending.is_some(),
            last_error: state.last_error.clone(),
        }
    }

    /// Push the queued document; `Ok(false)` when nothing was pushed
    ///
    /// The shared document is read first. A queued document that is not newer
    /// than it is dropped instead of pushed, so the shared stamp never goes
    /// backwards; the following pull brings the newer document in.
    pub async fn flush(&self) -> Result<bool> {
        let Some(document) = self.state().pending.take() else {
            return Ok(false);
        };

        let pushed = match self.transport.pull().await {
            Ok(Some(remote)) if remote.last_update >= document.last_update => {
                debug!(
                    "Shared document {} from {} supersedes queued {}, not pushing",
                    remote.last_update, remote.updated_by, document.last_update
                );
                return Ok(false);
            }
            Ok(_) => self.transport.push(&document).await,
            Err(e) => Err(e),
        };

        match pushed {
            Ok(()) => {
                let mut state = self.state();
                state.last_synced = Some(state.last_synced.unwrap_or(0).max(document.last_update));
                state.last_pushed = Some((document.last_update, document.updated_by));
                state.last_error = None;
                Ok(true)
            }
            Err(e) => {
                let mut state = self.state();
                // Keep it unless a newer document was queued meanwhile
                if state.pending.is_none() {
                    state.pending = Some(document);
                }
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Forget a queued document older than `stamp`
    ///
    /// Called once a remote document with that stamp replaced the board.
    pub fn discard_pending_before(&self, stamp: i64) {
        let mut state = self.state();
        if state.pending.as_ref().is_some_and(|doc| doc.last_update < stamp) {
            debug!("Dropping queued document older than applied {}", stamp);
            state.pending = None;
        }
    }

    /// Pull the shared document and return it if it should be applied
    ///
    /// Documents at or below the highest stamp already observed, and documents
    /// this board pushed itself, are ignored.
    pub async fn fetch_remote(&self) -> Result<Option<SyncDocument>> {
        let document = match self.transport.pull().await {
            Ok(Some(document)) => document,
            Ok(None) => {
                self.state().store_empty = true;
                return Ok(None);
            }
            Err(e) => {
                self.state().last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let mut state = self.state();
        state.store_empty = false;
        if document.last_update <= state.last_seen {
            return Ok(None);
        }
        state.last_seen = document.last_update;

        if let Some((stamp, author)) = &state.last_pushed {
            if *stamp == document.last_update && *author == document.updated_by {
                debug!("Ignoring our own document (stamp {})", stamp);
                return Ok(None);
            }
        }
        Ok(Some(document))
    }

    /// One push-then-pull cycle
    pub async fn sync_once(&self, service: &BoardService) -> SyncStatus {
        let before = self.status();
        let mut cycle_error = None;

        if let Err(e) = self.flush().await {
            warn!("Sync push failed, retrying next cycle: {}", e);
            cycle_error = Some(e.to_string());
        }

        match self.fetch_remote().await {
            Ok(Some(document)) => {
                let stamp = document.last_update;
                match service.apply_remote(document).await {
                    Ok(true) => {
                        let mut state = self.state();
                        state.last_synced = Some(state.last_synced.unwrap_or(0).max(stamp));
                    }
                    Ok(false) => debug!("Remote document {} is older than local state", stamp),
                    Err(e) => {
                        error!("Failed to apply remote document {}: {}", stamp, e);
                        cycle_error = Some(e.to_string());
                    }
                }
            }
            Ok(None) => {
                let seed = {
                    let state = self.state();
                    state.store_empty && state.pending.is_none()
                };
                if seed {
                    // Fresh shared store: publish what this board already has
                    service.publish_local().await;
                }
            }
            Err(e) => {
                warn!("Sync pull failed, skipping cycle: {}", e);
                cycle_error = Some(e.to_string());
            }
        }

        self.state().last_error = cycle_error;
        let after = self.status();
        if after != before {
            service.events().emit_lossy(BoardEvent::SyncStatusChanged {
                status: after.clone(),
                timestamp: time::now(),
            });
        }
        after
    }

    /// Run until `cancel` fires
    pub async fn run(self: Arc<Self>, service: Arc<BoardService>, cancel: CancellationToken) {
        info!(
            "Sync agent started ({}, every {} ms)",
            self.transport.describe(),
            self.interval.as_millis()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut changes = self.transport.changes();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sync_once(&service).await;
                }
                _ = self.push_now.notified() => {
                    if let Err(e) = self.flush().await {
                        warn!("Sync push failed, retrying next cycle: {}", e);
                    }
                }
                change = next_change(&mut changes) => {
                    if let Some(stamp) = change {
                        debug!("Peer announced document {}", stamp);
                        self.sync_once(&service).await;
                    }
                }
            }
        }

        if let Err(e) = self.flush().await {
            warn!("Final sync push failed: {}", e);
        }
        info!("Sync agent stopped");
    }
}

/// Next announced stamp; pends forever for polling-only transports
async fn next_change(changes: &mut Option<broadcast::Receiver<i64>>) -> Option<i64> {
    let Some(rx) = changes.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(stamp) => Some(stamp),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!("Missed {} change announcements", skipped);
            Some(0)
        }
        Err(broadcast::error::RecvError::Closed) => {
            *changes = None;
            None
        }
    }
}
