//! In-process broadcast transport
//!
//! Several boards in one process share a [`LocalHub`]. The hub keeps the
//! latest pushed document and announces each push's stamp to every
//! subscriber, so peers pull immediately instead of waiting for their next
//! poll.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{SyncDocument, SyncTransport};
use crate::{Error, Result};

const HUB_CHANNEL_CAPACITY: usize = 64;

/// Shared document slot plus change announcements
pub struct LocalHub {
    latest: Mutex<Option<SyncDocument>>,
    tx: broadcast::Sender<i64>,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(HUB_CHANNEL_CAPACITY);
        Arc::new(Self {
            latest: Mutex::new(None),
            tx,
        })
    }

    /// Stamp of the stored document, if any
    pub fn latest_stamp(&self) -> Option<i64> {
        self.latest
            .lock()
            .ok()
            .and_then(|latest| latest.as_ref().map(|doc| doc.last_update))
    }
}

/// One board's connection to a [`LocalHub`]
pub struct LocalBroadcastTransport {
    hub: Arc<LocalHub>,
    name: String,
}

impl LocalBroadcastTransport {
    pub fn new(hub: Arc<LocalHub>, name: impl Into<String>) -> Self {
        Self {
            hub,
            name: name.into(),
        }
    }
}

#[async_trait]
impl SyncTransport for LocalBroadcastTransport {
    async fn push(&self, document: &SyncDocument) -> Result<()> {
        {
            let mut latest = self
                .hub
                .latest
                .lock()
                .map_err(|_| Error::Internal("local hub lock poisoned".to_string()))?;
            *latest = Some(document.clone());
        }
        let _ = self.hub.tx.send(document.last_update);
        Ok(())
    }

    async fn pull(&self) -> Result<Option<SyncDocument>> {
        let latest = self
            .hub
            .latest
            .lock()
            .map_err(|_| Error::Internal("local hub lock poisoned".to_string()))?;
        Ok(latest.clone())
    }

    fn describe(&self) -> String {
        format!("local {}", self.name)
    }

    fn changes(&self) -> Option<broadcast::Receiver<i64>> {
        Some(self.hub.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_is_visible_and_announced() {
        let hub = LocalHub::new();
        let a = LocalBroadcastTransport::new(hub.clone(), "a");
        let b = LocalBroadcastTransport::new(hub.clone(), "b");
        let mut changes = b.changes().unwrap();

        assert!(b.pull().await.unwrap().is_none());

        let doc = SyncDocument {
            last_update: 7,
            updated_by: "alice".to_string(),
            ..Default::default()
        };
        a.push(&doc).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), 7);
        assert_eq!(b.pull().await.unwrap().unwrap().updated_by, "alice");
        assert_eq!(hub.latest_stamp(), Some(7));
        assert_eq!(a.describe(), "local a");
    }
}
