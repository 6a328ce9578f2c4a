//! Multi-writer synchronization
//!
//! The whole board travels as one [`SyncDocument`] carrying a millisecond
//! `lastUpdate` stamp. A [`SyncTransport`] moves documents to and from some
//! shared store; the [`agent::SyncAgent`] pushes local changes and polls for
//! remote ones. Conflicts resolve last-write-wins on the stamp, with no field
//! merge: when two boards edit concurrently the later writer's whole document
//! survives.

pub mod agent;
pub mod broadcast;
pub mod http;

pub use agent::SyncAgent;
pub use broadcast::{LocalBroadcastTransport, LocalHub};
pub use http::HttpDocumentTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast as channel;

use crate::board::Board;
use crate::models::{Activity, Allocation, BoardSnapshot, ChatMessage, Plan, Title};
use crate::Result;

/// Shared board document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncDocument {
    pub titles: Vec<Title>,
    pub plans: Vec<Plan>,
    pub activities: Vec<Activity>,
    pub allocation: Allocation,
    pub chat_history: Vec<ChatMessage>,
    pub last_update: i64,
    pub updated_by: String,
}

impl SyncDocument {
    /// Capture the board's current state, stamped with its latest mutation
    pub fn from_board(board: &Board, updated_by: &str) -> Self {
        let BoardSnapshot {
            titles,
            plans,
            activities,
            allocation,
            chat_history,
        } = board.snapshot();
        Self {
            titles,
            plans,
            activities,
            allocation,
            chat_history,
            last_update: board.last_update(),
            updated_by: updated_by.to_string(),
        }
    }

    pub fn into_snapshot(self) -> (BoardSnapshot, i64) {
        let snapshot = BoardSnapshot {
            titles: self.titles,
            plans: self.plans,
            activities: self.activities,
            allocation: self.allocation,
            chat_history: self.chat_history,
        };
        (snapshot, self.last_update)
    }
}

/// Moves documents to and from a shared store
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Replace the shared document
    async fn push(&self, document: &SyncDocument) -> Result<()>;

    /// Fetch the shared document; `None` when the store holds nothing yet
    async fn pull(&self) -> Result<Option<SyncDocument>>;

    /// Human-readable target, e.g. the bin URL
    fn describe(&self) -> String;

    /// Stamps of documents pushed by others, for transports that can notify
    ///
    /// Polling transports return `None` and rely on the agent's interval.
    fn changes(&self) -> Option<channel::Receiver<i64>> {
        None
    }
}

/// Sync health as reported to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub enabled: bool,
    pub transport: Option<String>,
    /// Stamp of the latest document pushed or applied
    pub last_synced: Option<i64>,
    /// A local change is waiting to be pushed
    pub pending_push: bool,
    pub last_error: Option<String>,
}

impl SyncStatus {
    pub fn disabled() -> Self {
        Self::default()
    }
}
