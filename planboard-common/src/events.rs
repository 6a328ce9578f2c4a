//! Board change events
//!
//! Every successful board mutation, remote overwrite and sync status change is
//! published as a [`BoardEvent`] on the [`EventBus`]. The server streams them
//! to clients as SSE, using the variant name as the SSE event name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::import::ImportReport;
use crate::models::{Activity, Allocation, AllocationUsage, ChatMessage, Plan, Title};
use crate::sync::SyncStatus;

/// Board change notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoardEvent {
    /// A title was created or edited
    TitleSaved {
        title: Title,
        created: bool,
        timestamp: DateTime<Utc>,
    },

    /// One or more titles (and their plans) were removed
    TitlesDeleted {
        title_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A plan was created or replaced
    PlanSaved {
        plan: Plan,
        created: bool,
        timestamp: DateTime<Utc>,
    },

    PlanDeleted {
        title_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Allocation limits changed
    AllocationChanged {
        allocation: Allocation,
        usage: AllocationUsage,
        timestamp: DateTime<Utc>,
    },

    /// An activity entry was added to the feed
    ActivityAppended { activity: Activity },

    ActivityCleared { timestamp: DateTime<Utc> },

    /// A spreadsheet import finished
    ImportCompleted {
        source: String,
        report: ImportReport,
        timestamp: DateTime<Utc>,
    },

    /// Chat messages were appended, or the history was cleared (`messages` empty)
    ChatUpdated {
        messages: Vec<ChatMessage>,
        cleared: bool,
        timestamp: DateTime<Utc>,
    },

    /// Local state was overwritten by a newer shared document
    RemoteChangeApplied {
        last_update: i64,
        updated_by: String,
        timestamp: DateTime<Utc>,
    },

    SyncStatusChanged {
        status: SyncStatus,
        timestamp: DateTime<Utc>,
    },
}

impl BoardEvent {
    /// Event name used for SSE `event:` lines
    pub fn event_type(&self) -> &'static str {
        match self {
            BoardEvent::TitleSaved { .. } => "TitleSaved",
            BoardEvent::TitlesDeleted { .. } => "TitlesDeleted",
            BoardEvent::PlanSaved { .. } => "PlanSaved",
            BoardEvent::PlanDeleted { .. } => "PlanDeleted",
            BoardEvent::AllocationChanged { .. } => "AllocationChanged",
            BoardEvent::ActivityAppended { .. } => "ActivityAppended",
            BoardEvent::ActivityCleared { .. } => "ActivityCleared",
            BoardEvent::ImportCompleted { .. } => "ImportCompleted",
            BoardEvent::ChatUpdated { .. } => "ChatUpdated",
            BoardEvent::RemoteChangeApplied { .. } => "RemoteChangeApplied",
            BoardEvent::SyncStatusChanged { .. } => "SyncStatusChanged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel:
/// - publishing never blocks on slow subscribers
/// - subscribers only see events emitted after they subscribe
/// - a subscriber that falls more than `capacity` events behind gets `Lagged`
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BoardEvent) -> Result<usize, broadcast::error::SendError<BoardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BoardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
