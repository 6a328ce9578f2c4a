//! Board service
//!
//! Owns the one [`Board`] of the process together with its persistence, its
//! event bus and (optionally) its sync agent. Every mutation runs under the
//! board lock: change in memory, persist the full snapshot, publish events,
//! queue a sync push. Remote overwrites take the same lock, so they cannot
//! interleave with a local edit.

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, error, info};

use crate::advisor;
use crate::board::{Board, Dashboard, PlanUpsert, TitleFilter};
use crate::db::BoardRepository;
use crate::events::{BoardEvent, EventBus};
use crate::export::ExportDocument;
use crate::import::{self, ImportReport};
use crate::models::{
    Activity, Allocation, AllocationUsage, ChatMessage, Plan, PlanFields, Title, TitleFields,
};
use crate::sync::{SyncAgent, SyncDocument, SyncStatus};
use crate::{time, Error, Result};

/// Display name used until a user identifies themselves
pub const DEFAULT_USER: &str = "Planner";

/// Event bus capacity
pub const EVENT_CAPACITY: usize = 256;

pub struct BoardService {
    board: Mutex<Board>,
    repo: BoardRepository,
    events: EventBus,
    user: RwLock<String>,
    sync: Option<Arc<SyncAgent>>,
}

impl BoardService {
    /// Load the stored snapshot into `board` and wrap it
    ///
    /// The stored user name wins over `default_user`.
    pub async fn open(
        repo: BoardRepository,
        mut board: Board,
        default_user: &str,
        sync: Option<Arc<SyncAgent>>,
    ) -> Result<Self> {
        let (snapshot, last_update) = repo.load_snapshot().await?;
        board.replace_with(snapshot, last_update);

        let user = match repo.current_user().await? {
            Some(user) => user,
            None => clean_user(default_user).unwrap_or_else(|| DEFAULT_USER.to_string()),
        };

        info!(
            "Board loaded: {} titles, {} plans, {} activity entries (stamp {})",
            board.titles().len(),
            board.plans().len(),
            board.activities().len(),
            board.last_update()
        );

        Ok(Self {
            board: Mutex::new(board),
            repo,
            events: EventBus::new(EVENT_CAPACITY),
            user: RwLock::new(user),
            sync,
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn repository(&self) -> &BoardRepository {
        &self.repo
    }

    pub fn sync_agent(&self) -> Option<&Arc<SyncAgent>> {
        self.sync.as_ref()
    }

    pub async fn current_user(&self) -> String {
        self.user.read().await.clone()
    }

    /// Change the display name used for attribution
    pub async fn set_user(&self, name: &str) -> Result<String> {
        let name = clean_user(name)
            .ok_or_else(|| Error::InvalidInput("user name must not be empty".to_string()))?;
        self.repo.set_current_user(&name).await?;
        *self.user.write().await = name.clone();

        let mut board = self.board.lock().await;
        let head = head_id(&board);
        board.record_activity(format!("{} joined the planning session", name), &name);
        self.commit(&board, &name, head, Vec::new()).await;
        Ok(name)
    }

    /// Read access for callers that need several views at once
    pub async fn board(&self) -> MutexGuard<'_, Board> {
        self.board.lock().await
    }

    // ---- titles ----

    pub async fn list_titles(&self, filter: &TitleFilter) -> Vec<Title> {
        let board = self.board.lock().await;
        board.filter_titles(filter).into_iter().cloned().collect()
    }

    pub async fn get_title(&self, id: &str) -> Result<Title> {
        let board = self.board.lock().await;
        board
            .title(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("title {}", id)))
    }

    pub async fn create_title(&self, fields: TitleFields) -> Result<Title> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let title = board.create_title(fields, &user)?;
        let event = BoardEvent::TitleSaved {
            title: title.clone(),
            created: true,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(title)
    }

    pub async fn update_title(&self, id: &str, fields: TitleFields) -> Result<Title> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let title = board.update_title(id, fields, &user)?;
        let event = BoardEvent::TitleSaved {
            title: title.clone(),
            created: false,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(title)
    }

    /// Delete a title and its plan
    pub async fn delete_title(&self, id: &str) -> Result<Title> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let title = board.delete_title(id, &user)?;
        let event = BoardEvent::TitlesDeleted {
            title_ids: vec![title.id.clone()],
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(title)
    }

    /// Returns the ids actually removed
    pub async fn bulk_delete_titles(&self, ids: &[String]) -> Result<Vec<String>> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let removed = board.bulk_delete_titles(ids, &user)?;
        let event = BoardEvent::TitlesDeleted {
            title_ids: removed.clone(),
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(removed)
    }

    /// Parse a CSV sheet and add its rows
    pub async fn import_csv(&self, text: &str, source: &str) -> Result<ImportReport> {
        let sheet = import::parse_sheet(text)?;
        let source = match source.trim() {
            "" => "spreadsheet",
            name => name,
        };

        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let (report, added) = board.import_titles(sheet, source, &user);

        let mut events: Vec<BoardEvent> = added
            .into_iter()
            .map(|title| BoardEvent::TitleSaved {
                title,
                created: true,
                timestamp: time::now(),
            })
            .collect();
        events.push(BoardEvent::ImportCompleted {
            source: source.to_string(),
            report,
            timestamp: time::now(),
        });
        self.commit(&board, &user, head, events).await;

        info!(
            "Imported {} titles from {} ({} duplicates, {} dropped)",
            report.imported, source, report.duplicates, report.dropped
        );
        Ok(report)
    }

    // ---- plans ----

    pub async fn list_plans(&self) -> Vec<Plan> {
        self.board.lock().await.plans().to_vec()
    }

    pub async fn upsert_plan(&self, title_id: &str, fields: PlanFields) -> Result<PlanUpsert> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let upsert = board.upsert_plan(title_id, fields, &user)?;
        let event = BoardEvent::PlanSaved {
            plan: upsert.plan.clone(),
            created: upsert.created,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(upsert)
    }

    pub async fn delete_plan(&self, title_id: &str) -> Result<Plan> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let plan = board.delete_plan(title_id, &user)?;
        let event = BoardEvent::PlanDeleted {
            title_id: plan.title_id.clone(),
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(plan)
    }

    // ---- allocation ----

    pub async fn allocation(&self) -> (Allocation, AllocationUsage) {
        let board = self.board.lock().await;
        (board.allocation(), board.allocation_usage())
    }

    pub async fn set_allocation(&self, allocation: Allocation) -> (Allocation, AllocationUsage) {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let allocation = board.set_allocation(allocation, &user);
        let usage = board.allocation_usage();
        let event = BoardEvent::AllocationChanged {
            allocation,
            usage,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        (allocation, usage)
    }

    // ---- activity ----

    pub async fn activities(&self) -> Vec<Activity> {
        self.board.lock().await.activities().to_vec()
    }

    pub async fn activity_paused(&self) -> bool {
        self.board.lock().await.activity_paused()
    }

    /// Pausing only stops new entries; it is not persisted or synced
    pub async fn set_activity_paused(&self, paused: bool) {
        self.board.lock().await.set_activity_paused(paused);
        debug!("Activity feed {}", if paused { "paused" } else { "resumed" });
    }

    /// Returns how many entries were removed
    pub async fn clear_activities(&self) -> usize {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let cleared = board.clear_activities();
        let event = BoardEvent::ActivityCleared {
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        cleared
    }

    // ---- summaries ----

    pub async fn dashboard(&self) -> Dashboard {
        self.board.lock().await.dashboard()
    }

    pub async fn export(&self) -> ExportDocument {
        ExportDocument::from_board(&*self.board.lock().await)
    }

    // ---- chat ----

    pub async fn chat_history(&self) -> Vec<ChatMessage> {
        self.board.lock().await.chat_history().to_vec()
    }

    /// Append the message and the assistant's reply
    pub async fn send_chat(&self, message: &str) -> Result<Vec<ChatMessage>> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::InvalidInput("chat message must not be empty".to_string()));
        }

        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        let messages = advisor::exchange(&board, message).to_vec();
        for chat in &messages {
            board.append_chat(chat.clone());
        }
        let event = BoardEvent::ChatUpdated {
            messages: messages.clone(),
            cleared: false,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
        Ok(messages)
    }

    pub async fn clear_chat(&self) {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;
        let head = head_id(&board);
        board.clear_chat();
        let event = BoardEvent::ChatUpdated {
            messages: Vec::new(),
            cleared: true,
            timestamp: time::now(),
        };
        self.commit(&board, &user, head, vec![event]).await;
    }

    // ---- sync ----

    pub fn sync_status(&self) -> SyncStatus {
        match &self.sync {
            Some(agent) => agent.status(),
            None => SyncStatus::disabled(),
        }
    }

    /// Run one push-then-pull cycle immediately
    pub async fn sync_now(&self) -> Result<SyncStatus> {
        match &self.sync {
            Some(agent) => Ok(agent.sync_once(self).await),
            None => Err(Error::InvalidInput("sync is not enabled".to_string())),
        }
    }

    /// Queue the current board for pushing if it holds anything
    pub async fn publish_local(&self) {
        let Some(agent) = &self.sync else {
            return;
        };
        let user = self.current_user().await;
        let board = self.board.lock().await;
        if board.last_update() > 0 {
            agent.queue_push(SyncDocument::from_board(&board, &user));
        }
    }

    /// Overwrite local state with a shared document if it is strictly newer
    ///
    /// Returns whether the document was applied. When the local board is
    /// newer, its own document is queued so the store catches up.
    pub async fn apply_remote(&self, document: SyncDocument) -> Result<bool> {
        let user = self.current_user().await;
        let mut board = self.board.lock().await;

        if document.last_update <= board.last_update() {
            if document.last_update < board.last_update() {
                if let Some(agent) = &self.sync {
                    agent.queue_push(SyncDocument::from_board(&board, &user));
                }
            }
            return Ok(false);
        }

        let updated_by = document.updated_by.clone();
        let (snapshot, stamp) = document.into_snapshot();
        board.replace_with(snapshot, stamp);
        if let Some(agent) = &self.sync {
            agent.discard_pending_before(stamp);
        }
        self.persist(&board).await;
        drop(board);

        info!("Applied shared document {} from {}", stamp, updated_by);
        self.events.emit_lossy(BoardEvent::RemoteChangeApplied {
            last_update: stamp,
            updated_by,
            timestamp: time::now(),
        });
        Ok(true)
    }

    // ---- internals ----

    async fn persist(&self, board: &Board) {
        if let Err(e) = self.repo.save_snapshot(&board.snapshot(), board.last_update()).await {
            error!("Failed to persist board snapshot: {}", e);
        }
    }

    /// Persist, publish and queue a push after a local mutation
    ///
    /// `head` is the newest activity id before the mutation; entries above it
    /// are announced oldest first.
    async fn commit(&self, board: &Board, user: &str, head: Option<String>, events: Vec<BoardEvent>) {
        self.persist(board).await;

        for event in events {
            self.events.emit_lossy(event);
        }
        let fresh: Vec<&Activity> = board
            .activities()
            .iter()
            .take_while(|a| Some(a.id.as_str()) != head.as_deref())
            .collect();
        for activity in fresh.into_iter().rev() {
            self.events.emit_lossy(BoardEvent::ActivityAppended {
                activity: activity.clone(),
            });
        }

        if let Some(agent) = &self.sync {
            agent.queue_push(SyncDocument::from_board(board, user));
        }
    }
}

fn head_id(board: &Board) -> Option<String> {
    board.activities().first().map(|a| a.id.clone())
}

fn clean_user(name: &str) -> Option<String> {
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}
