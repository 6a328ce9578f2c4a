//! Board snapshot persistence
//!
//! Each board section is stored as one JSON value under a fixed key in
//! `board_state`. A save writes every section in one transaction so a reader
//! never sees titles from one mutation and plans from another.

use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::BoardSnapshot;
use crate::Result;

/// Fixed `board_state` keys
pub mod keys {
    pub const TITLES: &str = "titles";
    pub const PLANS: &str = "plans";
    pub const ACTIVITIES: &str = "activities";
    pub const ALLOCATION: &str = "allocation";
    pub const CHAT_HISTORY: &str = "chatHistory";
    pub const LAST_UPDATE: &str = "lastUpdate";
    pub const CURRENT_USER: &str = "currentUser";
    pub const SYNC_SESSION: &str = "syncSession";
}

const UPSERT_SQL: &str = r#"
    INSERT INTO board_state (key, value, updated_at)
    VALUES (?, ?, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
"#;

#[derive(Clone)]
pub struct BoardRepository {
    pool: SqlitePool,
}

impl BoardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write every section and the stamp atomically
    pub async fn save_snapshot(&self, snapshot: &BoardSnapshot, last_update: i64) -> Result<()> {
        let sections: [(&str, String); 6] = [
            (keys::TITLES, serde_json::to_string(&snapshot.titles)?),
            (keys::PLANS, serde_json::to_string(&snapshot.plans)?),
            (keys::ACTIVITIES, serde_json::to_string(&snapshot.activities)?),
            (keys::ALLOCATION, serde_json::to_string(&snapshot.allocation)?),
            (keys::CHAT_HISTORY, serde_json::to_string(&snapshot.chat_history)?),
            (keys::LAST_UPDATE, last_update.to_string()),
        ];

        let mut tx = self.pool.begin().await?;
        for (key, value) in &sections {
            sqlx::query(UPSERT_SQL)
                .bind(*key)
                .bind(value.as_str())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!("Saved board snapshot (stamp {})", last_update);
        Ok(())
    }

    /// Load the stored snapshot and stamp
    ///
    /// Missing sections come back empty. A section whose JSON no longer parses
    /// is logged and replaced with its default so the board still starts.
    pub async fn load_snapshot(&self) -> Result<(BoardSnapshot, i64)> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT key, value FROM board_state")
                .fetch_all(&self.pool)
                .await?;
        let values: HashMap<String, String> = rows
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();

        let snapshot = BoardSnapshot {
            titles: section(&values, keys::TITLES),
            plans: section(&values, keys::PLANS),
            activities: section(&values, keys::ACTIVITIES),
            allocation: section(&values, keys::ALLOCATION),
            chat_history: section(&values, keys::CHAT_HISTORY),
        };
        let last_update = values
            .get(keys::LAST_UPDATE)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0);

        Ok((snapshot, last_update))
    }

    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM board_state WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    pub async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Stored display name, if one was ever set
    pub async fn current_user(&self) -> Result<Option<String>> {
        Ok(self.get_value(keys::CURRENT_USER).await?.filter(|s| !s.is_empty()))
    }

    pub async fn set_current_user(&self, user: &str) -> Result<()> {
        self.set_value(keys::CURRENT_USER, user).await
    }

    /// Id of the shared document this board syncs with
    pub async fn sync_session(&self) -> Result<Option<String>> {
        Ok(self.get_value(keys::SYNC_SESSION).await?.filter(|s| !s.is_empty()))
    }

    pub async fn set_sync_session(&self, session: &str) -> Result<()> {
        self.set_value(keys::SYNC_SESSION, session).await
    }
}

fn section<T: DeserializeOwned + Default>(values: &HashMap<String, String>, key: &str) -> T {
    match values.get(key) {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Stored '{}' section is unreadable, starting it empty: {}", key, e);
            T::default()
        }),
        None => T::default(),
    }
}
