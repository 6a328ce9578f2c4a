//! JSON export of the board

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::models::{Activity, Plan, Title};
use crate::time;

/// Download name for the export document
pub const EXPORT_FILE_NAME: &str = "title-planning-data.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub titles: Vec<Title>,
    pub plans: Vec<Plan>,
    pub activities: Vec<Activity>,
    pub export_date: DateTime<Utc>,
}

impl ExportDocument {
    pub fn from_board(board: &Board) -> Self {
        Self {
            titles: board.titles().to_vec(),
            plans: board.plans().to_vec(),
            activities: board.activities().to_vec(),
            export_date: time::now(),
        }
    }
}
