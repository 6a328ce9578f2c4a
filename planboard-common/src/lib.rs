//! # Planboard Common Library
//!
//! Core of the title planning board:
//! - Scoring engine (ranking score and marketing tier)
//! - Record store for titles, marketing plans, activity and chat
//! - SQLite snapshot persistence
//! - Board service gluing store, persistence, events and sync
//! - Sync transports and the background sync agent
//! - Spreadsheet import, JSON export and the planning assistant
//! - Configuration loading

pub mod advisor;
pub mod board;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod import;
pub mod models;
pub mod scoring;
pub mod service;
pub mod sse;
pub mod sync;
pub mod time;

pub use board::{Board, BoardOptions, TitleFilter};
pub use error::{Error, Result};
pub use events::{BoardEvent, EventBus};
pub use service::BoardService;
