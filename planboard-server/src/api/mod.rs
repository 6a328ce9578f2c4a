//! HTTP API handlers

pub mod activity;
pub mod allocation;
pub mod buildinfo;
pub mod chat;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod plans;
pub mod sse;
pub mod sync;
pub mod titles;
pub mod transfer;
pub mod user;

pub use activity::{clear_activity, list_activity, set_paused};
pub use allocation::{get_allocation, set_allocation};
pub use buildinfo::get_build_info;
pub use chat::{chat_history, clear_chat, send_chat};
pub use dashboard::get_dashboard;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use plans::{delete_plan, list_plans, upsert_plan};
pub use sse::event_stream;
pub use sync::{sync_now, sync_status};
pub use titles::{bulk_delete_titles, create_title, delete_title, get_title, list_titles, update_title};
pub use transfer::{export_board, import_csv};
pub use user::{get_user, set_user};
