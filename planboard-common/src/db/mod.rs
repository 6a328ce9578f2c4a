//! SQLite persistence of the board snapshot

pub mod init;
pub mod repository;

pub use init::*;
pub use repository::*;
