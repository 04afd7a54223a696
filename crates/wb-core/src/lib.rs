//! wordbook/crates/wb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Wordbook: lists,
//! words and their images kept coherent across a document store and a blob
//! store that share no transactions.

pub mod dashboard;
pub mod data_url;
pub mod document;
pub mod error;
pub mod feed;
pub mod images;
pub mod lists;
pub mod migration;
pub mod models;
pub mod paths;
pub mod quiz;
pub mod traits;
pub mod vocabulary;
pub mod watch;
pub mod words;

// Re-exporting for easier access in other crates
pub use dashboard::{Dashboard, DashboardStats};
pub use document::*;
pub use error::*;
pub use feed::WordFeed;
pub use images::ImageAttachments;
pub use lists::ListRegistry;
pub use migration::{MigrationReport, Migrator};
pub use models::*;
pub use quiz::QuizSession;
pub use traits::*;
pub use vocabulary::{Backends, Vocabulary};
pub use watch::SnapshotHub;
pub use words::{WordDraft, WordStore};
