//! Tabular personal data store.
//!
//! Data lives in named sheets of string cells addressed with A1 ranges
//! (`Habits!A:I`, `Reminders!E3:F3`). The [`SheetStore`] trait is what the
//! assistant engine talks to; [`SqliteSheetStore`] persists sheets in SQLite
//! and [`MemorySheetStore`] keeps them in memory.
//!
//! # Example
//!
//! ```no_run
//! use database::{SheetStore, SqliteSheetStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteSheetStore::connect("sqlite:assistant.db?mode=rwc").await?;
//!     store.migrate().await?;
//!
//!     store
//!         .append_row("Wins", "A:D", vec!["2026-01-05".into(), "+1555".into(), "gym".into(), "chest".into()])
//!         .await?;
//!     let wins = store.read_range("Wins", "A:D").await?;
//!     println!("{} wins", wins.len());
//!     Ok(())
//! }
//! ```

pub mod error;
mod grid;
pub mod memory;
pub mod range;
pub mod sqlite;

pub use error::{Result, StoreError};
pub use memory::MemorySheetStore;
pub use range::{column_name, CellRange};
pub use sqlite::SqliteSheetStore;

use async_trait::async_trait;

/// Read, append and update rows of named sheets.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Rows inside `range`, each projected to the range's columns.
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>>;

    /// Append `row` after the last occupied row, placed at the first column of `columns`.
    async fn append_row(&self, sheet: &str, columns: &str, row: Vec<String>) -> Result<()>;

    /// Overwrite cells starting at the top-left corner of `range`.
    async fn update_range(&self, sheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<()>;
}
