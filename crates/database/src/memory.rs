//! In-memory sheet store, used by tests and local runs without SQLite.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::grid::{self, Grid};
use crate::range::CellRange;
use crate::SheetStore;

/// Sheet store held entirely in memory.
///
/// Individual sheets can be marked as failing to exercise partial-failure
/// paths in callers.
#[derive(Debug, Default)]
pub struct MemorySheetStore {
    sheets: RwLock<HashMap<String, Grid>>,
    failing: RwLock<HashSet<String>>,
    reads: AtomicUsize,
}

impl MemorySheetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a sheet with rows, replacing whatever was there.
    pub async fn seed(&self, sheet: &str, rows: Vec<Vec<String>>) {
        self.sheets.write().await.insert(sheet.to_string(), rows);
    }

    /// Make every call touching `sheet` fail until [`Self::recover`].
    pub async fn fail_sheet(&self, sheet: &str) {
        self.failing.write().await.insert(sheet.to_string());
    }

    pub async fn recover(&self, sheet: &str) {
        self.failing.write().await.remove(sheet);
    }

    /// All rows of a sheet, unprojected.
    pub async fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets
            .read()
            .await
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `read_range` calls served so far, including failed ones.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn check(&self, sheet: &str) -> Result<()> {
        if self.failing.read().await.contains(sheet) {
            return Err(StoreError::Unavailable(format!("sheet {sheet} is failing")));
        }
        Ok(())
    }
}

#[async_trait]
impl SheetStore for MemorySheetStore {
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check(sheet).await?;
        let parsed: CellRange = range.parse()?;

        let sheets = self.sheets.read().await;
        Ok(sheets
            .get(sheet)
            .map(|g| grid::read(g, &parsed))
            .unwrap_or_default())
    }

    async fn append_row(&self, sheet: &str, columns: &str, row: Vec<String>) -> Result<()> {
        self.check(sheet).await?;
        let parsed: CellRange = columns.parse()?;

        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(sheet.to_string()).or_default();
        grid::append(grid, &parsed, &row);
        Ok(())
    }

    async fn update_range(&self, sheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        self.check(sheet).await?;
        let parsed: CellRange = range.parse()?;

        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(sheet.to_string()).or_default();
        grid::update(grid, &parsed, &rows, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_then_read() {
        let store = MemorySheetStore::new();
        store
            .append_row("Gym", "A:E", row(&["2026-01-05", "+1555", "chest"]))
            .await
            .unwrap();
        store
            .append_row("Gym", "A:E", row(&["2026-01-06", "+1555", "legs"]))
            .await
            .unwrap();

        let rows = store.read_range("Gym", "A:C").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][2], "legs");
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_sheet_reads_empty() {
        let store = MemorySheetStore::new();
        assert!(store.read_range("Nope", "A:C").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_sheet() {
        let store = MemorySheetStore::new();
        store.fail_sheet("Goals").await;

        let err = store.read_range("Goals", "A:C").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.read_range("Wins", "A:D").await.is_ok());

        store.recover("Goals").await;
        assert!(store.read_range("Goals", "A:C").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_range_in_place() {
        let store = MemorySheetStore::new();
        store
            .seed("Reminders", vec![row(&["r1", "+1555", "milk", "t", "pending", "0"])])
            .await;
        store
            .update_range("Reminders", "E1:F1", vec![row(&["done", "2"])])
            .await
            .unwrap();

        let rows = store.rows("Reminders").await;
        assert_eq!(rows[0][4], "done");
        assert_eq!(rows[0][5], "2");
    }
}
