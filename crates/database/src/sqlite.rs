//! SQLite-backed sheet store.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::grid::{self, Grid};
use crate::range::CellRange;
use crate::SheetStore;

/// Sheet store persisted as one SQLite row per sheet row.
#[derive(Debug, Clone)]
pub struct SqliteSheetStore {
    pool: SqlitePool,
}

impl SqliteSheetStore {
    /// Default pool size. Persistence writes are spawned per message, so keep headroom.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// How long a writer waits on another writer's lock before giving up.
    const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// `sqlite::memory:` works for tests.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Self::BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        info!("Connected to sheet store: {} (pool size: {})", url, pool_size);
        Ok(Self { pool })
    }

    /// Run schema migrations. Call once after connecting.
    pub async fn migrate(&self) -> Result<()> {
        info!("Running sheet store migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_grid(&self, sheet: &str) -> Result<Grid> {
        let mut conn = self.pool.acquire().await?;
        read_grid(&mut conn, sheet).await
    }
}

async fn read_grid(conn: &mut SqliteConnection, sheet: &str) -> Result<Grid> {
    let records = sqlx::query(
        r#"
        SELECT row_index, cells
        FROM sheet_rows
        WHERE sheet = ?
        ORDER BY row_index
        "#,
    )
    .bind(sheet)
    .fetch_all(&mut *conn)
    .await?;

    let mut grid = Grid::new();
    for record in records {
        let index: i64 = record.try_get("row_index")?;
        let cells: String = record.try_get("cells")?;
        let cells = decode(sheet, &cells)?;

        let idx = (index.max(1) - 1) as usize;
        if grid.len() <= idx {
            grid.resize(idx + 1, Vec::new());
        }
        grid[idx] = cells;
    }
    Ok(grid)
}

fn decode(sheet: &str, cells: &str) -> Result<Vec<String>> {
    serde_json::from_str(cells).map_err(|source| StoreError::Corrupt {
        sheet: sheet.to_string(),
        source,
    })
}

fn encode(sheet: &str, cells: &[String]) -> Result<String> {
    serde_json::to_string(cells).map_err(|source| StoreError::Corrupt {
        sheet: sheet.to_string(),
        source,
    })
}

#[async_trait]
impl SheetStore for SqliteSheetStore {
    async fn read_range(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let parsed: CellRange = range.parse()?;
        let grid = self.load_grid(sheet).await?;
        Ok(grid::read(&grid, &parsed))
    }

    async fn append_row(&self, sheet: &str, columns: &str, row: Vec<String>) -> Result<()> {
        let parsed: CellRange = columns.parse()?;
        let mut cells = Vec::new();
        parsed.splice(&mut cells, &row);
        let encoded = encode(sheet, &cells)?;

        // One statement, so the row index is picked under the write lock.
        let next: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sheet_rows (sheet, row_index, cells)
            SELECT ?, COALESCE(MAX(row_index), 0) + 1, ?
            FROM sheet_rows
            WHERE sheet = ?
            RETURNING row_index
            "#,
        )
        .bind(sheet)
        .bind(&encoded)
        .bind(sheet)
        .fetch_one(&self.pool)
        .await?;

        debug!(sheet, row = next, "Appended row");
        Ok(())
    }

    async fn update_range(&self, sheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let parsed: CellRange = range.parse()?;

        // Take the write lock before reading so the merge sees the latest rows.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let mut grid = read_grid(&mut tx, sheet).await?;
        grid::update(&mut grid, &parsed, &rows, range)?;

        let start = parsed.first_row();
        for offset in 0..rows.len() {
            let index = start + offset;
            let cells = grid.get(index - 1).cloned().unwrap_or_default();
            let encoded = encode(sheet, &cells)?;

            sqlx::query(
                r#"
                INSERT INTO sheet_rows (sheet, row_index, cells)
                VALUES (?, ?, ?)
                ON CONFLICT(sheet, row_index) DO UPDATE SET
                    cells = excluded.cells,
                    updated_at = datetime('now')
                "#,
            )
            .bind(sheet)
            .bind(index as i64)
            .bind(&encoded)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(sheet, range, rows = rows.len(), "Updated range");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_store() -> SqliteSheetStore {
        let store = SqliteSheetStore::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        store.migrate().await.unwrap();
        store
    }

    async fn file_store(dir: &tempfile::TempDir) -> Arc<SqliteSheetStore> {
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("sheets.db").display());
        let store = SqliteSheetStore::connect(&url).await.unwrap();
        store.migrate().await.unwrap();
        Arc::new(store)
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let store = test_store().await;

        store
            .append_row("Wins", "A:D", row(&["2026-01-05", "+1555", "gym", "chest"]))
            .await
            .unwrap();
        store
            .append_row("Wins", "A:D", row(&["2026-01-06", "+1555", "daily", "shipped"]))
            .await
            .unwrap();

        let rows = store.read_range("Wins", "A:D").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][3], "chest");

        let descriptions = store.read_range("Wins", "D2:D").await.unwrap();
        assert_eq!(descriptions, vec![row(&["shipped"])]);
    }

    #[tokio::test]
    async fn test_update_range_merges_existing_cells() {
        let store = test_store().await;
        store
            .append_row(
                "Reminders",
                "A:F",
                row(&["r1", "+1555", "milk", "t0", "pending", "0"]),
            )
            .await
            .unwrap();

        store
            .update_range("Reminders", "E1:F1", vec![row(&["done", "1"])])
            .await
            .unwrap();

        let rows = store.read_range("Reminders", "A:F").await.unwrap();
        assert_eq!(rows[0], row(&["r1", "+1555", "milk", "t0", "done", "1"]));
    }

    #[tokio::test]
    async fn test_invalid_range_is_rejected() {
        let store = test_store().await;
        let err = store.read_range("Wins", "not a range").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRange { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir).await;

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .append_row("Wins", "A:D", row(&["2026-01-05", "+1555", "gym", &format!("win {i}")]))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let rows = store.read_range("Wins", "A:D").await.unwrap();
        assert_eq!(rows.len(), 20);
        let mut wins: Vec<_> = rows.iter().map(|r| r[3].clone()).collect();
        wins.sort();
        wins.dedup();
        assert_eq!(wins.len(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_to_one_row_keep_both_columns() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir).await;
        store
            .append_row("Reminders", "A:F", row(&["r1", "+1555", "milk", "t0", "pending", "0"]))
            .await
            .unwrap();

        let status = {
            let store = store.clone();
            tokio::spawn(async move { store.update_range("Reminders", "E1", vec![row(&["done"])]).await })
        };
        let nudges = {
            let store = store.clone();
            tokio::spawn(async move { store.update_range("Reminders", "F1", vec![row(&["2"])]).await })
        };
        status.await.unwrap().unwrap();
        nudges.await.unwrap().unwrap();

        let rows = store.read_range("Reminders", "A:F").await.unwrap();
        assert_eq!(rows[0], row(&["r1", "+1555", "milk", "t0", "done", "2"]));
    }
}
