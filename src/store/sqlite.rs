//! SQLite backend for progress and run summaries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{ProgressMap, ProgressStore, Result, RunStore, StorageError};
use crate::models::{Direction, ItemKey, Streak};
use crate::runs::{RunRecord, RunSummary};

const SCHEMA_VERSION: i32 = 1;

/// Progress database backed by a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        log::debug!("Opened progress database at {:?}", path);
        Self::with_connection(conn)
    }

    /// A database that lives only as long as this value.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS progress (
                collection_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                direction TEXT NOT NULL,
                streak INTEGER NOT NULL,
                PRIMARY KEY (collection_id, item_id, direction)
            );

            CREATE TABLE IF NOT EXISTS run_summaries (
                collection_id TEXT PRIMARY KEY,
                circles INTEGER NOT NULL DEFAULT 0,
                best_ms INTEGER,
                best_mistakes INTEGER,
                best_at TEXT,
                last_ms INTEGER,
                last_mistakes INTEGER,
                last_at TEXT
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(Self { conn })
    }

    /// Get default database location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streakdrill")
            .join("progress.db")
    }
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn parse_direction(raw: &str) -> Result<Direction> {
    raw.parse().map_err(StorageError::InvalidRecord)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| StorageError::InvalidRecord(format!("bad timestamp {:?}: {}", raw, e)))
}

impl ProgressStore for SqliteStore {
    fn get(&self, collection_id: &str, item_id: &str, direction: Direction) -> Result<Streak> {
        let streak = self
            .conn
            .query_row(
                "SELECT streak FROM progress
                 WHERE collection_id = ?1 AND item_id = ?2 AND direction = ?3",
                params![collection_id, item_id, direction.as_str()],
                |row| row.get::<_, Streak>(0),
            )
            .optional()?;
        Ok(streak.unwrap_or(0))
    }

    fn set(&self, collection_id: &str, item_id: &str, direction: Direction, streak: Streak) -> Result<()> {
        self.conn.execute(
            "INSERT INTO progress (collection_id, item_id, direction, streak)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (collection_id, item_id, direction) DO UPDATE SET streak = excluded.streak",
            params![collection_id, item_id, direction.as_str(), streak],
        )?;
        Ok(())
    }

    fn get_collection(&self, collection_id: &str) -> Result<ProgressMap> {
        let mut batch = self.get_batch(&[collection_id])?;
        Ok(batch.remove(collection_id).unwrap_or_default())
    }

    fn get_batch(&self, collection_ids: &[&str]) -> Result<HashMap<String, ProgressMap>> {
        let mut result: HashMap<String, ProgressMap> = collection_ids
            .iter()
            .map(|id| (id.to_string(), ProgressMap::new()))
            .collect();
        if collection_ids.is_empty() {
            return Ok(result);
        }

        let sql = format!(
            "SELECT collection_id, item_id, direction, streak FROM progress
             WHERE collection_id IN ({})",
            placeholders(collection_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(collection_ids.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Streak>(3)?,
            ))
        })?;

        for row in rows {
            let (collection_id, item_id, direction, streak) = row?;
            let direction = match parse_direction(&direction) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Skipping progress row for {}/{}: {}", collection_id, item_id, e);
                    continue;
                }
            };
            result
                .entry(collection_id)
                .or_default()
                .insert(ItemKey::new(item_id, direction), streak);
        }

        Ok(result)
    }

    fn reset_collection(&self, collection_id: &str) -> Result<()> {
        let removed = self.conn.execute(
            "DELETE FROM progress WHERE collection_id = ?1",
            params![collection_id],
        )?;
        log::info!("Reset {} progress records for '{}'", removed, collection_id);
        Ok(())
    }
}

const SUMMARY_COLUMNS: &str =
    "collection_id, circles, best_ms, best_mistakes, best_at, last_ms, last_mistakes, last_at";

type SummaryRow = (
    String,
    u32,
    Option<u64>,
    Option<u32>,
    Option<String>,
    Option<u64>,
    Option<u32>,
    Option<String>,
);

fn read_summary_row(row: &Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn record_from_columns(ms: Option<u64>, mistakes: Option<u32>, at: Option<String>) -> Result<Option<RunRecord>> {
    match (ms, mistakes, at) {
        (Some(elapsed_ms), Some(mistakes), Some(at)) => Ok(Some(RunRecord {
            elapsed_ms,
            mistakes,
            finished_at: parse_timestamp(&at)?,
        })),
        _ => Ok(None),
    }
}

fn summary_from_row(row: SummaryRow) -> Result<(String, RunSummary)> {
    let (id, circles, best_ms, best_mistakes, best_at, last_ms, last_mistakes, last_at) = row;
    let summary = RunSummary {
        circles,
        best: record_from_columns(best_ms, best_mistakes, best_at)?,
        last: record_from_columns(last_ms, last_mistakes, last_at)?,
    };
    Ok((id, summary))
}

impl RunStore for SqliteStore {
    fn run_summary(&self, collection_id: &str) -> Result<RunSummary> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM run_summaries WHERE collection_id = ?1", SUMMARY_COLUMNS),
                params![collection_id],
                read_summary_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(summary_from_row(row)?.1),
            None => Ok(RunSummary::default()),
        }
    }

    fn run_summaries(&self, collection_ids: &[&str]) -> Result<HashMap<String, RunSummary>> {
        let mut result: HashMap<String, RunSummary> = collection_ids
            .iter()
            .map(|id| (id.to_string(), RunSummary::default()))
            .collect();
        if collection_ids.is_empty() {
            return Ok(result);
        }

        let sql = format!(
            "SELECT {} FROM run_summaries WHERE collection_id IN ({})",
            SUMMARY_COLUMNS,
            placeholders(collection_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(collection_ids.iter()), read_summary_row)?;
        for row in rows {
            let (id, summary) = summary_from_row(row?)?;
            result.insert(id, summary);
        }
        Ok(result)
    }

    fn record_run(&self, collection_id: &str, run: &RunRecord) -> Result<RunSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = self.run_summary(collection_id)?.with_run(run);

        let best = updated.best.as_ref();
        let last = updated.last.as_ref();
        tx.execute(
            "INSERT INTO run_summaries
                 (collection_id, circles, best_ms, best_mistakes, best_at, last_ms, last_mistakes, last_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT (collection_id) DO UPDATE SET
                 circles = excluded.circles,
                 best_ms = excluded.best_ms,
                 best_mistakes = excluded.best_mistakes,
                 best_at = excluded.best_at,
                 last_ms = excluded.last_ms,
                 last_mistakes = excluded.last_mistakes,
                 last_at = excluded.last_at",
            params![
                collection_id,
                updated.circles,
                best.map(|r| r.elapsed_ms),
                best.map(|r| r.mistakes),
                best.map(|r| r.finished_at.to_rfc3339()),
                last.map(|r| r.elapsed_ms),
                last.map(|r| r.mistakes),
                last.map(|r| r.finished_at.to_rfc3339()),
            ],
        )?;
        tx.commit()?;

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_progress_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("progress.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("deck", "ich", Direction::Backward, 2).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("deck", "ich", Direction::Backward).unwrap(), 2);
    }

    #[test]
    fn test_unknown_direction_rows_are_skipped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("deck", "ich", Direction::Forward, 1).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO progress VALUES ('deck', 'du', 'de_to_en', 2)",
                [],
            )
            .unwrap();

        let progress = store.get_collection("deck").unwrap();
        assert_eq!(progress.len(), 1);
    }

    #[test]
    fn test_run_summary_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("progress.db");
        let store = SqliteStore::open(&path).unwrap();

        assert_eq!(store.run_summary("deck").unwrap(), RunSummary::default());

        let first = store
            .record_run("deck", &RunRecord::new(Duration::from_millis(8_000), 1))
            .unwrap();
        let second = store
            .record_run("deck", &RunRecord::new(Duration::from_millis(6_500), 0))
            .unwrap();

        assert_eq!(first.circles, 1);
        assert_eq!(second.circles, 2);
        assert_eq!(second.best.as_ref().unwrap().elapsed_ms, 6_500);

        let reopened = SqliteStore::open(&path).unwrap();
        let stored = reopened.run_summary("deck").unwrap();
        assert_eq!(stored.circles, 2);
        assert_eq!(stored.best.as_ref().unwrap().elapsed_ms, 6_500);
        assert_eq!(stored.last.as_ref().unwrap().mistakes, 0);
    }

    #[test]
    fn test_run_summaries_cover_every_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .record_run("a", &RunRecord::new(Duration::from_secs(3), 0))
            .unwrap();

        let summaries = store.run_summaries(&["a", "b"]).unwrap();
        assert_eq!(summaries["a"].circles, 1);
        assert_eq!(summaries["b"], RunSummary::default());
    }
}
