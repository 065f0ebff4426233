//! Durable progress and run-summary storage.
//!
//! Two independent record types live behind two traits:
//! - [`ProgressStore`]: (collection, item, direction) -> streak
//! - [`RunStore`]: per-collection run summary (circles, best and last run)
//!
//! [`SqliteStore`] implements both in one database file; [`MemoryStore`] is
//! a non-durable stand-in with failure injection.

mod memory;
mod sqlite;

use std::collections::HashMap;

use thiserror::Error;

use crate::models::{Direction, ItemKey, Streak};
use crate::runs::{RunRecord, RunSummary};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// All streaks of one collection, keyed by item id + direction.
pub type ProgressMap = HashMap<ItemKey, Streak>;

/// Mastery streak persistence.
///
/// `set` performs no range validation; callers clamp before writing.
pub trait ProgressStore {
    /// Streak for one task, 0 if never answered.
    fn get(&self, collection_id: &str, item_id: &str, direction: Direction) -> Result<Streak>;

    /// Insert or update the streak for one task.
    fn set(&self, collection_id: &str, item_id: &str, direction: Direction, streak: Streak) -> Result<()>;

    /// Every record of one collection.
    fn get_collection(&self, collection_id: &str) -> Result<ProgressMap>;

    /// Records for many collections in one round trip. Every requested id
    /// gets an entry, empty if it has no records.
    fn get_batch(&self, collection_ids: &[&str]) -> Result<HashMap<String, ProgressMap>>;

    /// Delete every record of one collection.
    fn reset_collection(&self, collection_id: &str) -> Result<()>;
}

/// Completed-run bookkeeping, kept apart from the streak records.
pub trait RunStore {
    fn run_summary(&self, collection_id: &str) -> Result<RunSummary>;

    /// Summaries for many collections; ids without runs map to the default.
    fn run_summaries(&self, collection_ids: &[&str]) -> Result<HashMap<String, RunSummary>>;

    /// Fold a completed run into the collection's summary and return the
    /// summary as persisted.
    fn record_run(&self, collection_id: &str, run: &RunRecord) -> Result<RunSummary>;
}

impl<T: ProgressStore + ?Sized> ProgressStore for &T {
    fn get(&self, collection_id: &str, item_id: &str, direction: Direction) -> Result<Streak> {
        (**self).get(collection_id, item_id, direction)
    }

    fn set(&self, collection_id: &str, item_id: &str, direction: Direction, streak: Streak) -> Result<()> {
        (**self).set(collection_id, item_id, direction, streak)
    }

    fn get_collection(&self, collection_id: &str) -> Result<ProgressMap> {
        (**self).get_collection(collection_id)
    }

    fn get_batch(&self, collection_ids: &[&str]) -> Result<HashMap<String, ProgressMap>> {
        (**self).get_batch(collection_ids)
    }

    fn reset_collection(&self, collection_id: &str) -> Result<()> {
        (**self).reset_collection(collection_id)
    }
}

impl<T: RunStore + ?Sized> RunStore for &T {
    fn run_summary(&self, collection_id: &str) -> Result<RunSummary> {
        (**self).run_summary(collection_id)
    }

    fn run_summaries(&self, collection_ids: &[&str]) -> Result<HashMap<String, RunSummary>> {
        (**self).run_summaries(collection_ids)
    }

    fn record_run(&self, collection_id: &str, run: &RunRecord) -> Result<RunSummary> {
        (**self).record_run(collection_id, run)
    }
}

#[cfg(test)]
mod tests {
    //! Contract tests shared by both backends.

    use super::*;
    use tempfile::TempDir;

    fn backends() -> (Vec<Box<dyn ProgressStore>>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let sqlite = SqliteStore::open(&temp_dir.path().join("progress.db")).unwrap();
        (vec![Box::new(MemoryStore::new()), Box::new(sqlite)], temp_dir)
    }

    #[test]
    fn test_missing_record_reads_as_zero() {
        let (stores, _temp) = backends();
        for store in &stores {
            assert_eq!(store.get("deck", "ich", Direction::Forward).unwrap(), 0);
        }
    }

    #[test]
    fn test_set_upserts_single_record() {
        let (stores, _temp) = backends();
        for store in &stores {
            store.set("deck", "ich", Direction::Forward, 1).unwrap();
            store.set("deck", "ich", Direction::Forward, 2).unwrap();

            assert_eq!(store.get("deck", "ich", Direction::Forward).unwrap(), 2);
            assert_eq!(store.get("deck", "ich", Direction::Backward).unwrap(), 0);
            assert_eq!(store.get_collection("deck").unwrap().len(), 1);
        }
    }

    #[test]
    fn test_get_collection_is_scoped() {
        let (stores, _temp) = backends();
        for store in &stores {
            store.set("a", "x", Direction::Forward, 3).unwrap();
            store.set("a", "x", Direction::Backward, 1).unwrap();
            store.set("b", "x", Direction::Forward, 2).unwrap();

            let a = store.get_collection("a").unwrap();
            assert_eq!(a.len(), 2);
            assert_eq!(a[&ItemKey::new("x", Direction::Forward)], 3);
            assert_eq!(a[&ItemKey::new("x", Direction::Backward)], 1);
        }
    }

    #[test]
    fn test_batch_matches_point_reads() {
        let (stores, _temp) = backends();
        for store in &stores {
            store.set("a", "x", Direction::Forward, 3).unwrap();
            store.set("b", "y", Direction::Blank, 1).unwrap();

            let batch = store.get_batch(&["a", "b", "empty"]).unwrap();

            assert_eq!(batch.len(), 3);
            for id in ["a", "b", "empty"] {
                assert_eq!(batch[id], store.get_collection(id).unwrap());
            }
            assert!(batch["empty"].is_empty());
        }
    }

    #[test]
    fn test_reset_is_idempotent_and_scoped() {
        let (stores, _temp) = backends();
        for store in &stores {
            store.set("a", "x", Direction::Forward, 2).unwrap();
            store.set("b", "x", Direction::Forward, 2).unwrap();

            store.reset_collection("a").unwrap();
            assert!(store.get_collection("a").unwrap().is_empty());
            store.reset_collection("a").unwrap();
            assert!(store.get_collection("a").unwrap().is_empty());

            assert_eq!(store.get("b", "x", Direction::Forward).unwrap(), 2);
        }
    }
}
