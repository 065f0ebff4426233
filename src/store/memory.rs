//! Non-durable store kept in process memory.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use super::{ProgressMap, ProgressStore, Result, RunStore, StorageError};
use crate::models::{Direction, ItemKey, Streak};
use crate::runs::{RunRecord, RunSummary};

/// In-memory store. Writes can be made to fail to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    progress: RefCell<HashMap<String, ProgressMap>>,
    runs: RefCell<HashMap<String, RunSummary>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write returns [`StorageError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.get() {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl ProgressStore for MemoryStore {
    fn get(&self, collection_id: &str, item_id: &str, direction: Direction) -> Result<Streak> {
        let key = ItemKey::new(item_id, direction);
        Ok(self
            .progress
            .borrow()
            .get(collection_id)
            .and_then(|m| m.get(&key).copied())
            .unwrap_or(0))
    }

    fn set(&self, collection_id: &str, item_id: &str, direction: Direction, streak: Streak) -> Result<()> {
        self.check_writable()?;
        self.progress
            .borrow_mut()
            .entry(collection_id.to_string())
            .or_default()
            .insert(ItemKey::new(item_id, direction), streak);
        Ok(())
    }

    fn get_collection(&self, collection_id: &str) -> Result<ProgressMap> {
        Ok(self
            .progress
            .borrow()
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_batch(&self, collection_ids: &[&str]) -> Result<HashMap<String, ProgressMap>> {
        collection_ids
            .iter()
            .map(|id| Ok((id.to_string(), self.get_collection(id)?)))
            .collect()
    }

    fn reset_collection(&self, collection_id: &str) -> Result<()> {
        self.check_writable()?;
        self.progress.borrow_mut().remove(collection_id);
        Ok(())
    }
}

impl RunStore for MemoryStore {
    fn run_summary(&self, collection_id: &str) -> Result<RunSummary> {
        Ok(self
            .runs
            .borrow()
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    fn run_summaries(&self, collection_ids: &[&str]) -> Result<HashMap<String, RunSummary>> {
        collection_ids
            .iter()
            .map(|id| Ok((id.to_string(), self.run_summary(id)?)))
            .collect()
    }

    fn record_run(&self, collection_id: &str, run: &RunRecord) -> Result<RunSummary> {
        self.check_writable()?;
        let updated = self.run_summary(collection_id)?.with_run(run);
        self.runs
            .borrow_mut()
            .insert(collection_id.to_string(), updated.clone());
        Ok(updated)
    }
}
