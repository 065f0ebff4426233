//! Progress overview across many collections.

use crate::models::{Collection, CollectionKind};
use crate::runs::RunRecord;
use crate::store::{ProgressStore, Result, RunStore};
use crate::taskset::TaskSet;

/// Dashboard line for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    pub kind: CollectionKind,
    pub category: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub circles: u32,
    pub best: Option<RunRecord>,
}

impl CollectionSummary {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u32
    }
}

/// Summarize every collection with one batch read of progress and one of
/// run summaries.
pub fn summarize<S>(store: &S, collections: &[Collection]) -> Result<Vec<CollectionSummary>>
where
    S: ProgressStore + RunStore + ?Sized,
{
    let ids: Vec<&str> = collections.iter().map(|c| c.id.as_str()).collect();
    let mut progress = store.get_batch(&ids)?;
    let mut runs = store.run_summaries(&ids)?;

    Ok(collections
        .iter()
        .map(|collection| {
            let tasks = TaskSet::derive(collection, &progress.remove(&collection.id).unwrap_or_default());
            let run = runs.remove(&collection.id).unwrap_or_default();
            CollectionSummary {
                id: collection.id.clone(),
                name: collection.name.clone(),
                kind: collection.kind(),
                category: collection.category.clone(),
                completed: tasks.completed_count(),
                total: tasks.total_count(),
                circles: run.circles,
                best: run.best,
            }
        })
        .collect())
}
