//! Drillable tasks of a collection and their current streaks.

use crate::models::{Collection, ItemKey, Streak, TaskKey, MASTERY_THRESHOLD};
use crate::store::ProgressMap;

/// One (item, direction) pair with its streak.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub key: TaskKey,
    pub streak: Streak,
}

impl Task {
    pub fn is_mastered(&self) -> bool {
        self.streak >= MASTERY_THRESHOLD
    }
}

/// Every task of a collection, in collection order.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    /// Derive the task list from static collection data and stored streaks.
    /// Records for items no longer in the collection are ignored.
    pub fn derive(collection: &Collection, progress: &ProgressMap) -> Self {
        let tasks = collection
            .item_keys()
            .into_iter()
            .map(|ItemKey { item_id, direction }| {
                let streak = progress
                    .get(&ItemKey::new(item_id.clone(), direction))
                    .copied()
                    .unwrap_or(0);
                Task {
                    key: TaskKey::new(collection.id.clone(), item_id, direction),
                    streak,
                }
            })
            .collect();
        Self { tasks }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    pub fn incomplete(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_mastered())
    }

    /// Keys of unmastered tasks, in collection order.
    pub fn incomplete_keys(&self) -> Vec<TaskKey> {
        self.incomplete().map(|t| t.key.clone()).collect()
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.key == key)
    }

    /// Replace a task's streak, returning the previous value.
    pub fn set_streak(&mut self, key: &TaskKey, streak: Streak) -> Option<Streak> {
        let task = self.tasks.iter_mut().find(|t| &t.key == key)?;
        Some(std::mem::replace(&mut task.streak, streak))
    }

    pub fn total_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn incomplete_count(&self) -> usize {
        self.incomplete().count()
    }

    pub fn completed_count(&self) -> usize {
        self.total_count() - self.incomplete_count()
    }

    /// True when nothing is left to drill. Callers decide whether the
    /// underlying progress has been loaded.
    pub fn all_mastered(&self) -> bool {
        self.incomplete().next().is_none()
    }
}

/// Streak after one answer: +1 up to the threshold when correct, 0 when wrong.
pub fn next_streak(current: Streak, correct: bool) -> Streak {
    if correct {
        current.saturating_add(1).min(MASTERY_THRESHOLD)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, Exercise, Word};

    fn deck(ids: &[&str]) -> Collection {
        let words = ids
            .iter()
            .map(|id| Word {
                id: id.to_string(),
                prompt: format!("{}-de", id),
                answer: format!("{}-en", id),
                part_of_speech: None,
                examples: Vec::new(),
                notes: None,
                tags: Vec::new(),
            })
            .collect();
        Collection::vocabulary("deck", "Deck", words)
    }

    #[test]
    fn test_derive_defaults_missing_streaks_to_zero() {
        let mut progress = ProgressMap::new();
        progress.insert(ItemKey::new("a", Direction::Backward), 2);

        let tasks = TaskSet::derive(&deck(&["a", "b"]), &progress);

        assert_eq!(tasks.total_count(), 4);
        let streaks: Vec<Streak> = tasks.all().iter().map(|t| t.streak).collect();
        assert_eq!(streaks, vec![0, 2, 0, 0]);
    }

    #[test]
    fn test_mastered_tasks_are_excluded() {
        let mut progress = ProgressMap::new();
        progress.insert(ItemKey::new("a", Direction::Forward), MASTERY_THRESHOLD);
        progress.insert(ItemKey::new("a", Direction::Backward), MASTERY_THRESHOLD - 1);

        let tasks = TaskSet::derive(&deck(&["a"]), &progress);

        assert_eq!(tasks.completed_count(), 1);
        assert_eq!(tasks.incomplete_keys(), vec![TaskKey::new("deck", "a", Direction::Backward)]);
        assert!(!tasks.all_mastered());
    }

    #[test]
    fn test_stale_records_are_ignored() {
        let mut progress = ProgressMap::new();
        progress.insert(ItemKey::new("gone", Direction::Forward), MASTERY_THRESHOLD);

        let tasks = TaskSet::derive(&deck(&["a"]), &progress);
        assert_eq!(tasks.completed_count(), 0);
        assert_eq!(tasks.total_count(), 2);
    }

    #[test]
    fn test_grammar_lesson_has_one_task_per_exercise() {
        let lesson = Collection::grammar(
            "lesson",
            "Lesson",
            vec![Exercise {
                id: "gehen".to_string(),
                sentence: "Ich ___ nach Hause.".to_string(),
                answer: "gehe".to_string(),
                hint: Some("gehen".to_string()),
            }],
        );

        let tasks = TaskSet::derive(&lesson, &ProgressMap::new());
        assert_eq!(tasks.total_count(), 1);
        assert_eq!(tasks.all()[0].key.direction, Direction::Blank);
    }

    #[test]
    fn test_empty_collection_is_all_mastered() {
        let tasks = TaskSet::derive(&deck(&[]), &ProgressMap::new());
        assert_eq!(tasks.total_count(), 0);
        assert!(tasks.all_mastered());
    }

    #[test]
    fn test_set_streak_returns_previous() {
        let mut tasks = TaskSet::derive(&deck(&["a"]), &ProgressMap::new());
        let key = TaskKey::new("deck", "a", Direction::Forward);

        assert_eq!(tasks.set_streak(&key, 2), Some(0));
        assert_eq!(tasks.get(&key).unwrap().streak, 2);
        assert_eq!(tasks.set_streak(&TaskKey::new("deck", "zz", Direction::Forward), 1), None);
    }

    #[test]
    fn test_next_streak_clamps() {
        for start in 0..=MASTERY_THRESHOLD {
            let up = next_streak(start, true);
            assert_eq!(up, (start + 1).min(MASTERY_THRESHOLD));
            assert!(up <= MASTERY_THRESHOLD);
            assert_eq!(next_streak(start, false), 0);
        }
    }
}
