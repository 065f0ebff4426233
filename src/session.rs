//! One drill run over a collection.
//!
//! The lifecycle is a small state machine, `Loading -> Active -> Finished`,
//! with an extra terminal `GameOver` when lives are enabled. [`transition`]
//! is the pure part; [`Session`] is the shell that does the store I/O and
//! drives the [`Scheduler`].
//!
//! Streak writes are persisted before they are applied in memory, so a
//! failed write leaves the session exactly as it was and the same answer
//! can be submitted again.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use crate::models::{Collection, Prompt, Streak, TaskKey};
use crate::runs::{RunRecord, RunSummary};
use crate::scheduler::{Answered, Scheduler, SchedulerSettings};
use crate::store::{ProgressStore, RunStore, StorageError};
use crate::taskset::{next_streak, TaskSet};

/// How many recent attempts are kept per task.
pub const ATTEMPT_HISTORY: usize = 3;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("No task is currently being served")]
    NoCurrentTask,

    #[error("Task {0} is not part of the collection")]
    UnknownTask(TaskKey),

    #[error("Progress has not been loaded yet")]
    NotLoaded,
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Progress not read yet; no task exposed.
    Loading,
    Active,
    /// Every task mastered.
    Finished,
    /// Out of lives.
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Loaded { remaining: usize },
    Answered { remaining: usize, out_of_lives: bool },
    Restarted,
}

/// Next phase for an event. Events that do not apply leave the phase as is.
pub fn transition(phase: Phase, event: Event) -> Phase {
    match (phase, event) {
        (_, Event::Restarted) => Phase::Loading,
        (Phase::Loading, Event::Loaded { remaining: 0 }) => Phase::Finished,
        (Phase::Loading, Event::Loaded { .. }) => Phase::Active,
        (Phase::Active, Event::Answered { remaining: 0, .. }) => Phase::Finished,
        (Phase::Active, Event::Answered { out_of_lives: true, .. }) => Phase::GameOver,
        (Phase::Active, Event::Answered { .. }) => Phase::Active,
        (phase, _) => phase,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Mistakes allowed before the run ends; `None` for unlimited.
    pub max_lives: Option<u32>,
    pub scheduler: SchedulerSettings,
    /// Seed for reproducible task order.
    pub seed: Option<u64>,
}

/// Figures reported when a run completes. `summary` is the run summary
/// as persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionStats {
    pub completed: usize,
    pub total: usize,
    pub answers: u32,
    pub mistakes: u32,
    pub elapsed: Duration,
    pub circle: u32,
    pub previous_best: Option<RunRecord>,
    pub is_new_best: bool,
    pub summary: RunSummary,
}

/// Result of one submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Next(TaskKey),
    Finished(CompletionStats),
    GameOver { mistakes: u32 },
}

/// The task being served, with what to show.
#[derive(Debug, Clone, Copy)]
pub struct CurrentTask<'a> {
    pub key: &'a TaskKey,
    pub streak: Streak,
    pub prompt: Prompt<'a>,
}

pub struct Session<S, R = StdRng> {
    collection: Collection,
    store: S,
    scheduler: Scheduler<R>,
    max_lives: Option<u32>,
    tasks: TaskSet,
    phase: Phase,
    answers: u32,
    mistakes: u32,
    attempts: HashMap<TaskKey, Vec<bool>>,
    started: Option<Instant>,
}

impl<S: ProgressStore + RunStore> Session<S, StdRng> {
    pub fn new(collection: Collection, store: S, settings: &SessionSettings) -> Self {
        let scheduler = match settings.seed {
            Some(seed) => Scheduler::seeded(settings.scheduler, seed),
            None => Scheduler::new(settings.scheduler),
        };
        Self::with_scheduler(collection, store, scheduler, settings.max_lives)
    }
}

impl<S: ProgressStore + RunStore, R: Rng> Session<S, R> {
    pub fn with_scheduler(collection: Collection, store: S, scheduler: Scheduler<R>, max_lives: Option<u32>) -> Self {
        Self {
            collection,
            store,
            scheduler,
            max_lives,
            tasks: TaskSet::default(),
            phase: Phase::Loading,
            answers: 0,
            mistakes: 0,
            attempts: HashMap::new(),
            started: None,
        }
    }

    /// Read stored progress and serve the first task. On a storage error
    /// the session stays in `Loading` and `load` may be called again.
    pub fn load(&mut self) -> Result<Phase> {
        if self.phase != Phase::Loading {
            return Ok(self.phase);
        }

        let progress = self.store.get_collection(&self.collection.id)?;
        self.tasks = TaskSet::derive(&self.collection, &progress);
        let incomplete = self.tasks.incomplete_keys();
        self.phase = transition(self.phase, Event::Loaded { remaining: incomplete.len() });
        self.started = Some(Instant::now());

        if self.phase == Phase::Active {
            self.scheduler.next(None, &incomplete);
        }
        log::info!(
            "Loaded '{}': {}/{} tasks mastered",
            self.collection.id,
            self.tasks.completed_count(),
            self.tasks.total_count()
        );
        Ok(self.phase)
    }

    /// Record an answer to the current task and move on.
    pub fn submit_answer(&mut self, correct: bool) -> Result<Turn> {
        match self.phase {
            Phase::Loading => return Err(SessionError::NotLoaded),
            Phase::Finished | Phase::GameOver => return Err(SessionError::NoCurrentTask),
            Phase::Active => {}
        }
        let key = self
            .scheduler
            .current()
            .cloned()
            .ok_or(SessionError::NoCurrentTask)?;
        let streak = self
            .tasks
            .get(&key)
            .map(|t| t.streak)
            .ok_or_else(|| SessionError::UnknownTask(key.clone()))?;
        let new_streak = next_streak(streak, correct);

        if let Err(e) = self
            .store
            .set(&key.collection_id, &key.item_id, key.direction, new_streak)
        {
            log::warn!("Failed to save progress for {}: {}", key, e);
            return Err(e.into());
        }

        self.tasks.set_streak(&key, new_streak);
        self.answers += 1;
        if !correct {
            self.mistakes += 1;
        }
        let history = self.attempts.entry(key.clone()).or_default();
        history.push(correct);
        if history.len() > ATTEMPT_HISTORY {
            history.remove(0);
        }

        let incomplete = self.tasks.incomplete_keys();
        let out_of_lives = !correct && self.max_lives.is_some_and(|max| self.mistakes >= max);
        self.phase = transition(
            self.phase,
            Event::Answered {
                remaining: incomplete.len(),
                out_of_lives,
            },
        );

        match self.phase {
            Phase::Active => {
                let answered = Answered { key, correct };
                self.scheduler
                    .next(Some(&answered), &incomplete)
                    .map(|pick| Turn::Next(pick.key))
                    .ok_or(SessionError::NoCurrentTask)
            }
            Phase::Finished => {
                self.scheduler.clear();
                let stats = self.complete()?;
                Ok(Turn::Finished(stats))
            }
            Phase::GameOver => {
                self.scheduler.clear();
                log::info!("Out of lives on '{}' after {} mistakes", self.collection.id, self.mistakes);
                Ok(Turn::GameOver {
                    mistakes: self.mistakes,
                })
            }
            Phase::Loading => Err(SessionError::NotLoaded),
        }
    }

    fn complete(&self) -> Result<CompletionStats> {
        let elapsed = self.elapsed();
        let id = &self.collection.id;
        let previous = self.store.run_summary(id)?;
        let run = RunRecord::new(elapsed, self.mistakes);
        let summary = self.store.record_run(id, &run)?;
        let is_new_best = previous.best.as_ref().map_or(true, |best| run.beats(best));

        log::info!(
            "Finished '{}' (circle {}) in {:?} with {} mistakes",
            id,
            summary.circles,
            elapsed,
            self.mistakes
        );
        Ok(CompletionStats {
            completed: self.tasks.completed_count(),
            total: self.tasks.total_count(),
            answers: self.answers,
            mistakes: self.mistakes,
            elapsed,
            circle: summary.circles,
            previous_best: previous.best,
            is_new_best,
            summary,
        })
    }

    /// Start over with empty transient state, keeping stored progress.
    pub fn restart(&mut self) -> Result<Phase> {
        self.phase = transition(self.phase, Event::Restarted);
        self.scheduler.clear();
        self.tasks = TaskSet::default();
        self.answers = 0;
        self.mistakes = 0;
        self.attempts.clear();
        self.started = None;
        self.load()
    }

    /// Erase stored progress for the collection and start over.
    pub fn reset_progress(&mut self) -> Result<Phase> {
        self.store.reset_collection(&self.collection.id)?;
        log::info!("Reset progress for '{}'", self.collection.id);
        self.restart()
    }

    pub fn current_key(&self) -> Option<&TaskKey> {
        if self.phase == Phase::Active {
            self.scheduler.current()
        } else {
            None
        }
    }

    /// The task being served, if any.
    pub fn current_task(&self) -> Result<Option<CurrentTask<'_>>> {
        let Some(key) = self.current_key() else {
            return Ok(None);
        };
        let unknown = || SessionError::UnknownTask(key.clone());
        let task = self.tasks.get(key).ok_or_else(unknown)?;
        let prompt = self.collection.prompt(&key.item_key()).ok_or_else(unknown)?;
        Ok(Some(CurrentTask {
            key,
            streak: task.streak,
            prompt,
        }))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    /// Only true once progress has been loaded and nothing is left.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.completed_count()
    }

    pub fn total_count(&self) -> usize {
        self.tasks.total_count()
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn answers(&self) -> u32 {
        self.answers
    }

    pub fn mistakes(&self) -> u32 {
        self.mistakes
    }

    pub fn lives_left(&self) -> Option<u32> {
        self.max_lives.map(|max| max.saturating_sub(self.mistakes))
    }

    /// Last few answers to a task in this session, oldest first.
    pub fn recent_attempts(&self, key: &TaskKey) -> &[bool] {
        self.attempts.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler<R> {
        &self.scheduler
    }
}
