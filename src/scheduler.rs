//! Adaptive task picker.
//!
//! Mixes two policies: with probability `retry_bias` a recently-missed task
//! is retried, otherwise a task is drawn uniformly from the unmastered pool.
//! A small spacing buffer of recently-correct keys keeps those out of the
//! next few picks, and the task just served is never served again
//! immediately while anything else remains.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::models::TaskKey;

/// Tunables for the picker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Chance of serving a retry when one is available.
    #[serde(default = "default_retry_bias")]
    pub retry_bias: f64,
    /// Upper bound on the spacing buffer.
    #[serde(default = "default_max_spacing")]
    pub max_spacing: usize,
}

fn default_retry_bias() -> f64 {
    0.7
}

fn default_max_spacing() -> usize {
    5
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            retry_bias: default_retry_bias(),
            max_spacing: default_max_spacing(),
        }
    }
}

/// The answer that preceded a pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answered {
    pub key: TaskKey,
    pub correct: bool,
}

/// Where a pick came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSource {
    Retry,
    Pool,
    /// Everything was being avoided; spacing was ignored.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pick {
    pub key: TaskKey,
    pub source: PickSource,
}

/// Session-scoped picker state.
pub struct Scheduler<R = StdRng> {
    retry_queue: Vec<TaskKey>,
    spacing: Vec<TaskKey>,
    current: Option<TaskKey>,
    settings: SchedulerSettings,
    rng: R,
}

impl Scheduler<StdRng> {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self::with_rng(settings, StdRng::from_os_rng())
    }

    pub fn seeded(settings: SchedulerSettings, seed: u64) -> Self {
        Self::with_rng(settings, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Scheduler<R> {
    /// A non-finite `retry_bias` falls back to the default; anything else
    /// is clamped to `[0, 1]`.
    pub fn with_rng(settings: SchedulerSettings, rng: R) -> Self {
        let retry_bias = if settings.retry_bias.is_finite() {
            settings.retry_bias.clamp(0.0, 1.0)
        } else {
            log::warn!("Ignoring retry bias {}, using {}", settings.retry_bias, default_retry_bias());
            default_retry_bias()
        };
        Self {
            retry_queue: Vec::new(),
            spacing: Vec::new(),
            current: None,
            settings: SchedulerSettings { retry_bias, ..settings },
            rng,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn current(&self) -> Option<&TaskKey> {
        self.current.as_ref()
    }

    /// Keys answered wrong and not yet answered right, oldest first.
    pub fn retry_queue(&self) -> &[TaskKey] {
        &self.retry_queue
    }

    /// Recently-correct keys, oldest first.
    pub fn spacing_buffer(&self) -> &[TaskKey] {
        &self.spacing
    }

    /// Drop all transient state, as for a fresh session.
    pub fn clear(&mut self) {
        self.retry_queue.clear();
        self.spacing.clear();
        self.current = None;
    }

    /// Spacing capacity for a pool of `incomplete` tasks.
    pub fn spacing_capacity(&self, incomplete: usize) -> usize {
        self.settings.max_spacing.min(incomplete / 2)
    }

    /// Fold in the previous answer (if any) and choose the next task from
    /// `incomplete`, which must reflect that answer. Returns `None` only
    /// when `incomplete` is empty.
    pub fn next(&mut self, answered: Option<&Answered>, incomplete: &[TaskKey]) -> Option<Pick> {
        if incomplete.is_empty() {
            self.current = None;
            return None;
        }

        if let Some(answered) = answered {
            self.record(answered, incomplete.len());
        }

        let pick = self.choose(incomplete);
        log::debug!("Picked {} ({:?})", pick.key, pick.source);
        self.current = Some(pick.key.clone());
        Some(pick)
    }

    fn record(&mut self, answered: &Answered, incomplete: usize) {
        let key = &answered.key;
        if answered.correct {
            self.retry_queue.retain(|k| k != key);
            self.spacing.retain(|k| k != key);
            self.spacing.push(key.clone());
            let capacity = self.spacing_capacity(incomplete);
            if self.spacing.len() > capacity {
                let excess = self.spacing.len() - capacity;
                self.spacing.drain(..excess);
            }
        } else {
            self.retry_queue.retain(|k| k != key);
            self.retry_queue.push(key.clone());
        }
    }

    fn choose(&mut self, incomplete: &[TaskKey]) -> Pick {
        let just_served = self.current.as_ref();
        let avoid = |k: &TaskKey| Some(k) == just_served || self.spacing.contains(k);

        let available_retries: Vec<&TaskKey> = self
            .retry_queue
            .iter()
            .filter(|k| !avoid(*k) && incomplete.contains(*k))
            .collect();
        if !available_retries.is_empty() && self.rng.random_bool(self.settings.retry_bias) {
            if let Some(key) = available_retries.choose(&mut self.rng) {
                return Pick {
                    key: (*key).clone(),
                    source: PickSource::Retry,
                };
            }
        }

        let pool: Vec<&TaskKey> = incomplete.iter().filter(|k| !avoid(*k)).collect();
        if let Some(key) = pool.choose(&mut self.rng) {
            return Pick {
                key: (*key).clone(),
                source: PickSource::Pool,
            };
        }

        let fallback: Vec<&TaskKey> = incomplete.iter().filter(|k| Some(*k) != just_served).collect();
        let key = fallback
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(&incomplete[0]);
        Pick {
            key: key.clone(),
            source: PickSource::Fallback,
        }
    }
}
