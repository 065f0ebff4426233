//! Completed-run bookkeeping: circle counter, best time and last run.

use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One completed pass through a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub elapsed_ms: u64,
    pub mistakes: u32,
    pub finished_at: DateTime<Local>,
}

impl RunRecord {
    pub fn new(elapsed: Duration, mistakes: u32) -> Self {
        Self {
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            mistakes,
            finished_at: Local::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// Faster wins; equal times go to the run with fewer mistakes.
    pub fn beats(&self, other: &RunRecord) -> bool {
        (self.elapsed_ms, self.mistakes) < (other.elapsed_ms, other.mistakes)
    }
}

/// Per-collection summary of every completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of completed runs.
    pub circles: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<RunRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last: Option<RunRecord>,
}

impl RunSummary {
    /// Summary after folding in one more completed run.
    pub fn with_run(&self, run: &RunRecord) -> RunSummary {
        let best = match &self.best {
            Some(best) if !run.beats(best) => Some(best.clone()),
            _ => Some(run.clone()),
        };
        RunSummary {
            circles: self.circles.saturating_add(1),
            best,
            last: Some(run.clone()),
        }
    }
}

/// Format elapsed time: `"45.3"` under a minute (rounded to tenths),
/// `"1:23.4"` otherwise (truncated).
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms < 60_000 {
        let tenths = (ms + 50) / 100;
        return format!("{}.{}", tenths / 10, tenths % 10);
    }

    let tenths_total = ms / 100;
    let minutes = tenths_total / 600;
    let seconds = (tenths_total % 600) / 10;
    format!("{}:{:02}.{}", minutes, seconds, tenths_total % 10)
}
