//! Streak-based drill scheduling for vocabulary and grammar collections.
//!
//! A [`Session`](session::Session) serves one task at a time from a
//! collection, records each answer as a mastery streak in a
//! [`ProgressStore`](store::ProgressStore), and picks the next task with the
//! adaptive [`Scheduler`](scheduler::Scheduler).

pub mod catalog;
pub mod config;
pub mod models;
pub mod runs;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod summary;
pub mod taskset;

pub use models::MASTERY_THRESHOLD;
