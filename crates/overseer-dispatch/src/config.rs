use overseer_core::serde_millis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and bookkeeping knobs for a [`crate::Supervisor`].
///
/// Constructed explicitly and passed in at construction; there is no global
/// configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Sleep between loop iterations when the queue is drained.
    #[serde(with = "serde_millis")]
    pub poll_interval: Duration,
    /// Bounded wait passed to the queue's dequeue.
    #[serde(with = "serde_millis")]
    pub dequeue_timeout: Duration,
    /// Backoff after a task had to be re-enqueued because no worker was
    /// eligible.
    #[serde(with = "serde_millis")]
    pub no_worker_backoff: Duration,
    /// Backoff before recovering from the Error state.
    #[serde(with = "serde_millis")]
    pub error_backoff: Duration,
    /// Bound on the per-task execution-time history kept for the average.
    pub execution_history_limit: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            dequeue_timeout: Duration::from_millis(250),
            no_worker_backoff: Duration::from_millis(1000),
            error_backoff: Duration::from_millis(2000),
            execution_history_limit: 1000,
        }
    }
}

impl SupervisorConfig {
    /// Tight timings for tests: millisecond-scale polls and backoffs.
    pub fn fast() -> Self {
        Self {
            poll_interval: Duration::from_millis(5),
            dequeue_timeout: Duration::from_millis(10),
            no_worker_backoff: Duration::from_millis(20),
            error_backoff: Duration::from_millis(20),
            execution_history_limit: 100,
        }
    }
}
