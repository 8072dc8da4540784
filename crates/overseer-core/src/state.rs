use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the supervisor's dispatch loop.
///
/// There is no terminal state; the supervisor runs until externally shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    /// Idle / polling for pending work. Initial state.
    Monitoring,
    /// Pending work detected.
    Analyzing,
    /// Actively matching a dequeued task to a worker.
    Delegating,
    /// Assignment sent (or backoff after a failed match); awaiting a result
    /// or the next poll.
    Waiting,
    /// Recovering from a transient fault.
    Error,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Monitoring => write!(f, "monitoring"),
            SupervisorState::Analyzing => write!(f, "analyzing"),
            SupervisorState::Delegating => write!(f, "delegating"),
            SupervisorState::Waiting => write!(f, "waiting"),
            SupervisorState::Error => write!(f, "error"),
        }
    }
}

/// Mutable scratch state threaded through every state-machine transition.
///
/// Exclusively owned by the supervisor; one instance per supervisor process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorContext {
    /// Identifier of the owning supervisor.
    pub supervisor_id: String,
    /// Tasks currently assigned and awaiting results.
    pub current_task_count: usize,
    /// Tasks waiting in the queue at the last refresh.
    pub pending_tasks: usize,
    /// Available workers at the last refresh.
    pub available_workers: usize,
    /// When the supervisor last handed a task to a worker.
    pub last_delegation_time: Option<DateTime<Utc>>,
    /// Total loop-iteration faults since startup.
    pub error_count: u64,
    /// Description of the most recent fault.
    pub last_error_message: Option<String>,
}

impl SupervisorContext {
    /// Creates an empty context for the given supervisor id.
    pub fn new(supervisor_id: impl Into<String>) -> Self {
        Self {
            supervisor_id: supervisor_id.into(),
            current_task_count: 0,
            pending_tasks: 0,
            available_workers: 0,
            last_delegation_time: None,
            error_count: 0,
            last_error_message: None,
        }
    }

    /// Records a loop-iteration fault.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.last_error_message = Some(message.into());
    }
}
