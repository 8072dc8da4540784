use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle status of a task, tracked in the task store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Submitted, waiting in the queue.
    Pending,
    /// Handed to a worker; the worker has not reported progress yet.
    Assigned,
    /// The worker has started executing.
    InProgress,
    /// Finished with `success == true`.
    Completed,
    /// Finished with `success == false`.
    Failed,
    /// Cancelled by the caller before a result was recorded.
    Cancelled,
}

impl TaskStatus {
    /// True for Completed, Failed, and Cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Assigned => write!(f, "assigned"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A unit of work submitted to the supervisor.
///
/// Immutable after enqueue; lifecycle status lives in the task store, not on
/// the task itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Caller-supplied unique identifier.
    pub id: String,
    /// Free-form task type, used for per-type statistics.
    pub task_type: String,
    /// Higher value dequeues first; ties are FIFO.
    pub priority: i32,
    /// When set, only workers declaring this capability are eligible.
    #[serde(default)]
    pub required_capability: Option<String>,
    /// Ordered key → value input map handed to the worker.
    #[serde(default)]
    pub input: serde_json::Map<String, serde_json::Value>,
    /// UTC timestamp of submission.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task with priority 0 and empty input.
    pub fn new(id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            priority: 0,
            required_capability: None,
            input: serde_json::Map::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the queue priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restricts eligible workers to those declaring `capability`.
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capability = Some(capability.into());
        self
    }

    /// Adds one input key/value pair.
    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.input.insert(key.into(), value);
        self
    }
}

/// The outcome of a task, produced exactly once by the worker and consumed
/// exactly once by the supervisor's result handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Id of the task this result belongs to.
    pub task_id: String,
    /// Whether the worker completed the task successfully.
    pub success: bool,
    /// Worker-produced output.
    #[serde(default)]
    pub output: serde_json::Value,
    /// Failure description when `success == false`.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Id of the worker that executed the task.
    pub worker_agent_id: String,
    /// UTC timestamp of completion.
    pub completed_at: DateTime<Utc>,
    /// Wall-clock execution time, measured from assignment.
    #[serde(with = "crate::serde_millis")]
    pub execution_time: Duration,
}

impl TaskResult {
    /// Creates a successful result.
    pub fn success(
        task_id: impl Into<String>,
        worker_agent_id: impl Into<String>,
        output: serde_json::Value,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output,
            error_message: None,
            worker_agent_id: worker_agent_id.into(),
            completed_at: Utc::now(),
            execution_time: Duration::ZERO,
        }
    }

    /// Creates a failed result.
    pub fn failure(
        task_id: impl Into<String>,
        worker_agent_id: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: serde_json::Value::Null,
            error_message: Some(error_message.into()),
            worker_agent_id: worker_agent_id.into(),
            completed_at: Utc::now(),
            execution_time: Duration::ZERO,
        }
    }

    /// Sets the measured execution time.
    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t1", "summarize")
            .with_priority(5)
            .with_capability("summarizer")
            .with_input("document", serde_json::json!("report.pdf"));
        assert_eq!(task.id, "t1");
        assert_eq!(task.priority, 5);
        assert_eq!(task.required_capability.as_deref(), Some("summarizer"));
        assert_eq!(task.input["document"], "report.pdf");
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new("t2", "echo");
        assert_eq!(task.priority, 0);
        assert!(task.required_capability.is_none());
        assert!(task.input.is_empty());
    }

    #[test]
    fn test_status_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
        assert_eq!(TaskStatus::Cancelled.to_string(), "cancelled");
    }

    #[test]
    fn test_result_constructors() {
        let ok = TaskResult::success("t1", "w1", serde_json::json!({"answer": 42}));
        assert!(ok.success);
        assert!(ok.error_message.is_none());

        let bad = TaskResult::failure("t1", "w1", "timeout");
        assert!(!bad.success);
        assert_eq!(bad.error_message.as_deref(), Some("timeout"));
        assert!(bad.output.is_null());
    }

    #[test]
    fn test_result_execution_time_roundtrip() {
        let result = TaskResult::success("t1", "w1", serde_json::Value::Null)
            .with_execution_time(Duration::from_millis(1500));
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"execution_time\":1500"));
        let parsed: TaskResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.execution_time, Duration::from_millis(1500));
    }

    #[test]
    fn test_task_serialization_preserves_input_order() {
        let task = Task::new("t1", "transform")
            .with_input("first", serde_json::json!(1))
            .with_input("second", serde_json::json!(2));
        let json = serde_json::to_string(&task).unwrap();
        let first_pos = json.find("first").unwrap();
        let second_pos = json.find("second").unwrap();
        assert!(first_pos < second_pos);
    }
}
