use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of payload carried by a [`MessageEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Supervisor → worker: a task has been assigned.
    TaskAssignment,
    /// Worker → supervisor: the result of an assigned task.
    TaskResult,
    /// Worker → supervisor: a periodic status/heartbeat report.
    StatusReport,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::TaskAssignment => write!(f, "task_assignment"),
            MessageType::TaskResult => write!(f, "task_result"),
            MessageType::StatusReport => write!(f, "status_report"),
        }
    }
}

/// A single addressed message exchanged over the bus between the supervisor
/// and a worker agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Agent id of the sender.
    pub from_agent_id: String,
    /// Agent id of the addressee.
    pub to_agent_id: String,
    /// The kind of payload.
    pub message_type: MessageType,
    /// Message body; shape depends on `message_type`.
    pub payload: serde_json::Value,
    /// Correlates an assignment with its eventual result (the task id).
    pub correlation_id: String,
    /// UTC timestamp of when the envelope was created.
    pub timestamp: DateTime<Utc>,
    /// Unique identifier for this envelope.
    pub message_id: Uuid,
}

impl MessageEnvelope {
    /// Creates a new envelope with a fresh message id and the current time.
    pub fn new(
        from_agent_id: impl Into<String>,
        to_agent_id: impl Into<String>,
        message_type: MessageType,
        payload: serde_json::Value,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            from_agent_id: from_agent_id.into(),
            to_agent_id: to_agent_id.into(),
            message_type,
            payload,
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            message_id: Uuid::new_v4(),
        }
    }
}
