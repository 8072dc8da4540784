use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Live status of a worker agent as recorded in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Registered and accepting work.
    Available,
    /// Executing at least one task.
    Busy,
    /// Registered but not accepting work (draining, offline).
    Unavailable,
    /// The worker reported a fault.
    Error,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Available => write!(f, "available"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Unavailable => write!(f, "unavailable"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

impl AgentStatus {
    /// Maps an external state-provider state name onto the registry status
    /// enumeration. Unrecognized names are treated as [`AgentStatus::Unavailable`].
    pub fn from_state_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "available" | "idle" | "ready" | "monitoring" => AgentStatus::Available,
            "busy" | "working" | "executing" | "delegating" => AgentStatus::Busy,
            "error" | "faulted" => AgentStatus::Error,
            _ => AgentStatus::Unavailable,
        }
    }
}

/// Declared capabilities and capacity of a worker agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Tool names the worker can invoke.
    #[serde(default)]
    pub supported_tools: BTreeSet<String>,
    /// Intent names the worker can handle.
    #[serde(default)]
    pub supported_intents: BTreeSet<String>,
    /// Maximum concurrently assigned tasks; always > 0.
    pub max_concurrent_tasks: u32,
}

impl AgentCapabilities {
    /// Creates a capability set with the given concurrency limit.
    pub fn new(max_concurrent_tasks: u32) -> Self {
        Self {
            supported_tools: BTreeSet::new(),
            supported_intents: BTreeSet::new(),
            max_concurrent_tasks: max_concurrent_tasks.max(1),
        }
    }

    /// Adds a supported tool.
    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.supported_tools.insert(tool.into());
        self
    }

    /// Adds a supported intent.
    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.supported_intents.insert(intent.into());
        self
    }
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Registry record for a worker agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Unique agent identifier.
    pub agent_id: String,
    /// Free-form agent type (e.g. "researcher", "summarizer").
    pub agent_type: String,
    /// Last-known status.
    pub status: AgentStatus,
    /// Number of tasks currently assigned.
    pub current_task_count: u32,
    /// Declared capabilities and capacity.
    pub capabilities: AgentCapabilities,
}

impl AgentInfo {
    /// Creates an available worker record with zero assigned tasks.
    pub fn new(
        agent_id: impl Into<String>,
        agent_type: impl Into<String>,
        capabilities: AgentCapabilities,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_type: agent_type.into(),
            status: AgentStatus::Available,
            current_task_count: 0,
            capabilities,
        }
    }

    /// Current load as a fraction of capacity, in `[0.0, 1.0]`.
    pub fn load_ratio(&self) -> f64 {
        f64::from(self.current_task_count) / f64::from(self.capabilities.max_concurrent_tasks)
    }

    /// True when the agent declares `capability` as a tool or an intent.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.supported_tools.contains(capability)
            || self.capabilities.supported_intents.contains(capability)
    }

    /// True while `current_task_count` is below the concurrency limit.
    pub fn has_spare_capacity(&self) -> bool {
        self.current_task_count < self.capabilities.max_concurrent_tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(max: u32) -> AgentInfo {
        AgentInfo::new("w1", "researcher", AgentCapabilities::new(max))
    }

    #[test]
    fn test_new_agent_is_available() {
        let agent = worker(3);
        assert_eq!(agent.status, AgentStatus::Available);
        assert_eq!(agent.current_task_count, 0);
        assert!(agent.has_spare_capacity());
    }

    #[test]
    fn test_load_ratio() {
        let mut agent = worker(4);
        assert_eq!(agent.load_ratio(), 0.0);
        agent.current_task_count = 2;
        assert_eq!(agent.load_ratio(), 0.5);
        agent.current_task_count = 4;
        assert_eq!(agent.load_ratio(), 1.0);
        assert!(!agent.has_spare_capacity());
    }

    #[test]
    fn test_has_capability_tools_and_intents() {
        let caps = AgentCapabilities::new(2)
            .with_tool("web_search")
            .with_intent("summarize");
        let agent = AgentInfo::new("w1", "researcher", caps);
        assert!(agent.has_capability("web_search"));
        assert!(agent.has_capability("summarize"));
        assert!(!agent.has_capability("translate"));
    }

    #[test]
    fn test_capabilities_floor_at_one() {
        let caps = AgentCapabilities::new(0);
        assert_eq!(caps.max_concurrent_tasks, 1);
    }

    #[test]
    fn test_status_from_state_name() {
        assert_eq!(AgentStatus::from_state_name("Idle"), AgentStatus::Available);
        assert_eq!(AgentStatus::from_state_name("working"), AgentStatus::Busy);
        assert_eq!(AgentStatus::from_state_name("faulted"), AgentStatus::Error);
        assert_eq!(
            AgentStatus::from_state_name("hibernating"),
            AgentStatus::Unavailable
        );
    }
}
