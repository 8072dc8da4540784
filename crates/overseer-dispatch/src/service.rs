use async_trait::async_trait;
use futures_util::future::BoxFuture;
use overseer_core::{
    AgentInfo, AgentStatus, MessageEnvelope, MessageType, OverseerResult, Task, TaskResult,
    TaskStatus,
};
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked by the bus for each delivered envelope. Handlers run on
/// the bus's own tasks, concurrently with the dispatch loop.
pub type MessageHandler = Arc<dyn Fn(MessageEnvelope) -> BoxFuture<'static, ()> + Send + Sync>;

/// Source of truth for worker identity, declared capabilities, and last-known
/// status and load.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Looks up a single agent record.
    async fn get_by_id(&self, agent_id: &str) -> OverseerResult<Option<AgentInfo>>;

    /// Returns all registered agents.
    async fn get_all(&self) -> OverseerResult<Vec<AgentInfo>>;

    /// Returns agents declaring `capability` as a tool or intent.
    async fn find_by_capability(&self, capability: &str) -> OverseerResult<Vec<AgentInfo>>;

    /// Returns agents of the given type.
    async fn find_by_type(&self, agent_type: &str) -> OverseerResult<Vec<AgentInfo>>;

    /// Overwrites an agent's status.
    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> OverseerResult<()>;

    /// Overwrites an agent's current task count.
    async fn update_task_count(&self, agent_id: &str, count: u32) -> OverseerResult<()>;
}

/// Priority-ordered pending-task storage.
///
/// Dequeue returns the highest-priority pending task, FIFO among equal
/// priorities. Re-enqueuing a previously dequeued task must not create a
/// distinguishable duplicate.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Adds a task to the queue.
    async fn enqueue(&self, task: Task) -> OverseerResult<()>;

    /// Removes and returns the highest-priority task, waiting up to `timeout`
    /// for one to arrive. Returns `None` on timeout.
    async fn dequeue(&self, timeout: Duration) -> OverseerResult<Option<Task>>;

    /// Returns the highest-priority task without removing it.
    async fn peek(&self) -> OverseerResult<Option<Task>>;

    /// Number of tasks currently queued.
    async fn pending_count(&self) -> OverseerResult<usize>;
}

/// Durable task and result storage.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a task record.
    async fn save(&self, task: &Task) -> OverseerResult<()>;

    /// Fetches a task by id.
    async fn get(&self, task_id: &str) -> OverseerResult<Option<Task>>;

    /// Updates a task's lifecycle status.
    async fn update_status(&self, task_id: &str, status: TaskStatus) -> OverseerResult<()>;

    /// Fetches a task's lifecycle status.
    async fn get_status(&self, task_id: &str) -> OverseerResult<Option<TaskStatus>>;

    /// Persists the result of a task.
    async fn save_result(&self, result: &TaskResult) -> OverseerResult<()>;

    /// Fetches a task's result, if one was recorded.
    async fn get_result(&self, task_id: &str) -> OverseerResult<Option<TaskResult>>;
}

/// Typed publish/subscribe channel between the supervisor and workers.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publishes an envelope to all subscribers of its message type.
    async fn send(&self, message: MessageEnvelope) -> OverseerResult<()>;

    /// Registers a handler for all future envelopes of `message_type`.
    async fn subscribe(
        &self,
        message_type: MessageType,
        handler: MessageHandler,
    ) -> OverseerResult<()>;
}

/// Alternative worker-selection hook, consulted before the pool's default
/// selection when configured.
#[async_trait]
pub trait TaskRouter: Send + Sync {
    /// Picks a worker for `task` from `candidates`, or `None` to fall back to
    /// the pool's default selection.
    async fn route(&self, task: &Task, candidates: &[AgentInfo]) -> OverseerResult<Option<AgentInfo>>;
}

/// External state machine governing worker availability.
///
/// When configured on the pool, the reported state name (mapped through
/// [`AgentStatus::from_state_name`]) replaces the registry status field.
#[async_trait]
pub trait WorkerStateProvider: Send + Sync {
    /// Returns the current state name for `agent_id`, or `None` when the
    /// provider does not track that agent.
    async fn agent_state(&self, agent_id: &str) -> OverseerResult<Option<String>>;
}
