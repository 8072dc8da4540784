use crate::service::{AgentRegistry, MessageBus, MessageHandler, TaskQueue, TaskStore};
use async_trait::async_trait;
use overseer_core::{
    AgentInfo, AgentStatus, MessageEnvelope, MessageType, OverseerError, OverseerResult, Task,
    TaskResult, TaskStatus,
};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Task queue
// ---------------------------------------------------------------------------

/// Heap entry ordering: higher priority first, FIFO among equal priorities.
struct QueueEntry {
    priority: i32,
    seq: u64,
    task: Task,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest entry: greatest = highest priority,
        // then lowest sequence number.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueueEntry>,
    queued_ids: HashSet<String>,
    next_seq: u64,
}

/// In-memory priority task queue.
///
/// Safe under concurrent enqueue/dequeue. A task id already present in the
/// queue is treated as the same logical task: re-enqueuing it is a no-op
/// rather than a duplicate entry.
pub struct InMemoryTaskQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl InMemoryTaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                queued_ids: HashSet::new(),
                next_seq: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn try_pop(&self) -> Option<Task> {
        let mut inner = self.inner.lock();
        let entry = inner.heap.pop()?;
        inner.queued_ids.remove(&entry.task.id);
        Some(entry.task)
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn enqueue(&self, task: Task) -> OverseerResult<()> {
        {
            let mut inner = self.inner.lock();
            if !inner.queued_ids.insert(task.id.clone()) {
                // Same logical task is already queued.
                return Ok(());
            }
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.heap.push(QueueEntry {
                priority: task.priority,
                seq,
                task,
            });
        }
        // notify_one leaves a permit when no consumer is parked yet, so an
        // enqueue racing the dequeue's registration is never missed.
        self.notify.notify_one();
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> OverseerResult<Option<Task>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(task) = self.try_pop() {
                return Ok(Some(task));
            }
            let notified = self.notify.notified();
            // Re-check after registering interest so a concurrent enqueue
            // between try_pop and notified() is not missed.
            if let Some(task) = self.try_pop() {
                return Ok(Some(task));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn peek(&self) -> OverseerResult<Option<Task>> {
        let inner = self.inner.lock();
        Ok(inner.heap.peek().map(|e| e.task.clone()))
    }

    async fn pending_count(&self) -> OverseerResult<usize> {
        Ok(self.inner.lock().heap.len())
    }
}

// ---------------------------------------------------------------------------
// Agent registry
// ---------------------------------------------------------------------------

/// In-memory agent registry backed by a map of [`AgentInfo`] records.
pub struct InMemoryAgentRegistry {
    agents: RwLock<HashMap<String, AgentInfo>>,
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
        }
    }

    /// Adds or replaces an agent record.
    pub fn register(&self, agent: AgentInfo) {
        self.agents.write().insert(agent.agent_id.clone(), agent);
    }

    /// Removes an agent record.
    pub fn deregister(&self, agent_id: &str) -> bool {
        self.agents.write().remove(agent_id).is_some()
    }
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn get_by_id(&self, agent_id: &str) -> OverseerResult<Option<AgentInfo>> {
        Ok(self.agents.read().get(agent_id).cloned())
    }

    async fn get_all(&self) -> OverseerResult<Vec<AgentInfo>> {
        let mut all: Vec<AgentInfo> = self.agents.read().values().cloned().collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(all)
    }

    async fn find_by_capability(&self, capability: &str) -> OverseerResult<Vec<AgentInfo>> {
        let mut found: Vec<AgentInfo> = self
            .agents
            .read()
            .values()
            .filter(|a| a.has_capability(capability))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(found)
    }

    async fn find_by_type(&self, agent_type: &str) -> OverseerResult<Vec<AgentInfo>> {
        let mut found: Vec<AgentInfo> = self
            .agents
            .read()
            .values()
            .filter(|a| a.agent_type == agent_type)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        Ok(found)
    }

    async fn update_status(&self, agent_id: &str, status: AgentStatus) -> OverseerResult<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| OverseerError::Registry(format!("agent {agent_id} not found")))?;
        agent.status = status;
        Ok(())
    }

    async fn update_task_count(&self, agent_id: &str, count: u32) -> OverseerResult<()> {
        let mut agents = self.agents.write();
        let agent = agents
            .get_mut(agent_id)
            .ok_or_else(|| OverseerError::Registry(format!("agent {agent_id} not found")))?;
        agent.current_task_count = count;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Task store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    tasks: HashMap<String, Task>,
    statuses: HashMap<String, TaskStatus>,
    results: HashMap<String, TaskResult>,
}

/// In-memory task and result store.
pub struct InMemoryTaskStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> OverseerResult<()> {
        let mut inner = self.inner.write();
        inner.tasks.insert(task.id.clone(), task.clone());
        inner
            .statuses
            .entry(task.id.clone())
            .or_insert(TaskStatus::Pending);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> OverseerResult<Option<Task>> {
        Ok(self.inner.read().tasks.get(task_id).cloned())
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> OverseerResult<()> {
        let mut inner = self.inner.write();
        if !inner.tasks.contains_key(task_id) {
            return Err(OverseerError::Store(format!("task {task_id} not found")));
        }
        inner.statuses.insert(task_id.to_string(), status);
        Ok(())
    }

    async fn get_status(&self, task_id: &str) -> OverseerResult<Option<TaskStatus>> {
        Ok(self.inner.read().statuses.get(task_id).copied())
    }

    async fn save_result(&self, result: &TaskResult) -> OverseerResult<()> {
        let mut inner = self.inner.write();
        inner
            .results
            .insert(result.task_id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, task_id: &str) -> OverseerResult<Option<TaskResult>> {
        Ok(self.inner.read().results.get(task_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Message bus
// ---------------------------------------------------------------------------

/// In-memory message bus.
///
/// Handlers are invoked on spawned tokio tasks, so delivery is concurrent
/// with the sender and with the supervisor's dispatch loop.
pub struct InMemoryMessageBus {
    handlers: RwLock<HashMap<MessageType, Vec<MessageHandler>>>,
}

impl InMemoryMessageBus {
    /// Creates a bus with no subscriptions.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryMessageBus {
    async fn send(&self, message: MessageEnvelope) -> OverseerResult<()> {
        let subscribers: Vec<MessageHandler> = self
            .handlers
            .read()
            .get(&message.message_type)
            .cloned()
            .unwrap_or_default();
        for handler in subscribers {
            let envelope = message.clone();
            tokio::spawn(async move {
                handler(envelope).await;
            });
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        message_type: MessageType,
        handler: MessageHandler,
    ) -> OverseerResult<()> {
        self.handlers
            .write()
            .entry(message_type)
            .or_default()
            .push(handler);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_queue_priority_order() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(Task::new("low", "t").with_priority(1)).await.unwrap();
        queue.enqueue(Task::new("high", "t").with_priority(5)).await.unwrap();
        queue.enqueue(Task::new("mid", "t").with_priority(3)).await.unwrap();

        let order: Vec<String> = [
            queue.dequeue(Duration::from_millis(10)).await.unwrap(),
            queue.dequeue(Duration::from_millis(10)).await.unwrap(),
            queue.dequeue(Duration::from_millis(10)).await.unwrap(),
        ]
        .into_iter()
        .map(|t| t.unwrap().id)
        .collect();
        assert_eq!(order, ["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn test_queue_fifo_among_equal_priorities() {
        let queue = InMemoryTaskQueue::new();
        for id in ["a", "b", "c"] {
            queue.enqueue(Task::new(id, "t").with_priority(2)).await.unwrap();
        }
        for expected in ["a", "b", "c"] {
            let task = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
            assert_eq!(task.id, expected);
        }
    }

    #[tokio::test]
    async fn test_queue_dequeue_timeout_on_empty() {
        let queue = InMemoryTaskQueue::new();
        let got = queue.dequeue(Duration::from_millis(20)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_queue_dequeue_wakes_on_enqueue() {
        let queue = Arc::new(InMemoryTaskQueue::new());
        let waiter = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            waiter.dequeue(Duration::from_secs(5)).await.unwrap()
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(Task::new("t1", "t")).await.unwrap();
        let got = handle.await.unwrap();
        assert_eq!(got.unwrap().id, "t1");
    }

    #[tokio::test]
    async fn test_queue_reenqueue_is_not_a_duplicate() {
        let queue = InMemoryTaskQueue::new();
        let task = Task::new("t1", "t").with_priority(4);
        queue.enqueue(task.clone()).await.unwrap();
        queue.enqueue(task.clone()).await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);

        // Dequeued-then-re-enqueued is the same logical task, once.
        let popped = queue.dequeue(Duration::from_millis(10)).await.unwrap().unwrap();
        queue.enqueue(popped).await.unwrap();
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_queue_peek_does_not_remove() {
        let queue = InMemoryTaskQueue::new();
        queue.enqueue(Task::new("t1", "t")).await.unwrap();
        assert_eq!(queue.peek().await.unwrap().unwrap().id, "t1");
        assert_eq!(queue.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_registry_lookup_and_updates() {
        let registry = InMemoryAgentRegistry::new();
        registry.register(AgentInfo::new(
            "w1",
            "researcher",
            overseer_core::AgentCapabilities::new(2).with_tool("web_search"),
        ));

        assert!(registry.get_by_id("w1").await.unwrap().is_some());
        assert!(registry.get_by_id("ghost").await.unwrap().is_none());
        assert_eq!(registry.find_by_capability("web_search").await.unwrap().len(), 1);
        assert_eq!(registry.find_by_type("researcher").await.unwrap().len(), 1);
        assert!(registry.find_by_type("translator").await.unwrap().is_empty());

        registry.update_status("w1", AgentStatus::Busy).await.unwrap();
        registry.update_task_count("w1", 2).await.unwrap();
        let agent = registry.get_by_id("w1").await.unwrap().unwrap();
        assert_eq!(agent.status, AgentStatus::Busy);
        assert_eq!(agent.current_task_count, 2);
    }

    #[tokio::test]
    async fn test_registry_update_unknown_agent_fails() {
        let registry = InMemoryAgentRegistry::new();
        let err = registry.update_status("ghost", AgentStatus::Busy).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_store_roundtrip() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("t1", "echo");
        store.save(&task).await.unwrap();
        assert_eq!(store.get_status("t1").await.unwrap(), Some(TaskStatus::Pending));

        store.update_status("t1", TaskStatus::Assigned).await.unwrap();
        assert_eq!(store.get_status("t1").await.unwrap(), Some(TaskStatus::Assigned));

        let result = TaskResult::success("t1", "w1", serde_json::json!("done"));
        store.save_result(&result).await.unwrap();
        let stored = store.get_result("t1").await.unwrap().unwrap();
        assert!(stored.success);
        assert_eq!(stored.worker_agent_id, "w1");
    }

    #[tokio::test]
    async fn test_store_update_unknown_task_fails() {
        let store = InMemoryTaskStore::new();
        assert!(store.update_status("ghost", TaskStatus::Assigned).await.is_err());
    }

    #[tokio::test]
    async fn test_bus_delivers_to_matching_subscribers_only() {
        let bus = InMemoryMessageBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        bus.subscribe(
            MessageType::TaskResult,
            Arc::new(move |_env| {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    counter.fetch_add(1, AtomicOrdering::SeqCst);
                })
            }),
        )
        .await
        .unwrap();

        bus.send(MessageEnvelope::new(
            "w1",
            "sup",
            MessageType::TaskResult,
            serde_json::Value::Null,
            "t1",
        ))
        .await
        .unwrap();
        bus.send(MessageEnvelope::new(
            "sup",
            "w1",
            MessageType::TaskAssignment,
            serde_json::Value::Null,
            "t2",
        ))
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 1);
    }
}
