use crate::config::SupervisorConfig;
use crate::pool::WorkerPool;
use crate::service::{
    AgentRegistry, MessageBus, MessageHandler, TaskQueue, TaskRouter, TaskStore,
};
use crate::state_machine::{StateMachine, TransitionTable};
use chrono::Utc;
use overseer_core::{
    AgentInfo, AgentStatus, MessageEnvelope, MessageType, OverseerError, OverseerResult,
    SupervisorContext, SupervisorState, Task, TaskResult, TaskStatus,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Point-in-time supervisor counters, recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorStatistics {
    /// Tasks ever accepted by `submit`.
    pub total_submitted: u64,
    /// Tasks whose result arrived with `success == true`.
    pub completed: u64,
    /// Tasks whose result arrived with `success == false`.
    pub failed: u64,
    /// Tasks cancelled before a result was recorded.
    pub cancelled: u64,
    /// Tasks submitted but not yet assigned.
    pub pending: u64,
    /// Tasks assigned and awaiting a result.
    pub in_progress: u64,
    /// Average execution time over the bounded history.
    #[serde(with = "overseer_core::serde_millis")]
    pub average_execution_time: Duration,
    /// Submission counts per task type.
    pub tasks_by_type: BTreeMap<String, u64>,
    /// Assignment counts per worker agent.
    pub tasks_by_agent: BTreeMap<String, u64>,
    /// The state machine's current state.
    pub current_state: SupervisorState,
}

struct InFlight {
    agent_id: String,
    started_at: Instant,
    in_progress: bool,
}

/// Everything the loop and the result handler mutate, behind one mutex.
struct Shared {
    machine: Box<dyn StateMachine>,
    ctx: SupervisorContext,
    total_submitted: u64,
    completed: u64,
    failed: u64,
    cancelled_count: u64,
    tasks_by_type: BTreeMap<String, u64>,
    tasks_by_agent: BTreeMap<String, u64>,
    in_flight: HashMap<String, InFlight>,
    cancelled: HashSet<String>,
    execution_times: VecDeque<Duration>,
    history_limit: usize,
}

impl Shared {
    fn state(&self) -> SupervisorState {
        self.machine.current_state()
    }

    fn transition(&mut self, to: SupervisorState) -> OverseerResult<()> {
        let Self { machine, ctx, .. } = self;
        machine.transition(to, ctx)
    }

    fn record_execution_time(&mut self, duration: Duration) {
        if self.execution_times.len() == self.history_limit {
            self.execution_times.pop_front();
        }
        self.execution_times.push_back(duration);
    }

    fn average_execution_time(&self) -> Duration {
        if self.execution_times.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.execution_times.iter().sum();
        total / self.execution_times.len() as u32
    }
}

/// The dispatch orchestrator.
///
/// Owns the state machine over its own lifecycle, runs one long-lived
/// dispatch loop, and consumes results from the bus subscription. Callers
/// interact through `submit`/`cancel`/`status`/`statistics`, none of which
/// block on task execution.
pub struct Supervisor {
    id: String,
    config: SupervisorConfig,
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn TaskQueue>,
    registry: Arc<dyn AgentRegistry>,
    bus: Arc<dyn MessageBus>,
    pool: Arc<WorkerPool>,
    router: Option<Arc<dyn TaskRouter>>,
    shared: Mutex<Shared>,
    // Serializes the registry get/update pairs in `acquire_worker_slot` and
    // `release_worker_slot`; the loop and the result handler run concurrently
    // and lost updates would corrupt worker capacity accounting. Not `shared`:
    // registry calls are awaited under this lock, never under `shared`.
    registry_lock: tokio::sync::Mutex<()>,
    shutdown_tx: watch::Sender<bool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Wires a supervisor over its collaborators. Nothing runs until
    /// [`Supervisor::start`].
    pub fn new(
        supervisor_id: impl Into<String>,
        config: SupervisorConfig,
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn TaskQueue>,
        registry: Arc<dyn AgentRegistry>,
        bus: Arc<dyn MessageBus>,
        pool: Arc<WorkerPool>,
    ) -> Self {
        let id = supervisor_id.into();
        let history_limit = config.execution_history_limit.max(1);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Mutex::new(Shared {
                machine: Box::new(TransitionTable::new()),
                ctx: SupervisorContext::new(id.clone()),
                total_submitted: 0,
                completed: 0,
                failed: 0,
                cancelled_count: 0,
                tasks_by_type: BTreeMap::new(),
                tasks_by_agent: BTreeMap::new(),
                in_flight: HashMap::new(),
                cancelled: HashSet::new(),
                execution_times: VecDeque::new(),
                history_limit,
            }),
            id,
            config,
            store,
            queue,
            registry,
            bus,
            pool,
            router: None,
            registry_lock: tokio::sync::Mutex::new(()),
            shutdown_tx,
            loop_handle: Mutex::new(None),
        }
    }

    /// Consults `router` before the pool's default selection.
    pub fn with_router(mut self, router: Arc<dyn TaskRouter>) -> Self {
        self.router = Some(router);
        self
    }

    /// Replaces the default transition-table state machine.
    pub fn with_state_machine(self, machine: Box<dyn StateMachine>) -> Self {
        self.shared.lock().machine = machine;
        self
    }

    /// Supervisor id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The state machine's current state.
    pub fn current_state(&self) -> SupervisorState {
        self.shared.lock().state()
    }

    /// Snapshot of the transition context.
    pub fn context(&self) -> SupervisorContext {
        self.shared.lock().ctx.clone()
    }

    /// Registers the bus subscriptions and spawns the dispatch loop.
    ///
    /// Initialization is awaited: a subscription failure is returned to the
    /// caller and the loop is not started.
    pub async fn start(self: &Arc<Self>) -> OverseerResult<()> {
        if self.loop_handle.lock().is_some() {
            return Err(OverseerError::Supervisor(
                "supervisor already started".into(),
            ));
        }

        let result_handler: MessageHandler = {
            let sup = Arc::clone(self);
            Arc::new(move |envelope| {
                let sup = Arc::clone(&sup);
                Box::pin(async move {
                    if let Err(e) = sup.handle_result(envelope).await {
                        error!(supervisor_id = %sup.id, error = %e, "result handler failed");
                    }
                })
            })
        };
        self.bus
            .subscribe(MessageType::TaskResult, result_handler)
            .await?;

        let progress_handler: MessageHandler = {
            let sup = Arc::clone(self);
            Arc::new(move |envelope| {
                let sup = Arc::clone(&sup);
                Box::pin(async move {
                    if let Err(e) = sup.handle_status_report(envelope).await {
                        warn!(supervisor_id = %sup.id, error = %e, "status report dropped");
                    }
                })
            })
        };
        self.bus
            .subscribe(MessageType::StatusReport, progress_handler)
            .await?;

        let sup = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move { sup.run_loop(shutdown_rx).await });
        *self.loop_handle.lock() = Some(handle);
        info!(supervisor_id = %self.id, "supervisor started");
        Ok(())
    }

    /// Stops the loop after its current iteration and waits for it to exit.
    /// In-flight assignments already on the bus are not recalled.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!(supervisor_id = %self.id, "supervisor stopped");
    }

    // -----------------------------------------------------------------------
    // Public task operations
    // -----------------------------------------------------------------------

    /// Persists and enqueues a task, returning its id immediately.
    ///
    /// Does not block for assignment or completion; the dispatch loop picks
    /// the task up from the queue.
    pub async fn submit(&self, task: Task) -> OverseerResult<String> {
        if task.id.trim().is_empty() {
            return Err(OverseerError::InvalidArgument(
                "task id must not be empty".into(),
            ));
        }
        if self.store.get(&task.id).await?.is_some() {
            return Err(OverseerError::InvalidArgument(format!(
                "task {} was already submitted",
                task.id
            )));
        }

        self.store.save(&task).await?;
        {
            let mut shared = self.shared.lock();
            shared.total_submitted += 1;
            *shared
                .tasks_by_type
                .entry(task.task_type.clone())
                .or_insert(0) += 1;
        }
        let task_id = task.id.clone();
        self.queue.enqueue(task).await?;
        debug!(supervisor_id = %self.id, task_id = %task_id, "task submitted");
        Ok(task_id)
    }

    /// Submits several tasks in order, returning their ids.
    pub async fn submit_batch(&self, tasks: Vec<Task>) -> OverseerResult<Vec<String>> {
        let mut ids = Vec::with_capacity(tasks.len());
        for task in tasks {
            ids.push(self.submit(task).await?);
        }
        Ok(ids)
    }

    /// Derived lifecycle status of a task.
    pub async fn status(&self, task_id: &str) -> OverseerResult<TaskStatus> {
        {
            let shared = self.shared.lock();
            if shared.cancelled.contains(task_id) {
                return Ok(TaskStatus::Cancelled);
            }
        }
        if let Some(result) = self.store.get_result(task_id).await? {
            return Ok(if result.success {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            });
        }
        {
            let shared = self.shared.lock();
            if let Some(in_flight) = shared.in_flight.get(task_id) {
                return Ok(if in_flight.in_progress {
                    TaskStatus::InProgress
                } else {
                    TaskStatus::Assigned
                });
            }
        }
        if self.store.get(task_id).await?.is_some() {
            Ok(TaskStatus::Pending)
        } else {
            Err(OverseerError::InvalidArgument(format!(
                "unknown task {task_id}"
            )))
        }
    }

    /// The stored result of a task, if one was recorded.
    pub async fn result(&self, task_id: &str) -> OverseerResult<Option<TaskResult>> {
        self.store.get_result(task_id).await
    }

    /// Marks a task cancelled.
    ///
    /// Returns `false` once a result is recorded (Completed or Failed are
    /// terminal). A task already dispatched to a worker is only marked; the
    /// worker is not interrupted, and its eventual result is discarded.
    pub async fn cancel(&self, task_id: &str) -> OverseerResult<bool> {
        if self.store.get(task_id).await?.is_none() {
            return Err(OverseerError::InvalidArgument(format!(
                "unknown task {task_id}"
            )));
        }
        if self.store.get_result(task_id).await?.is_some() {
            return Ok(false);
        }
        {
            let mut shared = self.shared.lock();
            if shared.cancelled.insert(task_id.to_string()) {
                shared.cancelled_count += 1;
            }
            // An in-flight cancelled task stops counting as in-progress now;
            // the late result is discarded by the result handler.
            shared.in_flight.remove(task_id);
            shared.ctx.current_task_count = shared.in_flight.len();
        }
        self.store.update_status(task_id, TaskStatus::Cancelled).await?;
        info!(supervisor_id = %self.id, task_id, "task cancelled");
        Ok(true)
    }

    /// Aggregate counters plus the current state.
    pub fn statistics(&self) -> SupervisorStatistics {
        let shared = self.shared.lock();
        let in_progress = shared.in_flight.len() as u64;
        let accounted = shared.completed + shared.failed + shared.cancelled_count + in_progress;
        SupervisorStatistics {
            total_submitted: shared.total_submitted,
            completed: shared.completed,
            failed: shared.failed,
            cancelled: shared.cancelled_count,
            pending: shared.total_submitted.saturating_sub(accounted),
            in_progress,
            average_execution_time: shared.average_execution_time(),
            tasks_by_type: shared.tasks_by_type.clone(),
            tasks_by_agent: shared.tasks_by_agent.clone(),
            current_state: shared.state(),
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch loop
    // -----------------------------------------------------------------------

    async fn run_loop(&self, mut shutdown: watch::Receiver<bool>) {
        info!(supervisor_id = %self.id, "dispatch loop running");
        while !*shutdown.borrow() {
            if let Err(e) = self.run_iteration(&mut shutdown).await {
                // Fault isolation: one bad iteration never kills the loop.
                warn!(supervisor_id = %self.id, error = %e, "loop iteration failed");
                self.enter_error(&e);
                self.sleep_or_shutdown(self.config.error_backoff, &mut shutdown).await;
                self.recover_from_error();
            }
        }
        info!(supervisor_id = %self.id, "dispatch loop stopped");
    }

    async fn run_iteration(&self, shutdown: &mut watch::Receiver<bool>) -> OverseerResult<()> {
        // Refresh context from live sources before deciding anything.
        let pending = self.queue.pending_count().await?;
        let available = self.pool.available_worker_count().await?;
        {
            let mut shared = self.shared.lock();
            shared.ctx.pending_tasks = pending;
            shared.ctx.available_workers = available;
            shared.ctx.current_task_count = shared.in_flight.len();
        }

        let task = tokio::select! {
            dequeued = self.queue.dequeue(self.config.dequeue_timeout) => dequeued?,
            _ = shutdown.changed() => return Ok(()),
        };

        let Some(task) = task else {
            // Queue drained: fall back to Monitoring and idle briefly.
            {
                let mut shared = self.shared.lock();
                if shared.state() == SupervisorState::Waiting {
                    shared.transition(SupervisorState::Monitoring)?;
                }
            }
            self.sleep_or_shutdown(self.config.poll_interval, shutdown).await;
            return Ok(());
        };

        // A cancelled task that was still sitting in the queue is discarded
        // here, which is what makes its cancellation terminal.
        if self.shared.lock().cancelled.contains(&task.id) {
            debug!(supervisor_id = %self.id, task_id = %task.id, "dropping cancelled task");
            return Ok(());
        }

        {
            let mut shared = self.shared.lock();
            if shared.state() == SupervisorState::Waiting {
                shared.transition(SupervisorState::Monitoring)?;
            }
            shared.transition(SupervisorState::Analyzing)?;
            shared.transition(SupervisorState::Delegating)?;
        }

        let worker = match self.select_worker(&task).await {
            Ok(worker) => worker,
            Err(e) => {
                // The task already left the queue; put it back before
                // surfacing the fault so it is not lost.
                if let Err(requeue_err) = self.queue.enqueue(task.clone()).await {
                    error!(
                        supervisor_id = %self.id,
                        task_id = %task.id,
                        error = %requeue_err,
                        "failed to re-enqueue after selection fault"
                    );
                }
                return Err(e);
            }
        };
        let Some(worker) = worker else {
            // Capacity shortfall is not a task failure: put the task back and
            // back off.
            warn!(
                supervisor_id = %self.id,
                task_id = %task.id,
                "no eligible worker; re-enqueueing"
            );
            self.queue.enqueue(task).await?;
            self.shared.lock().transition(SupervisorState::Waiting)?;
            self.sleep_or_shutdown(self.config.no_worker_backoff, shutdown).await;
            return Ok(());
        };

        if let Err(e) = self.assign(&task, &worker).await {
            // Roll the bookkeeping back so the task is not stranded between
            // the queue and the in-flight map, then surface the fault.
            {
                let mut shared = self.shared.lock();
                shared.in_flight.remove(&task.id);
                if let Some(count) = shared.tasks_by_agent.get_mut(&worker.agent_id) {
                    *count = count.saturating_sub(1);
                }
            }
            if let Err(requeue_err) = self.queue.enqueue(task.clone()).await {
                error!(
                    supervisor_id = %self.id,
                    task_id = %task.id,
                    error = %requeue_err,
                    "failed to re-enqueue after assignment fault"
                );
            }
            return Err(e);
        }

        Ok(())
    }

    /// Hands `task` to `worker`: bookkeeping, store status, registry counters,
    /// and the assignment envelope.
    async fn assign(&self, task: &Task, worker: &AgentInfo) -> OverseerResult<()> {
        {
            let mut shared = self.shared.lock();
            shared.in_flight.insert(
                task.id.clone(),
                InFlight {
                    agent_id: worker.agent_id.clone(),
                    started_at: Instant::now(),
                    in_progress: false,
                },
            );
            *shared
                .tasks_by_agent
                .entry(worker.agent_id.clone())
                .or_insert(0) += 1;
        }

        self.store.update_status(&task.id, TaskStatus::Assigned).await?;
        self.acquire_worker_slot(worker).await?;

        let envelope = MessageEnvelope::new(
            &self.id,
            &worker.agent_id,
            MessageType::TaskAssignment,
            serde_json::to_value(task)?,
            &task.id,
        );
        if let Err(e) = self.bus.send(envelope).await {
            // The slot was taken but no assignment went out; give it back so
            // the worker is not wedged by a phantom task.
            if let Err(release_err) = self.release_worker_slot(&worker.agent_id).await {
                error!(
                    supervisor_id = %self.id,
                    agent_id = %worker.agent_id,
                    error = %release_err,
                    "could not release worker slot after send fault"
                );
            }
            return Err(e);
        }

        {
            let mut shared = self.shared.lock();
            shared.transition(SupervisorState::Waiting)?;
            shared.ctx.last_delegation_time = Some(Utc::now());
            shared.ctx.current_task_count = shared.in_flight.len();
        }
        info!(
            supervisor_id = %self.id,
            task_id = %task.id,
            agent_id = %worker.agent_id,
            "task assigned"
        );
        Ok(())
    }

    /// Increments the worker's registry task count and flips it Busy, as one
    /// serialized read-modify-write. The selection snapshot may be stale if a
    /// result arrived in between, so the count is re-read under the lock.
    async fn acquire_worker_slot(&self, worker: &AgentInfo) -> OverseerResult<()> {
        let _guard = self.registry_lock.lock().await;
        let current = self
            .registry
            .get_by_id(&worker.agent_id)
            .await?
            .map_or(worker.current_task_count, |a| a.current_task_count);
        self.registry
            .update_task_count(&worker.agent_id, current + 1)
            .await?;
        if let Err(e) = self
            .registry
            .update_status(&worker.agent_id, AgentStatus::Busy)
            .await
        {
            // The count write already landed; restore it before surfacing.
            if let Err(restore_err) = self
                .registry
                .update_task_count(&worker.agent_id, current)
                .await
            {
                error!(
                    supervisor_id = %self.id,
                    agent_id = %worker.agent_id,
                    error = %restore_err,
                    "could not restore worker task count"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Decrements the worker's registry task count and flips it back to
    /// Available once drained, serialized against `acquire_worker_slot`.
    async fn release_worker_slot(&self, agent_id: &str) -> OverseerResult<()> {
        let _guard = self.registry_lock.lock().await;
        if let Some(agent) = self.registry.get_by_id(agent_id).await? {
            let new_count = agent.current_task_count.saturating_sub(1);
            self.registry.update_task_count(agent_id, new_count).await?;
            let status = if new_count == 0 {
                AgentStatus::Available
            } else {
                AgentStatus::Busy
            };
            self.registry.update_status(agent_id, status).await?;
        }
        Ok(())
    }

    /// Router first when configured, then the pool's default selection.
    async fn select_worker(&self, task: &Task) -> OverseerResult<Option<AgentInfo>> {
        if let Some(router) = &self.router {
            let candidates = self.pool.available_workers().await?;
            if let Some(choice) = router.route(task, &candidates).await? {
                return Ok(Some(choice));
            }
        }
        self.pool.get_available_worker(Some(task), None, None).await
    }

    fn enter_error(&self, fault: &OverseerError) {
        let mut shared = self.shared.lock();
        shared.ctx.record_error(fault.to_string());
        if let Err(e) = shared.transition(SupervisorState::Error) {
            error!(supervisor_id = %self.id, error = %e, "could not enter error state");
        }
    }

    fn recover_from_error(&self) {
        let mut shared = self.shared.lock();
        if shared.state() == SupervisorState::Error {
            if let Err(e) = shared.transition(SupervisorState::Monitoring) {
                error!(supervisor_id = %self.id, error = %e, "could not leave error state");
            }
        }
    }

    async fn sleep_or_shutdown(&self, duration: Duration, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            _ = shutdown.changed() => {}
        }
    }

    // -----------------------------------------------------------------------
    // Bus handlers
    // -----------------------------------------------------------------------

    /// Consumes one `task_result` envelope. Runs on the bus's tasks,
    /// concurrently with the loop; all counter updates go through the shared
    /// mutex.
    async fn handle_result(&self, envelope: MessageEnvelope) -> OverseerResult<()> {
        let mut result: TaskResult = serde_json::from_value(envelope.payload)?;

        let (agent_id, measured, was_cancelled) = {
            let mut shared = self.shared.lock();
            let cancelled = shared.cancelled.contains(&result.task_id);
            match shared.in_flight.remove(&result.task_id) {
                Some(in_flight) => (
                    in_flight.agent_id,
                    Some(in_flight.started_at.elapsed()),
                    cancelled,
                ),
                None => (result.worker_agent_id.clone(), None, cancelled),
            }
        };
        if let Some(measured) = measured {
            result.execution_time = measured;
        }

        // Worker bookkeeping happens even for discarded results: the worker
        // did finish and its capacity is back.
        self.release_worker_slot(&agent_id).await?;

        if was_cancelled {
            debug!(
                supervisor_id = %self.id,
                task_id = %result.task_id,
                "discarding result for cancelled task"
            );
            return Ok(());
        }

        self.store.save_result(&result).await?;
        let final_status = if result.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        self.store.update_status(&result.task_id, final_status).await?;
        self.pool.record_completion(&agent_id, result.execution_time);

        {
            let mut shared = self.shared.lock();
            if result.success {
                shared.completed += 1;
            } else {
                shared.failed += 1;
            }
            shared.record_execution_time(result.execution_time);
            shared.ctx.current_task_count = shared.in_flight.len();
            if shared.state() == SupervisorState::Waiting {
                shared.transition(SupervisorState::Monitoring)?;
            }
        }

        info!(
            supervisor_id = %self.id,
            task_id = %result.task_id,
            agent_id = %agent_id,
            success = result.success,
            execution_ms = result.execution_time.as_millis() as u64,
            "task result recorded"
        );
        Ok(())
    }

    /// Consumes one `status_report` envelope: the worker has started the task
    /// named by the correlation id.
    async fn handle_status_report(&self, envelope: MessageEnvelope) -> OverseerResult<()> {
        let task_id = envelope.correlation_id;
        let tracked = {
            let mut shared = self.shared.lock();
            match shared.in_flight.get_mut(&task_id) {
                Some(in_flight) => {
                    in_flight.in_progress = true;
                    true
                }
                None => false,
            }
        };
        if tracked {
            self.store.update_status(&task_id, TaskStatus::InProgress).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryAgentRegistry, InMemoryMessageBus, InMemoryTaskQueue, InMemoryTaskStore,
    };
    use overseer_core::AgentCapabilities;

    fn harness() -> (Arc<Supervisor>, Arc<InMemoryAgentRegistry>) {
        let registry = Arc::new(InMemoryAgentRegistry::new());
        let queue = Arc::new(InMemoryTaskQueue::new());
        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&registry) as Arc<dyn AgentRegistry>
        ));
        let supervisor = Arc::new(Supervisor::new(
            "sup-test",
            SupervisorConfig::fast(),
            Arc::new(InMemoryTaskStore::new()),
            queue,
            Arc::clone(&registry) as Arc<dyn AgentRegistry>,
            Arc::new(InMemoryMessageBus::new()),
            pool,
        ));
        (supervisor, registry)
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_id() {
        let (supervisor, _) = harness();
        let err = supervisor.submit(Task::new("  ", "job")).await;
        assert!(matches!(err, Err(OverseerError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_duplicate_id() {
        let (supervisor, _) = harness();
        supervisor.submit(Task::new("t1", "job")).await.unwrap();
        let err = supervisor.submit(Task::new("t1", "job")).await;
        assert!(matches!(err, Err(OverseerError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_submitted_task_is_pending() {
        let (supervisor, _) = harness();
        supervisor.submit(Task::new("t1", "job")).await.unwrap();
        assert_eq!(supervisor.status("t1").await.unwrap(), TaskStatus::Pending);

        let stats = supervisor.statistics();
        assert_eq!(stats.total_submitted, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.tasks_by_type["job"], 1);
    }

    #[tokio::test]
    async fn test_status_of_unknown_task_is_an_error() {
        let (supervisor, _) = harness();
        assert!(supervisor.status("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_pending_task() {
        let (supervisor, _) = harness();
        supervisor.submit(Task::new("t1", "job")).await.unwrap();

        assert!(supervisor.cancel("t1").await.unwrap());
        assert_eq!(supervisor.status("t1").await.unwrap(), TaskStatus::Cancelled);

        let stats = supervisor.statistics();
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_task_is_an_error() {
        let (supervisor, _) = harness();
        assert!(supervisor.cancel("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_submit_batch_returns_ids_in_order() {
        let (supervisor, _) = harness();
        let ids = supervisor
            .submit_batch(vec![Task::new("a", "job"), Task::new("b", "job")])
            .await
            .unwrap();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(supervisor.statistics().total_submitted, 2);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (supervisor, _) = harness();
        supervisor.start().await.unwrap();
        assert!(supervisor.start().await.is_err());
        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_initial_state_is_monitoring() {
        let (supervisor, _) = harness();
        assert_eq!(supervisor.current_state(), SupervisorState::Monitoring);
        let ctx = supervisor.context();
        assert_eq!(ctx.supervisor_id, "sup-test");
        assert_eq!(ctx.error_count, 0);
    }

    #[tokio::test]
    async fn test_statistics_accounting_invariant_without_workers() {
        let (supervisor, registry) = harness();
        registry.register(AgentInfo::new("w1", "worker", AgentCapabilities::new(1)));

        for i in 0..4 {
            supervisor
                .submit(Task::new(format!("t{i}"), "job"))
                .await
                .unwrap();
        }
        supervisor.cancel("t3").await.unwrap();

        let stats = supervisor.statistics();
        assert_eq!(
            stats.total_submitted,
            stats.completed + stats.failed + stats.pending + stats.in_progress + stats.cancelled
        );
    }
}
