use crate::balancer::{BalancingStrategy, LoadBalancer};
use crate::scaler::{AutoScaler, ScalingDecision};
use crate::service::{AgentRegistry, TaskQueue, WorkerStateProvider};
use overseer_core::{AgentInfo, AgentStatus, OverseerError, OverseerResult, Task};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Bound on the rolling task-duration history.
const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Point-in-time pool counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolStatistics {
    /// Pool members.
    pub total_workers: usize,
    /// Members currently able to accept a task.
    pub available_workers: usize,
    /// Members with at least one assigned task.
    pub busy_workers: usize,
    /// Completed-task totals per member.
    pub completed_by_worker: BTreeMap<String, u64>,
    /// Rolling average over the bounded duration history.
    #[serde(with = "overseer_core::serde_millis")]
    pub average_task_duration: Duration,
}

struct PoolMetrics {
    completed_by_worker: BTreeMap<String, u64>,
    durations: VecDeque<Duration>,
    history_limit: usize,
}

impl PoolMetrics {
    fn record(&mut self, agent_id: &str, duration: Duration) {
        *self.completed_by_worker.entry(agent_id.to_string()).or_insert(0) += 1;
        if self.durations.len() == self.history_limit {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
    }

    fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.durations.iter().sum();
        total / self.durations.len() as u32
    }
}

/// Owns pool membership and resolves live worker availability.
///
/// Membership is the only state mutated here; worker records themselves are
/// owned by the registry. The membership lock is short-held: registry and
/// state-provider calls always happen on a snapshot taken after the lock is
/// released.
pub struct WorkerPool {
    registry: Arc<dyn AgentRegistry>,
    balancer: LoadBalancer,
    default_strategy: BalancingStrategy,
    state_provider: Option<Arc<dyn WorkerStateProvider>>,
    scaler: Option<Arc<dyn AutoScaler>>,
    queue: Option<Arc<dyn TaskQueue>>,
    members: Mutex<BTreeSet<String>>,
    metrics: Mutex<PoolMetrics>,
}

impl WorkerPool {
    /// Creates an empty pool over the given registry.
    pub fn new(registry: Arc<dyn AgentRegistry>) -> Self {
        Self {
            registry,
            balancer: LoadBalancer::new(),
            default_strategy: BalancingStrategy::default(),
            state_provider: None,
            scaler: None,
            queue: None,
            members: Mutex::new(BTreeSet::new()),
            metrics: Mutex::new(PoolMetrics {
                completed_by_worker: BTreeMap::new(),
                durations: VecDeque::new(),
                history_limit: DEFAULT_HISTORY_LIMIT,
            }),
        }
    }

    /// Availability is resolved through `provider` instead of the registry
    /// status field.
    pub fn with_state_provider(mut self, provider: Arc<dyn WorkerStateProvider>) -> Self {
        self.state_provider = Some(provider);
        self
    }

    /// Enables auto-scaling evaluation.
    pub fn with_auto_scaler(mut self, scaler: Arc<dyn AutoScaler>) -> Self {
        self.scaler = Some(scaler);
        self
    }

    /// Wires in the task queue so scaling evaluation sees real queue depth.
    pub fn with_task_queue(mut self, queue: Arc<dyn TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Overrides the default balancing strategy.
    pub fn with_strategy(mut self, strategy: BalancingStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Overrides the rolling duration-history bound.
    pub fn with_history_limit(self, limit: usize) -> Self {
        self.metrics.lock().history_limit = limit.max(1);
        self
    }

    /// Adds a registered agent to the pool. Fails if the registry does not
    /// know the agent.
    pub async fn add_worker(&self, agent_id: &str) -> OverseerResult<()> {
        // Registry lookup happens before the membership lock is taken.
        if self.registry.get_by_id(agent_id).await?.is_none() {
            return Err(OverseerError::Pool(format!(
                "agent {agent_id} is not registered"
            )));
        }
        self.members.lock().insert(agent_id.to_string());
        debug!(agent_id, "worker added to pool");
        Ok(())
    }

    /// Removes an agent from the pool. Fails for agents the registry does not
    /// know; membership only, the registry record is untouched.
    pub async fn remove_worker(&self, agent_id: &str) -> OverseerResult<bool> {
        if self.registry.get_by_id(agent_id).await?.is_none() {
            return Err(OverseerError::Pool(format!(
                "agent {agent_id} is not registered"
            )));
        }
        let removed = self.members.lock().remove(agent_id);
        if removed {
            debug!(agent_id, "worker removed from pool");
        }
        Ok(removed)
    }

    /// Current pool size.
    pub fn worker_count(&self) -> usize {
        self.members.lock().len()
    }

    /// True when `agent_id` is a pool member.
    pub fn contains(&self, agent_id: &str) -> bool {
        self.members.lock().contains(agent_id)
    }

    fn member_snapshot(&self) -> Vec<String> {
        self.members.lock().iter().cloned().collect()
    }

    /// Resolves the current records of all pool members, in id order.
    async fn member_records(&self) -> OverseerResult<Vec<AgentInfo>> {
        let ids = self.member_snapshot();
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(info) = self.registry.get_by_id(&id).await? {
                records.push(info);
            }
        }
        Ok(records)
    }

    /// Resolves whether one worker can accept a task right now.
    ///
    /// When a state provider is configured its reported state name governs,
    /// with the registry status as fallback; either way the live task-count
    /// check applies.
    async fn is_available(&self, info: &AgentInfo) -> OverseerResult<bool> {
        let status = match &self.state_provider {
            Some(provider) => match provider.agent_state(&info.agent_id).await? {
                Some(name) => AgentStatus::from_state_name(&name),
                None => info.status,
            },
            None => info.status,
        };
        let accepting = matches!(status, AgentStatus::Available | AgentStatus::Busy);
        Ok(accepting && info.has_spare_capacity())
    }

    /// Members currently able to accept a task. Computed, never cached.
    pub async fn available_worker_count(&self) -> OverseerResult<usize> {
        Ok(self.available_workers().await?.len())
    }

    /// Records of all members currently able to accept a task, in id order.
    pub async fn available_workers(&self) -> OverseerResult<Vec<AgentInfo>> {
        let records = self.member_records().await?;
        let mut available = Vec::new();
        for info in records {
            if self.is_available(&info).await? {
                available.push(info);
            }
        }
        Ok(available)
    }

    /// Picks an eligible worker for `task`, or `None` when no member
    /// qualifies.
    ///
    /// Eligibility is availability plus, when a capability is required (from
    /// the argument or the task itself), declaring that capability. The final
    /// pick among survivors is delegated to the load balancer.
    pub async fn get_available_worker(
        &self,
        task: Option<&Task>,
        required_capability: Option<&str>,
        strategy: Option<BalancingStrategy>,
    ) -> OverseerResult<Option<AgentInfo>> {
        let capability =
            required_capability.or_else(|| task.and_then(|t| t.required_capability.as_deref()));

        let mut candidates = self.available_workers().await?;
        if let Some(cap) = capability {
            candidates.retain(|a| a.has_capability(cap));
        }
        if candidates.is_empty() {
            return Ok(None);
        }

        let strategy = strategy.unwrap_or(self.default_strategy);
        Ok(self.balancer.select_worker(&candidates, task, strategy))
    }

    /// Records one completed task for the rolling statistics.
    pub fn record_completion(&self, agent_id: &str, duration: Duration) {
        self.metrics.lock().record(agent_id, duration);
    }

    /// Rolling average task duration over the bounded history.
    pub fn average_task_duration(&self) -> Duration {
        self.metrics.lock().average()
    }

    /// Point-in-time pool counters.
    pub async fn statistics(&self) -> OverseerResult<WorkerPoolStatistics> {
        let records = self.member_records().await?;
        let mut available = 0;
        let mut busy = 0;
        for info in &records {
            if info.current_task_count > 0 {
                busy += 1;
            }
            if self.is_available(info).await? {
                available += 1;
            }
        }
        let (completed_by_worker, average_task_duration) = {
            let metrics = self.metrics.lock();
            (metrics.completed_by_worker.clone(), metrics.average())
        };
        Ok(WorkerPoolStatistics {
            total_workers: self.worker_count(),
            available_workers: available,
            busy_workers: busy,
            completed_by_worker,
            average_task_duration,
        })
    }

    /// Asks the configured auto-scaler for a recommendation.
    ///
    /// The pool supplies its member snapshot, the queue's pending count when
    /// a queue is wired in, and the rolling average duration.
    pub async fn evaluate_auto_scaling(&self) -> OverseerResult<ScalingDecision> {
        let Some(scaler) = &self.scaler else {
            return Ok(ScalingDecision::none("Auto-scaling is not enabled"));
        };
        let records = self.member_records().await?;
        let pending = match &self.queue {
            Some(queue) => queue.pending_count().await?,
            None => 0,
        };
        Ok(scaler.evaluate(&records, pending, self.average_task_duration()))
    }
}
