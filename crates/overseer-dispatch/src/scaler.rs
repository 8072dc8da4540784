use overseer_core::AgentInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recommended scaling action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAction {
    /// Keep the current worker count.
    #[default]
    None,
    /// Add workers.
    ScaleUp,
    /// Remove workers.
    ScaleDown,
}

/// A scaling recommendation, created fresh on every evaluation and never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingDecision {
    /// What to do.
    pub action: ScalingAction,
    /// How many workers to add or remove.
    pub worker_count: u32,
    /// Human-readable justification.
    pub reason: String,
}

impl ScalingDecision {
    /// A no-op decision with the given reason.
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            action: ScalingAction::None,
            worker_count: 0,
            reason: reason.into(),
        }
    }
}

/// Scaling decision policy.
///
/// `evaluate` must be a pure function of its inputs so it can be called
/// repeatedly without state drift; cooldown and hysteresis bookkeeping belong
/// to the caller.
pub trait AutoScaler: Send + Sync {
    /// Produces a recommendation from the current pool snapshot, queue depth,
    /// and recent average task duration.
    fn evaluate(
        &self,
        workers: &[AgentInfo],
        pending_task_count: usize,
        average_task_duration: Duration,
    ) -> ScalingDecision;
}

/// Thresholds for [`ThresholdAutoScaler`]. All knobs are explicit
/// configuration; nothing is read from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScalerConfig {
    /// Scale up when pending tasks exceed spare capacity times this factor.
    pub scale_up_queue_factor: f64,
    /// Scale down when at least this fraction of workers is idle and the
    /// queue is empty.
    pub scale_down_idle_ratio: f64,
    /// Never recommend shrinking below this many workers.
    pub min_workers: u32,
    /// Never recommend growing beyond this many workers.
    pub max_workers: u32,
    /// Average task durations above this also trigger a scale-up while work
    /// is queued.
    #[serde(with = "overseer_core::serde_millis")]
    pub slow_task_threshold: Duration,
}

impl Default for AutoScalerConfig {
    fn default() -> Self {
        Self {
            scale_up_queue_factor: 2.0,
            scale_down_idle_ratio: 0.5,
            min_workers: 1,
            max_workers: 16,
            slow_task_threshold: Duration::from_secs(30),
        }
    }
}

/// Queue-depth and idleness based scaling policy.
pub struct ThresholdAutoScaler {
    config: AutoScalerConfig,
}

impl ThresholdAutoScaler {
    /// Creates a scaler with the given thresholds.
    pub fn new(config: AutoScalerConfig) -> Self {
        Self { config }
    }
}

impl Default for ThresholdAutoScaler {
    fn default() -> Self {
        Self::new(AutoScalerConfig::default())
    }
}

impl AutoScaler for ThresholdAutoScaler {
    fn evaluate(
        &self,
        workers: &[AgentInfo],
        pending_task_count: usize,
        average_task_duration: Duration,
    ) -> ScalingDecision {
        let total = workers.len() as u32;
        let spare_capacity: u32 = workers
            .iter()
            .map(|w| {
                w.capabilities
                    .max_concurrent_tasks
                    .saturating_sub(w.current_task_count)
            })
            .sum();
        let idle = workers.iter().filter(|w| w.current_task_count == 0).count();

        let backlog_threshold =
            (f64::from(spare_capacity) * self.config.scale_up_queue_factor).ceil() as usize;
        let queue_pressure = pending_task_count > backlog_threshold;
        let slow_tasks =
            pending_task_count > 0 && average_task_duration > self.config.slow_task_threshold;

        if (queue_pressure || slow_tasks) && total < self.config.max_workers {
            let reason = if queue_pressure {
                format!(
                    "{pending_task_count} pending tasks exceed spare capacity {spare_capacity}"
                )
            } else {
                format!(
                    "average task duration {}ms above threshold with work queued",
                    average_task_duration.as_millis()
                )
            };
            return ScalingDecision {
                action: ScalingAction::ScaleUp,
                worker_count: (self.config.max_workers - total).min(1.max(total / 2)),
                reason,
            };
        }

        if pending_task_count == 0 && total > self.config.min_workers {
            let idle_ratio = idle as f64 / total.max(1) as f64;
            if idle_ratio >= self.config.scale_down_idle_ratio {
                let removable = total - self.config.min_workers;
                return ScalingDecision {
                    action: ScalingAction::ScaleDown,
                    worker_count: removable.min(idle as u32).max(1),
                    reason: format!("{idle} of {total} workers idle with an empty queue"),
                };
            }
        }

        ScalingDecision::none("load within configured thresholds")
    }
}
