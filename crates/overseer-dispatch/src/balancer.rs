use overseer_core::{AgentInfo, Task};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named worker-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancingStrategy {
    /// Lowest load ratio wins; ties broken by agent id. Deterministic.
    #[default]
    PriorityBased,
    /// Cycles through candidates; the cursor is balancer state.
    RoundRobin,
    /// Picks the candidate selected longest ago by this balancer.
    LeastRecentlyUsed,
}

/// Pure selection over pre-filtered candidates.
///
/// Callers must have already filtered for availability and capability; the
/// balancer only picks among survivors. Selection is deterministic for a given
/// strategy state and candidate list.
pub struct LoadBalancer {
    round_robin_cursor: Mutex<usize>,
    // agent id -> monotonic tick of last selection
    last_selected: Mutex<HashMap<String, u64>>,
    tick: Mutex<u64>,
}

impl LoadBalancer {
    /// Creates a balancer with fresh strategy state.
    pub fn new() -> Self {
        Self {
            round_robin_cursor: Mutex::new(0),
            last_selected: Mutex::new(HashMap::new()),
            tick: Mutex::new(0),
        }
    }

    /// Picks one worker from `candidates` under the given strategy.
    ///
    /// Returns `None` only for an empty candidate list.
    pub fn select_worker(
        &self,
        candidates: &[AgentInfo],
        _task: Option<&Task>,
        strategy: BalancingStrategy,
    ) -> Option<AgentInfo> {
        if candidates.is_empty() {
            return None;
        }
        let picked = match strategy {
            BalancingStrategy::PriorityBased => Self::pick_least_loaded(candidates),
            BalancingStrategy::RoundRobin => {
                let mut cursor = self.round_robin_cursor.lock();
                let picked = &candidates[*cursor % candidates.len()];
                *cursor = cursor.wrapping_add(1);
                picked
            }
            BalancingStrategy::LeastRecentlyUsed => {
                let last = self.last_selected.lock();
                candidates.iter().min_by(|x, y| {
                    let x_tick = last.get(&x.agent_id).copied().unwrap_or(0);
                    let y_tick = last.get(&y.agent_id).copied().unwrap_or(0);
                    x_tick
                        .cmp(&y_tick)
                        .then_with(|| x.agent_id.cmp(&y.agent_id))
                })?
            }
        };
        self.mark_selected(&picked.agent_id);
        Some(picked.clone())
    }

    fn pick_least_loaded(candidates: &[AgentInfo]) -> &AgentInfo {
        candidates
            .iter()
            .min_by(|a, b| {
                a.load_ratio()
                    .partial_cmp(&b.load_ratio())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.agent_id.cmp(&b.agent_id))
            })
            .unwrap_or(&candidates[0])
    }

    fn mark_selected(&self, agent_id: &str) {
        let mut tick = self.tick.lock();
        *tick += 1;
        self.last_selected
            .lock()
            .insert(agent_id.to_string(), *tick);
    }
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use overseer_core::AgentCapabilities;

    fn worker(id: &str, current: u32, max: u32) -> AgentInfo {
        let mut agent = AgentInfo::new(id, "worker", AgentCapabilities::new(max));
        agent.current_task_count = current;
        agent
    }

    #[test]
    fn test_empty_candidates_yields_none() {
        let balancer = LoadBalancer::new();
        assert!(balancer
            .select_worker(&[], None, BalancingStrategy::PriorityBased)
            .is_none());
    }

    #[test]
    fn test_priority_based_prefers_lowest_load_ratio() {
        let balancer = LoadBalancer::new();
        let candidates = vec![worker("w1", 3, 4), worker("w2", 1, 4), worker("w3", 2, 4)];
        let picked = balancer
            .select_worker(&candidates, None, BalancingStrategy::PriorityBased)
            .unwrap();
        assert_eq!(picked.agent_id, "w2");
    }

    #[test]
    fn test_priority_based_tie_breaks_by_agent_id() {
        let balancer = LoadBalancer::new();
        let candidates = vec![worker("w2", 1, 4), worker("w1", 1, 4)];
        let picked = balancer
            .select_worker(&candidates, None, BalancingStrategy::PriorityBased)
            .unwrap();
        assert_eq!(picked.agent_id, "w1");
    }

    #[test]
    fn test_priority_based_is_deterministic() {
        let balancer = LoadBalancer::new();
        let candidates = vec![worker("w1", 2, 4), worker("w2", 1, 2), worker("w3", 0, 1)];
        let first = balancer
            .select_worker(&candidates, None, BalancingStrategy::PriorityBased)
            .unwrap();
        for _ in 0..5 {
            let again = balancer
                .select_worker(&candidates, None, BalancingStrategy::PriorityBased)
                .unwrap();
            assert_eq!(again.agent_id, first.agent_id);
        }
    }

    #[test]
    fn test_round_robin_cycles() {
        let balancer = LoadBalancer::new();
        let candidates = vec![worker("w1", 0, 1), worker("w2", 0, 1), worker("w3", 0, 1)];
        let picks: Vec<String> = (0..6)
            .map(|_| {
                balancer
                    .select_worker(&candidates, None, BalancingStrategy::RoundRobin)
                    .unwrap()
                    .agent_id
            })
            .collect();
        assert_eq!(picks, ["w1", "w2", "w3", "w1", "w2", "w3"]);
    }

    #[test]
    fn test_least_recently_used_rotates() {
        let balancer = LoadBalancer::new();
        let candidates = vec![worker("w1", 0, 1), worker("w2", 0, 1)];

        let first = balancer
            .select_worker(&candidates, None, BalancingStrategy::LeastRecentlyUsed)
            .unwrap();
        let second = balancer
            .select_worker(&candidates, None, BalancingStrategy::LeastRecentlyUsed)
            .unwrap();
        assert_ne!(first.agent_id, second.agent_id);
    }

    #[test]
    fn test_strategy_default_is_priority_based() {
        assert_eq!(BalancingStrategy::default(), BalancingStrategy::PriorityBased);
    }
}
