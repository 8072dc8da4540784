//! Task-dispatch core for the Overseer multi-agent platform.
//!
//! A [`Supervisor`] accepts units of work, matches them to available worker
//! agents by capability and load, tracks their lifecycle through an explicit
//! state machine, and reports aggregate statistics. Worker membership and
//! availability live in the [`WorkerPool`]; the final pick among eligible
//! workers is delegated to the [`LoadBalancer`], and scaling recommendations
//! to an [`AutoScaler`].
//!
//! The durable task store, priority queue, agent registry, and message bus are
//! injectable collaborators (see [`service`]); in-memory implementations for
//! tests and single-process deployments live in [`memory`].
//!
//! # Main types
//!
//! - [`Supervisor`] — Dispatch loop, lifecycle state machine, and task operations.
//! - [`WorkerPool`] — Pool membership and live availability resolution.
//! - [`LoadBalancer`] / [`BalancingStrategy`] — Worker selection among eligible candidates.
//! - [`AutoScaler`] / [`ThresholdAutoScaler`] — Scaling recommendations.
//! - [`SupervisorConfig`] — Timing and bookkeeping knobs.

/// Worker selection strategies.
pub mod balancer;
/// Supervisor configuration.
pub mod config;
/// In-memory collaborator implementations.
pub mod memory;
/// Worker pool membership and availability.
pub mod pool;
/// Auto-scaling contract and default threshold policy.
pub mod scaler;
/// Collaborator traits (registry, queue, store, bus, router, state provider).
pub mod service;
/// Supervisor lifecycle state machine.
pub mod state_machine;
/// The supervisor and its dispatch loop.
pub mod supervisor;

pub use balancer::{BalancingStrategy, LoadBalancer};
pub use config::SupervisorConfig;
pub use memory::{
    InMemoryAgentRegistry, InMemoryMessageBus, InMemoryTaskQueue, InMemoryTaskStore,
};
pub use pool::{WorkerPool, WorkerPoolStatistics};
pub use scaler::{
    AutoScaler, AutoScalerConfig, ScalingAction, ScalingDecision, ThresholdAutoScaler,
};
pub use service::{
    AgentRegistry, MessageBus, MessageHandler, TaskQueue, TaskRouter, TaskStore,
    WorkerStateProvider,
};
pub use state_machine::{StateMachine, TransitionTable};
pub use supervisor::{Supervisor, SupervisorStatistics};
