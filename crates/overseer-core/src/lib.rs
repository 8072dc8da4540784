//! Core types and error definitions for the Overseer task-dispatch platform.
//!
//! This crate provides the foundational data model shared across Overseer
//! crates: the unified error enum, the bus message envelope, tasks and their
//! results, worker agent records, and the supervisor state enumeration.
//!
//! # Main types
//!
//! - [`OverseerError`] — Unified error enum for all Overseer subsystems.
//! - [`OverseerResult`] — Convenience alias for `Result<T, OverseerError>`.
//! - [`Task`] / [`TaskResult`] / [`TaskStatus`] — The unit of work and its lifecycle.
//! - [`AgentInfo`] / [`AgentStatus`] / [`AgentCapabilities`] — Worker agent records.
//! - [`MessageEnvelope`] / [`MessageType`] — Typed bus messages.
//! - [`SupervisorState`] / [`SupervisorContext`] — Dispatch-loop state machine data.

/// Worker agent records, status, and capabilities.
pub mod agent;
/// Unified error type.
pub mod error;
/// Bus message envelope and message types.
pub mod message;
/// Duration-as-milliseconds serde adapter.
pub mod serde_millis;
/// Supervisor state enumeration and transition context.
pub mod state;
/// Tasks, results, and lifecycle status.
pub mod task;

pub use agent::{AgentCapabilities, AgentInfo, AgentStatus};
pub use error::{OverseerError, OverseerResult};
pub use message::{MessageEnvelope, MessageType};
pub use state::{SupervisorContext, SupervisorState};
pub use task::{Task, TaskResult, TaskStatus};
