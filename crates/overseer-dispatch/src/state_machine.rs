use overseer_core::{OverseerError, OverseerResult, SupervisorContext, SupervisorState};
use tracing::trace;

/// Explicit state-machine seam between the supervisor and any state
/// implementation.
///
/// A small injected interface instead of runtime member discovery: both the
/// supervisor and concrete machines depend on this trait, nothing is resolved
/// dynamically, and a missing implementation is a compile error rather than a
/// runtime failure.
pub trait StateMachine: Send {
    /// The state the machine is currently in.
    fn current_state(&self) -> SupervisorState;

    /// Moves to `to`, updating the shared context. Illegal transitions are
    /// errors and leave the state unchanged.
    fn transition(
        &mut self,
        to: SupervisorState,
        ctx: &mut SupervisorContext,
    ) -> OverseerResult<()>;
}

/// Transition-table state machine over the supervisor lifecycle.
///
/// Legal moves:
/// `Monitoring → Analyzing`, `Analyzing → Delegating`, `Delegating → Waiting`,
/// `Waiting → Monitoring`, `* → Error`, `Error → Monitoring`. There is no
/// terminal state. Transitioning to the current state is a no-op.
pub struct TransitionTable {
    state: SupervisorState,
}

impl TransitionTable {
    /// Starts in [`SupervisorState::Monitoring`].
    pub fn new() -> Self {
        Self {
            state: SupervisorState::Monitoring,
        }
    }

    fn is_legal(from: SupervisorState, to: SupervisorState) -> bool {
        use SupervisorState::*;
        matches!(
            (from, to),
            (Monitoring, Analyzing)
                | (Analyzing, Delegating)
                | (Delegating, Waiting)
                | (Waiting, Monitoring)
                | (Error, Monitoring)
                | (_, Error)
        )
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine for TransitionTable {
    fn current_state(&self) -> SupervisorState {
        self.state
    }

    fn transition(
        &mut self,
        to: SupervisorState,
        ctx: &mut SupervisorContext,
    ) -> OverseerResult<()> {
        if to == self.state {
            return Ok(());
        }
        if !Self::is_legal(self.state, to) {
            return Err(OverseerError::Supervisor(format!(
                "illegal transition {} -> {}",
                self.state, to
            )));
        }
        trace!(
            supervisor_id = %ctx.supervisor_id,
            from = %self.state,
            to = %to,
            "state transition"
        );
        self.state = to;
        Ok(())
    }
}
