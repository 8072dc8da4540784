use thiserror::Error;

/// Convenience alias for `Result<T, OverseerError>`.
pub type OverseerResult<T> = Result<T, OverseerError>;

/// Top-level error type for the Overseer dispatch core.
///
/// Each variant corresponds to a collaborator or subsystem that can fail.
#[derive(Debug, Error)]
pub enum OverseerError {
    /// An error from the agent registry (unknown agent, update failure).
    #[error("Registry error: {0}")]
    Registry(String),

    /// An error from the pending-task queue.
    #[error("Queue error: {0}")]
    Queue(String),

    /// An error from the durable task store.
    #[error("Store error: {0}")]
    Store(String),

    /// An error from the message bus (send or subscription failure).
    #[error("Bus error: {0}")]
    Bus(String),

    /// An error from the worker pool (membership, availability resolution).
    #[error("Pool error: {0}")]
    Pool(String),

    /// An error raised by the supervisor itself, including illegal
    /// state-machine transitions.
    #[error("Supervisor error: {0}")]
    Supervisor(String),

    /// An error in configuration validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An invalid argument supplied by the caller (empty task id, duplicate
    /// submission). Fails fast and synchronously; never enters the loop.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serialization / deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO failure from an underlying collaborator.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OverseerError::Registry("agent w1 not found".into());
        assert_eq!(err.to_string(), "Registry error: agent w1 not found");
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = OverseerError::InvalidArgument("task id must not be empty".into());
        assert!(err.to_string().starts_with("Invalid argument"));
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: OverseerError = parse_err.into();
        assert!(matches!(err, OverseerError::Serialization(_)));
    }
}
