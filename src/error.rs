use thiserror::Error;

/// Error taxonomy for the push channel client.
///
/// Only `Config` ever reaches the caller synchronously (at construction).
/// Everything else is absorbed by the reconnect loop or logged and dropped
/// by the frame router.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")] Config(String),

    #[error("Transport error: {0}")] Transport(String),

    #[error("Signature error: {0}")] Signature(String),

    #[error("Protocol error: {0}")] Protocol(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether the reconnect loop should retry after this error. Transport
    /// and protocol errors are transient; configuration and signature errors
    /// would fail identically on every attempt.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Transport(_) => true,
            ClientError::Protocol(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(!ClientError::Config("bad url".into()).is_recoverable());
        assert!(ClientError::Transport("reset".into()).is_recoverable());
    }
}
