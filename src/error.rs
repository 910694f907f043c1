use thiserror::Error;

/// Main error type for the training controller
#[derive(Error, Debug)]
pub enum TemporaError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Collaborator errors
    #[error("Data provider error: {0}")]
    Provider(String),

    #[error("Data provider returned an empty batch")]
    EmptyBatch,

    #[error("Execution session error: {0}")]
    Session(String),

    #[error("Summary error: {0}")]
    Summary(String),

    #[error("Worker failure: {0}")]
    Worker(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Fatal fault during controller construction or `process()`. The
    /// controller performs no recovery; the operator interrupts and the
    /// external process supervisor restarts the worker.
    #[error("{context}\n\nPress `Ctrl-C` for a clean exit; the process supervisor will restart this worker from the latest shared parameters.")]
    Fatal {
        context: String,
        #[source]
        source: Box<TemporaError>,
    },

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TemporaError {
    /// Wrap a fault into the fatal, operator-facing variant. Already-fatal
    /// errors pass through unchanged so context is attached exactly once.
    pub fn into_fatal(self, context: impl Into<String>) -> Self {
        match self {
            fatal @ TemporaError::Fatal { .. } => fatal,
            other => TemporaError::Fatal {
                context: context.into(),
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for TemporaError
pub type Result<T> = std::result::Result<T, TemporaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_wraps_once() {
        let inner = TemporaError::Provider("feed gone".to_string());
        let fatal = inner.into_fatal("process() fault in worker 3");
        let again = fatal.into_fatal("outer context");

        match again {
            TemporaError::Fatal { context, source } => {
                assert_eq!(context, "process() fault in worker 3");
                assert!(matches!(*source, TemporaError::Provider(_)));
            }
            other => panic!("expected Fatal, got {other:?}"),
        }
    }

    #[test]
    fn test_fatal_message_carries_operator_hint() {
        let err = TemporaError::EmptyBatch.into_fatal("worker 0");
        let msg = err.to_string();
        assert!(msg.contains("worker 0"));
        assert!(msg.contains("Ctrl-C"));
    }
}
