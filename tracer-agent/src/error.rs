//! Error type shared by the tracer's lifecycle operations.

/// Errors surfaced by `Tracer` lifecycle operations and configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TracerError {
    /// A session was started twice, or stopped while not running
    InvalidState(String),
    /// A lifecycle operation was given an unusable argument, such as a zero interval
    InvalidArgument(String),
    /// The sampling boundary refused a subscribe/unsubscribe call
    Sampling(String),
    /// Environment configuration could not be parsed
    Config(String),
}

impl TracerError {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, TracerError::InvalidState(_))
    }
}

impl std::fmt::Display for TracerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TracerError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            TracerError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            TracerError::Sampling(msg) => write!(f, "Sampling boundary error: {}", msg),
            TracerError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TracerError {}
