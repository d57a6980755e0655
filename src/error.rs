/// Fatal error surfaced to the binary: carries the process exit code.
///
/// Exit codes:
/// - `2` malformed input or configuration
/// - `3` nothing to compute (no valid entities)
/// - `4` I/O or export failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Top-level payload does not match the expected shape.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        Self::new(4, format!("{context}: {err}"))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

/// Reference-data retrieval failure.
///
/// Never fatal: the resolver downgrades the affected timeframe to
/// `Tier::Unavailable` and keeps going.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("reference provider unavailable: {0}")]
    Unavailable(String),

    #[error("reference request timed out for {0}")]
    Timeout(String),

    #[error("reference payload malformed: {0}")]
    Malformed(String),
}
