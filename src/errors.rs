use thiserror::Error;

/// Stable, machine-matchable error classification.
///
/// Every [`EngineError`] maps to exactly one `ErrorKind` via [`EngineError::kind`].
/// Callers that need to branch on failure type (the CLI's exit-code mapping, the
/// retry loop's "is this worth retrying" check) match on the kind, never on the
/// error's `Display` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    EmptyFile,
    ProcessingAlreadyComplete,
    FileTooLarge,
    NotFound,
    TargetExists,
    SourceTargetSame,
    AnotherInstanceProcessing,
    LlmApiError,
    TimeoutError,
    NetworkError,
    NullResponseBody,
    StreamPrematureEnd,
    AbortErr,
    InvalidConfig,
    TokenizerNotFound,
    PoolShuttingDown,
    PoolJobCancelled,
    Io,
}

/// The central error type for the batch engine.
///
/// Mirrors the source's layered-enum shape (one variant per failure domain)
/// but flattened to a single enum, since the engine has no agent/tool/safety
/// layering to preserve.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("source file is empty after normalization")]
    EmptyFile,

    #[error("processing already complete")]
    ProcessingAlreadyComplete,

    #[error("source file exceeds the maximum allowed size")]
    FileTooLarge,

    #[error("{0}: no such file or directory")]
    NotFound(std::path::PathBuf),

    #[error("target file already exists: {0}")]
    TargetExists(std::path::PathBuf),

    #[error("source and target resolve to the same file")]
    SourceTargetSame,

    #[error("another instance is already processing this source")]
    AnotherInstanceProcessing,

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    TimeoutError(std::time::Duration),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("response body was null or empty")]
    NullResponseBody,

    #[error("stream ended before a terminal event was received")]
    StreamPrematureEnd,

    #[error("aborted: {0}")]
    AbortErr(String),

    #[error("invalid configuration for field '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    #[error("tokenizer not found: {0}")]
    TokenizerNotFound(String),

    #[error("tokenizer pool is shutting down")]
    PoolShuttingDown,

    #[error("tokenizer job was cancelled")]
    PoolJobCancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::EmptyFile => ErrorKind::EmptyFile,
            EngineError::ProcessingAlreadyComplete => ErrorKind::ProcessingAlreadyComplete,
            EngineError::FileTooLarge => ErrorKind::FileTooLarge,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::TargetExists(_) => ErrorKind::TargetExists,
            EngineError::SourceTargetSame => ErrorKind::SourceTargetSame,
            EngineError::AnotherInstanceProcessing => ErrorKind::AnotherInstanceProcessing,
            EngineError::LlmApiError { .. } => ErrorKind::LlmApiError,
            EngineError::TimeoutError(_) => ErrorKind::TimeoutError,
            EngineError::NetworkError(_) => ErrorKind::NetworkError,
            EngineError::NullResponseBody => ErrorKind::NullResponseBody,
            EngineError::StreamPrematureEnd => ErrorKind::StreamPrematureEnd,
            EngineError::AbortErr(_) => ErrorKind::AbortErr,
            EngineError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
            EngineError::TokenizerNotFound(_) => ErrorKind::TokenizerNotFound,
            EngineError::PoolShuttingDown => ErrorKind::PoolShuttingDown,
            EngineError::PoolJobCancelled => ErrorKind::PoolJobCancelled,
            EngineError::Io(_) | EngineError::Json(_) | EngineError::Other(_) => ErrorKind::Io,
        }
    }

    /// True for errors the retry loop should treat as transient (worth another attempt).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LlmApiError | ErrorKind::TimeoutError | ErrorKind::NetworkError | ErrorKind::NullResponseBody
        )
    }

    /// True if this error represents cancellation rather than failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.kind(), ErrorKind::AbortErr)
    }
}
