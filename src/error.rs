use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AsklineError {
    #[error("prompt text is empty")]
    EmptyPrompt,

    #[error("prompt text too long: {len} chars (max {max})")]
    PromptTooLong { len: usize, max: usize },

    #[error("queued prompt not found: {id}")]
    PromptNotFound { id: String },

    #[error("reorder index out of range: from={from}, to={to}, len={len}")]
    ReorderOutOfRange { from: usize, to: usize, len: usize },

    #[error("no ui surface attached")]
    SurfaceUnavailable,

    #[error("a request is already pending: {id}")]
    RequestInFlight { id: String },

    #[error("no pending request matches id {id}")]
    StaleCorrelation { id: String },

    #[error("no answer within {timeout_secs}s")]
    AnswerTimeout { timeout_secs: u64 },

    #[error("broker disposed")]
    Disposed,

    #[error("history entry not found: {id}")]
    HistoryEntryNotFound { id: String },

    #[error("invalid classifier rule: {reason}")]
    InvalidPattern { reason: String },

    #[error("config parse error in {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("ipc error: {reason}")]
    Ipc { reason: String },

    #[error("socket not found at {path}")]
    SocketNotFound { path: PathBuf },

    #[error("broker timeout after {timeout_secs}s")]
    BrokerTimeout { timeout_secs: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AsklineError {
    /// Input rejected before any state change; shown to the human as a warning.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AsklineError::EmptyPrompt
                | AsklineError::PromptTooLong { .. }
                | AsklineError::PromptNotFound { .. }
                | AsklineError::ReorderOutOfRange { .. }
                | AsklineError::HistoryEntryNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AsklineError>;
