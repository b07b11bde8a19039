pub mod debounce;
pub mod json;
pub mod memory;
pub mod persistence;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::exchange::{QueuedPrompt, ToolCallEntry};

pub use debounce::{DebouncedWriter, WriterState};
pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use persistence::PersistenceStore;

/// The two documents the broker keeps on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    QueueState,
    ExchangeHistory,
}

impl DocumentKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            DocumentKind::QueueState => "queue-state.json",
            DocumentKind::ExchangeHistory => "exchange-history.json",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::QueueState => write!(f, "queue-state"),
            DocumentKind::ExchangeHistory => write!(f, "exchange-history"),
        }
    }
}

/// Backend for loading and saving raw documents.
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it has never been written.
    fn read(&self, kind: DocumentKind) -> Result<Option<String>>;

    /// Replace a document's contents.
    fn write(&self, kind: DocumentKind, contents: &str) -> Result<()>;
}

/// Persisted prompt queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub queue: Vec<QueuedPrompt>,
    pub enabled: bool,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            enabled: true,
        }
    }
}

/// Persisted cross-session history, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub history: Vec<ToolCallEntry>,
}
