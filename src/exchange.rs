use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::classify::{Classification, ParsedChoice};

/// Lifecycle of a single question. The only transition is `Pending -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Completed,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Pending => write!(f, "pending"),
            EntryStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A pre-staged answer waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedPrompt {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Opaque file or image reference handed through from the UI to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub flags: serde_json::Map<String, serde_json::Value>,
}

/// One question/answer exchange between the agent and the human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallEntry {
    /// Correlation id linking the question to its answer.
    pub id: String,

    pub question_text: String,

    /// Empty while pending.
    pub response_text: String,

    /// When the question was asked.
    pub timestamp: DateTime<Utc>,

    /// True when the answer came from the prompt queue instead of a live human.
    pub from_queue: bool,

    pub status: EntryStatus,

    /// The broker session that produced this entry.
    pub session_id: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ToolCallEntry {
    pub fn pending(id: String, question: &str, session_id: &str) -> Self {
        Self {
            id,
            question_text: question.to_string(),
            response_text: String::new(),
            timestamp: Utc::now(),
            from_queue: false,
            status: EntryStatus::Pending,
            session_id: session_id.to_string(),
            attachments: Vec::new(),
        }
    }

    /// An exchange answered on the spot from the queue.
    pub fn auto_resolved(id: String, question: &str, answer: &str, session_id: &str) -> Self {
        Self {
            id,
            question_text: question.to_string(),
            response_text: answer.to_string(),
            timestamp: Utc::now(),
            from_queue: true,
            status: EntryStatus::Completed,
            session_id: session_id.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }
}

/// What `ask` hands back to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub value: String,
    pub attachments: Vec<Attachment>,
    pub from_queue: bool,
}

/// Payload of the outbound `pendingQuestion` notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingQuestion {
    pub id: String,
    pub question: String,
    pub classification: Classification,
}

impl PendingQuestion {
    pub fn from_entry(entry: &ToolCallEntry) -> Self {
        Self {
            id: entry.id.clone(),
            question: entry.question_text.clone(),
            classification: crate::classify::classify(&entry.question_text),
        }
    }
}

/// Allocate a fresh correlation id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
