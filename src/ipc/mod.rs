pub mod socket_client;
pub mod socket_server;
pub mod ui_bridge;

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::exchange::{Attachment, QueuedPrompt, ToolCallEntry};

/// Request sent from the agent side to the broker over the agent socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub question: String,
}

/// Response to the agent. An empty `response` means no answer was obtained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub response: String,
    pub attachments: Vec<String>,
}

/// Messages from the UI surface to the broker, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiCommand {
    Submit {
        /// Correlation id echoed from `pendingQuestion`; the current request when absent.
        #[serde(default)]
        id: Option<String>,
        value: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
    },
    AddQueuePrompt {
        text: String,
        #[serde(default)]
        id: Option<String>,
    },
    RemoveQueuePrompt {
        id: String,
    },
    EditQueuePrompt {
        id: String,
        text: String,
    },
    ReorderQueue {
        from: usize,
        to: usize,
    },
    ToggleQueue {
        enabled: bool,
    },
    ClearQueue,
    Ready,
    ClearHistory,
    RemoveHistoryEntry {
        id: String,
    },
}

/// Notifications from the broker to the UI surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    QueueUpdated {
        items: Vec<QueuedPrompt>,
        enabled: bool,
    },
    PendingQuestion {
        id: String,
        question: String,
        classification: Classification,
    },
    ExchangeCompleted {
        entry: ToolCallEntry,
    },
    CurrentSessionUpdated {
        entries: Vec<ToolCallEntry>,
    },
    PersistedHistoryUpdated {
        entries: Vec<ToolCallEntry>,
    },
    Warning {
        message: String,
    },
}

impl UiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UiEvent::QueueUpdated { .. } => "queueUpdated",
            UiEvent::PendingQuestion { .. } => "pendingQuestion",
            UiEvent::ExchangeCompleted { .. } => "exchangeCompleted",
            UiEvent::CurrentSessionUpdated { .. } => "currentSessionUpdated",
            UiEvent::PersistedHistoryUpdated { .. } => "persistedHistoryUpdated",
            UiEvent::Warning { .. } => "warning",
        }
    }
}

impl From<crate::exchange::PendingQuestion> for UiEvent {
    fn from(q: crate::exchange::PendingQuestion) -> Self {
        UiEvent::PendingQuestion {
            id: q.id,
            question: q.question,
            classification: q.classification,
        }
    }
}
