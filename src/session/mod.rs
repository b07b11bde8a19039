pub mod persisted;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::{AsklineError, Result};
use crate::exchange::{Attachment, EntryStatus, ToolCallEntry};
use crate::storage::{HistoryDocument, PersistenceStore};

pub use persisted::DEFAULT_MAX_HISTORY;

/// Exchanges of the running session plus the history carried across sessions.
///
/// The current-session view is unfiltered and includes the live pending
/// entry. The persisted view only ever holds completed entries.
pub struct SessionHistory {
    session_id: String,
    /// Entry ids, most recent first.
    order: VecDeque<String>,
    by_id: HashMap<String, ToolCallEntry>,
    persisted: Vec<ToolCallEntry>,
    max_history: usize,
    persistence: Arc<PersistenceStore>,
}

impl SessionHistory {
    pub fn new(
        session_id: String,
        loaded: HistoryDocument,
        max_history: usize,
        persistence: Arc<PersistenceStore>,
    ) -> Self {
        Self {
            session_id,
            order: VecDeque::new(),
            by_id: HashMap::new(),
            persisted: persisted::sanitize_loaded(loaded.history, max_history),
            max_history,
            persistence,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Add a new entry at the front of the session.
    pub fn record(&mut self, entry: ToolCallEntry) {
        if self.by_id.contains_key(&entry.id) {
            self.order.retain(|id| id != &entry.id);
        }
        self.order.push_front(entry.id.clone());
        self.by_id.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&ToolCallEntry> {
        self.by_id.get(id)
    }

    /// Move a pending entry to `Completed`. Returns `None` if the id is
    /// unknown or the entry was already completed.
    pub fn complete(
        &mut self,
        id: &str,
        response: &str,
        attachments: Vec<Attachment>,
        from_queue: bool,
    ) -> Option<ToolCallEntry> {
        let entry = self.by_id.get_mut(id)?;
        if entry.status != EntryStatus::Pending {
            return None;
        }
        entry.status = EntryStatus::Completed;
        entry.response_text = response.to_string();
        entry.attachments = attachments;
        entry.from_queue = from_queue;
        Some(entry.clone())
    }

    /// Drop a still-pending entry, e.g. after its question timed out.
    pub fn discard_pending(&mut self, id: &str) -> Option<ToolCallEntry> {
        if !self.by_id.get(id).is_some_and(ToolCallEntry::is_pending) {
            return None;
        }
        self.order.retain(|e| e != id);
        self.by_id.remove(id)
    }

    pub fn pending_count(&self) -> usize {
        self.by_id.values().filter(|e| e.is_pending()).count()
    }

    /// Current session, most recent first, pending entry included.
    pub fn current_session(&self) -> Vec<ToolCallEntry> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }

    /// Cross-session history, most recent first.
    pub fn persisted(&self) -> &[ToolCallEntry] {
        &self.persisted
    }

    /// Fold completed session entries into the persisted history and write it
    /// synchronously. Safe to call more than once: ids already persisted are
    /// skipped.
    pub fn persist_session(&mut self) -> Result<usize> {
        let session = self.current_session();
        let added = persisted::merge_session(&mut self.persisted, &session, self.max_history);
        self.save()?;
        tracing::info!(
            "persisted {} exchange(s); history holds {}",
            added,
            self.persisted.len()
        );
        Ok(added)
    }

    pub fn clear_persisted(&mut self) -> Result<()> {
        self.persisted.clear();
        self.save()
    }

    pub fn remove_persisted(&mut self, id: &str) -> Result<()> {
        let before = self.persisted.len();
        self.persisted.retain(|e| e.id != id);
        if self.persisted.len() == before {
            return Err(AsklineError::HistoryEntryNotFound { id: id.to_string() });
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        let doc = HistoryDocument {
            history: self.persisted.clone(),
        };
        self.persistence.save_history_now(&doc).map_err(|e| {
            tracing::error!("failed to save exchange history: {}", e);
            e
        })
    }
}
