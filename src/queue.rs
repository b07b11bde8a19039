use std::sync::Arc;

use chrono::Utc;

use crate::error::{AsklineError, Result};
use crate::exchange::{new_id, QueuedPrompt};
use crate::storage::{PersistenceStore, QueueState};

/// Default ceiling on a single queued prompt.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 100_000;

/// Ordered list of answers the human staged ahead of time.
///
/// Consumption is FIFO from the head. Every successful mutation schedules a
/// debounced save; a rejected one leaves the queue untouched.
pub struct PromptQueue {
    items: Vec<QueuedPrompt>,
    enabled: bool,
    max_prompt_chars: usize,
    persistence: Arc<PersistenceStore>,
}

impl PromptQueue {
    /// Build from a loaded state. Stored prompts that no longer validate are dropped.
    pub fn new(state: QueueState, persistence: Arc<PersistenceStore>, max_prompt_chars: usize) -> Self {
        let loaded = state.queue.len();
        let items: Vec<QueuedPrompt> = state
            .queue
            .into_iter()
            .filter(|p| validate_text(&p.text, max_prompt_chars).is_ok())
            .collect();
        if items.len() != loaded {
            tracing::warn!(
                "dropped {} invalid queued prompt(s) on load",
                loaded - items.len()
            );
        }
        Self {
            items,
            enabled: state.enabled,
            max_prompt_chars,
            persistence,
        }
    }

    pub fn items(&self) -> &[QueuedPrompt] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True when a question would be answered from the queue right now.
    pub fn can_autoresolve(&self) -> bool {
        self.enabled && !self.items.is_empty()
    }

    pub fn snapshot(&self) -> QueueState {
        QueueState {
            queue: self.items.clone(),
            enabled: self.enabled,
        }
    }

    /// Append a prompt. A caller-supplied id is kept unless it collides.
    pub fn push(&mut self, text: &str, id: Option<String>) -> Result<QueuedPrompt> {
        let text = validate_text(text, self.max_prompt_chars)?;
        let id = match id {
            Some(id) if !id.trim().is_empty() && !self.contains(&id) => id,
            _ => new_id(),
        };
        let prompt = QueuedPrompt {
            id,
            text,
            created_at: Utc::now(),
        };
        self.items.push(prompt.clone());
        self.persist();
        Ok(prompt)
    }

    pub fn remove_by_id(&mut self, id: &str) -> Result<QueuedPrompt> {
        let idx = self.position(id)?;
        let removed = self.items.remove(idx);
        self.persist();
        Ok(removed)
    }

    pub fn edit(&mut self, id: &str, text: &str) -> Result<()> {
        let text = validate_text(text, self.max_prompt_chars)?;
        let idx = self.position(id)?;
        self.items[idx].text = text;
        self.persist();
        Ok(())
    }

    /// Move the item at `from` so it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len || to >= len {
            return Err(AsklineError::ReorderOutOfRange { from, to, len });
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        self.persist();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.persist();
    }

    /// Remove and return the head of the queue.
    pub fn take_next(&mut self) -> Option<QueuedPrompt> {
        if self.items.is_empty() {
            return None;
        }
        let head = self.items.remove(0);
        self.persist();
        Some(head)
    }

    fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|p| p.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| AsklineError::PromptNotFound { id: id.to_string() })
    }

    fn persist(&self) {
        self.persistence.schedule_queue_save(self.snapshot());
    }
}

/// Trim and bound prompt text.
pub fn validate_text(text: &str, max_chars: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AsklineError::EmptyPrompt);
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(AsklineError::PromptTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(trimmed.to_string())
}
