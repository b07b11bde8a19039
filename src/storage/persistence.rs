use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::Result;

use super::debounce::{write_document, DebouncedWriter};
use super::{DocumentKind, DocumentStore, HistoryDocument, QueueState};

/// Load and save paths for the broker's two documents.
///
/// Queue saves are debounced because the human can edit the queue in rapid
/// bursts. History is written synchronously since it is saved at teardown,
/// when there is no later chance to flush.
pub struct PersistenceStore {
    store: Arc<dyn DocumentStore>,
    queue_writer: DebouncedWriter<QueueState>,
}

impl PersistenceStore {
    pub fn new(store: Arc<dyn DocumentStore>, debounce: Duration) -> Self {
        let queue_writer = DebouncedWriter::new(DocumentKind::QueueState, store.clone(), debounce);
        Self {
            store,
            queue_writer,
        }
    }

    pub async fn load_queue_state(&self) -> QueueState {
        self.load_async(DocumentKind::QueueState).await
    }

    pub async fn load_history(&self) -> HistoryDocument {
        self.load_async(DocumentKind::ExchangeHistory).await
    }

    pub fn schedule_queue_save(&self, state: QueueState) {
        self.queue_writer.schedule_write(state);
    }

    /// Write any pending queue snapshot immediately.
    pub fn flush_queue(&self) -> Result<()> {
        self.queue_writer.flush_now()
    }

    pub fn queue_writer(&self) -> &DebouncedWriter<QueueState> {
        &self.queue_writer
    }

    pub fn save_history_now(&self, doc: &HistoryDocument) -> Result<()> {
        write_document(self.store.as_ref(), DocumentKind::ExchangeHistory, doc)
    }

    async fn load_async<T>(&self, kind: DocumentKind) -> T
    where
        T: DeserializeOwned + Default + Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || load_or_default(store.as_ref(), kind)).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("loading {} failed: {}; using defaults", kind, e);
                T::default()
            }
        }
    }
}

/// Missing, unreadable or malformed documents all fall back to defaults.
fn load_or_default<T>(store: &dyn DocumentStore, kind: DocumentKind) -> T
where
    T: DeserializeOwned + Default,
{
    match store.read(kind) {
        Ok(None) => T::default(),
        Ok(Some(contents)) if contents.trim().is_empty() => T::default(),
        Ok(Some(contents)) => match serde_json::from_str(&contents) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("{} is malformed ({}); resetting to defaults", kind, e);
                T::default()
            }
        },
        Err(e) => {
            tracing::warn!("failed to read {}: {}; using defaults", kind, e);
            T::default()
        }
    }
}
