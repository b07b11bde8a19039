use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::error::Result;

use super::{DocumentKind, DocumentStore};

/// Where a debounced document is in its write cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing waiting to be written.
    Idle,
    /// A write is armed and will fire after the quiet window.
    Scheduled,
    /// The latest snapshot has been taken and is being written.
    Flushing,
}

struct Inner<T> {
    state: WriterState,
    latest: Option<T>,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Coalesces bursts of saves for one document into a single trailing write.
///
/// Every `schedule_write` replaces the pending snapshot and restarts the quiet
/// window, so a write always carries the newest state. Writes are serialized
/// through `write_lock`: a later write can never land before an earlier one.
pub struct DebouncedWriter<T> {
    kind: DocumentKind,
    store: Arc<dyn DocumentStore>,
    window: Duration,
    inner: Arc<Mutex<Inner<T>>>,
    write_lock: Arc<Mutex<()>>,
}

impl<T> DebouncedWriter<T>
where
    T: Serialize + Send + 'static,
{
    pub fn new(kind: DocumentKind, store: Arc<dyn DocumentStore>, window: Duration) -> Self {
        Self {
            kind,
            store,
            window,
            inner: Arc::new(Mutex::new(Inner {
                state: WriterState::Idle,
                latest: None,
                generation: 0,
                timer: None,
            })),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn state(&self) -> WriterState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Arm (or re-arm) a write of `doc`. Outside a Tokio runtime the write
    /// happens immediately.
    pub fn schedule_write(&self, doc: T) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(e) = write_document(self.store.as_ref(), self.kind, &doc) {
                tracing::error!("failed to save {}: {}", self.kind, e);
            }
            return;
        };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.latest = Some(doc);
        inner.generation += 1;
        inner.state = WriterState::Scheduled;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }

        let generation = inner.generation;
        let window = self.window;
        let kind = self.kind;
        let store = self.store.clone();
        let shared = self.inner.clone();
        let write_lock = self.write_lock.clone();

        inner.timer = Some(handle.spawn(async move {
            tokio::time::sleep(window).await;
            let write = tokio::task::spawn_blocking(move || {
                fire(&shared, &write_lock, store.as_ref(), kind, generation);
            });
            if let Err(e) = write.await {
                tracing::error!("save task for {} failed: {}", kind, e);
            }
        }));
    }

    /// Cancel the timer and write the pending snapshot now, if there is one.
    pub fn flush_now(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let doc = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.generation += 1;
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.state = WriterState::Flushing;
            inner.latest.take()
        };

        let result = match doc {
            Some(doc) => write_document(self.store.as_ref(), self.kind, &doc),
            None => Ok(()),
        };

        self.inner.lock().unwrap_or_else(|e| e.into_inner()).state = WriterState::Idle;
        result
    }
}

fn fire<T: Serialize>(
    shared: &Mutex<Inner<T>>,
    write_lock: &Mutex<()>,
    store: &dyn DocumentStore,
    kind: DocumentKind,
    generation: u64,
) {
    let _guard = write_lock.lock().unwrap_or_else(|e| e.into_inner());
    let doc = {
        let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
        if inner.generation != generation {
            // Superseded by a newer schedule or a flush.
            return;
        }
        inner.timer = None;
        inner.state = WriterState::Flushing;
        inner.latest.take()
    };

    if let Some(doc) = doc {
        match write_document(store, kind, &doc) {
            Ok(()) => tracing::debug!("saved {}", kind),
            Err(e) => tracing::error!("failed to save {}: {}", kind, e),
        }
    }

    let mut inner = shared.lock().unwrap_or_else(|e| e.into_inner());
    if inner.state == WriterState::Flushing {
        inner.state = if inner.latest.is_some() {
            WriterState::Scheduled
        } else {
            WriterState::Idle
        };
    }
}

pub(crate) fn write_document<T: Serialize>(
    store: &dyn DocumentStore,
    kind: DocumentKind,
    doc: &T,
) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    store.write(kind, &json)
}
