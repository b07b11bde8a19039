use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{AsklineError, Result};

use super::{DocumentKind, DocumentStore};

/// In-process document store. Counts writes so tests can observe coalescing.
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<DocumentKind, String>>,
    writes: RwLock<HashMap<DocumentKind, usize>>,
    total_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document as if it had been written by an earlier run.
    pub fn with_document(self, kind: DocumentKind, contents: &str) -> Self {
        self.docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, contents.to_string());
        self
    }

    pub fn contents(&self, kind: DocumentKind) -> Option<String> {
        let docs = self.docs.read().unwrap_or_else(|e| e.into_inner());
        docs.get(&kind).cloned()
    }

    pub fn write_count(&self, kind: DocumentKind) -> usize {
        let writes = self.writes.read().unwrap_or_else(|e| e.into_inner());
        writes.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.total_writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail, to exercise error paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, kind: DocumentKind) -> Result<Option<String>> {
        Ok(self.contents(kind))
    }

    fn write(&self, kind: DocumentKind, contents: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AsklineError::Storage {
                reason: format!("write to {kind} rejected"),
            });
        }
        self.docs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind, contents.to_string());
        *self
            .writes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(kind)
            .or_insert(0) += 1;
        self.total_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
