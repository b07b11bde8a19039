use std::collections::HashSet;

use crate::exchange::{EntryStatus, ToolCallEntry};

/// Default number of exchanges kept across sessions.
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Clean a loaded history: completed entries only, no duplicate ids, capped.
pub fn sanitize_loaded(history: Vec<ToolCallEntry>, max: usize) -> Vec<ToolCallEntry> {
    let loaded = history.len();
    let mut seen = HashSet::new();
    let mut kept: Vec<ToolCallEntry> = history
        .into_iter()
        .filter(|e| e.status == EntryStatus::Completed)
        .filter(|e| seen.insert(e.id.clone()))
        .collect();
    kept.truncate(max);
    if kept.len() != loaded {
        tracing::warn!(
            "persisted history: kept {} of {} entries",
            kept.len(),
            loaded
        );
    }
    kept
}

/// Prepend completed session entries (most recent first) to the persisted
/// history, skipping ids already present, then evict the oldest beyond `max`.
///
/// Returns the number of entries added.
pub fn merge_session(
    persisted: &mut Vec<ToolCallEntry>,
    session_newest_first: &[ToolCallEntry],
    max: usize,
) -> usize {
    let existing: HashSet<&str> = persisted.iter().map(|e| e.id.as_str()).collect();
    let fresh: Vec<ToolCallEntry> = session_newest_first
        .iter()
        .filter(|e| e.status == EntryStatus::Completed)
        .filter(|e| !existing.contains(e.id.as_str()))
        .cloned()
        .collect();
    let added = fresh.len();

    let mut merged = fresh;
    merged.append(persisted);
    merged.truncate(max);
    *persisted = merged;
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(id: &str) -> ToolCallEntry {
        let mut e = ToolCallEntry::pending(id.to_string(), "q", "s");
        e.status = EntryStatus::Completed;
        e.response_text = "a".into();
        e
    }

    fn ids(entries: &[ToolCallEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_merge_prepends_and_evicts_oldest() {
        let mut persisted = vec![completed("old-2"), completed("old-1")];
        let session = vec![completed("new-2"), completed("new-1")];

        let added = merge_session(&mut persisted, &session, 3);
        assert_eq!(added, 2);
        assert_eq!(ids(&persisted), vec!["new-2", "new-1", "old-2"]);
    }

    #[test]
    fn test_merge_skips_pending_and_duplicates() {
        let mut persisted = vec![completed("a")];
        let session = vec![
            ToolCallEntry::pending("p".into(), "q", "s"),
            completed("a"),
            completed("b"),
        ];

        merge_session(&mut persisted, &session, 10);
        assert_eq!(ids(&persisted), vec!["b", "a"]);

        // Merging the same session again adds nothing.
        assert_eq!(merge_session(&mut persisted, &session, 10), 0);
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_sanitize_loaded() {
        let loaded = vec![
            completed("a"),
            ToolCallEntry::pending("p".into(), "q", "s"),
            completed("a"),
            completed("b"),
            completed("c"),
        ];
        let kept = sanitize_loaded(loaded, 2);
        assert_eq!(ids(&kept), vec!["a", "b"]);
    }
}
