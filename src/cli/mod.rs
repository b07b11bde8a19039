pub mod ask;
pub mod history;
pub mod queue;
pub mod serve;

use std::path::Path;
use std::sync::Arc;

use crate::config::BrokerConfig;
use crate::storage::{JsonFileStore, PersistenceStore};

/// Persistence over the project's on-disk state directory.
pub(crate) fn open_persistence(config: &BrokerConfig, project_dir: &Path) -> Arc<PersistenceStore> {
    let store = Arc::new(JsonFileStore::new(config.storage_path(project_dir)));
    Arc::new(PersistenceStore::new(store, config.debounce()))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let flat = s.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let truncated: String = flat.chars().take(max).collect();
        format!("{}...", truncated)
    }
}
