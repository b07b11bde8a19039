use std::path::Path;

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::session::persisted::sanitize_loaded;
use crate::storage::HistoryDocument;

use super::{open_persistence, truncate};

/// Print stored exchanges, most recent first, or wipe them with `clear`.
pub async fn run_history(
    config: &BrokerConfig,
    project_dir: &Path,
    limit: Option<usize>,
    clear: bool,
) -> Result<()> {
    let persistence = open_persistence(config, project_dir);

    if clear {
        persistence.save_history_now(&HistoryDocument::default())?;
        eprintln!("askline: history cleared");
        return Ok(());
    }

    let doc = persistence.load_history().await;
    let entries = sanitize_loaded(doc.history, config.max_history);
    if entries.is_empty() {
        println!("No stored exchanges.");
        return Ok(());
    }

    let shown = limit.unwrap_or(entries.len()).min(entries.len());
    for entry in entries.iter().take(shown) {
        let source = if entry.from_queue { " (queue)" } else { "" };
        println!(
            "[{}] Q: {}\n  A: {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            truncate(&entry.question_text, 100),
            truncate(&entry.response_text, 100),
            source,
        );
    }
    println!("{} of {} exchange(s)", shown, entries.len());
    Ok(())
}
