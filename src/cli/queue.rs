use std::path::Path;

use crate::config::BrokerConfig;
use crate::error::Result;
use crate::queue::PromptQueue;

use super::{open_persistence, truncate};

/// Offline edits to the persisted prompt queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAction {
    List,
    Add(String),
    Remove(String),
    Clear,
    Enable,
    Disable,
}

pub async fn run_queue(config: &BrokerConfig, project_dir: &Path, action: QueueAction) -> Result<()> {
    let persistence = open_persistence(config, project_dir);
    let state = persistence.load_queue_state().await;
    let mut queue = PromptQueue::new(state, persistence.clone(), config.max_prompt_chars);

    match action {
        QueueAction::List => {
            print_queue(&queue);
            return Ok(());
        }
        QueueAction::Add(text) => {
            let prompt = queue.push(&text, None)?;
            eprintln!("askline: queued {}", prompt.id);
        }
        QueueAction::Remove(id) => {
            queue.remove_by_id(&id)?;
            eprintln!("askline: removed {}", id);
        }
        QueueAction::Clear => {
            let n = queue.len();
            queue.clear();
            eprintln!("askline: cleared {} prompt(s)", n);
        }
        QueueAction::Enable => {
            queue.set_enabled(true);
            eprintln!("askline: autopilot enabled");
        }
        QueueAction::Disable => {
            queue.set_enabled(false);
            eprintln!("askline: autopilot disabled");
        }
    }

    persistence.flush_queue()
}

fn print_queue(queue: &PromptQueue) {
    let status = if queue.is_enabled() { "on" } else { "off" };
    if queue.is_empty() {
        println!("Queue is empty (autopilot {}).", status);
        return;
    }
    for (i, prompt) in queue.items().iter().enumerate() {
        println!("{}. [{}] {}", i + 1, prompt.id, truncate(&prompt.text, 80));
    }
    println!("{} queued prompt(s), autopilot {}", queue.len(), status);
}
