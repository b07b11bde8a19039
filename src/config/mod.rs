pub mod broker;

pub use broker::BrokerConfig;

use std::path::PathBuf;

/// Returns the global config directory path: `~/.config/askline/`
pub fn dirs_global() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("askline")
}

/// Directory for the broker's sockets: `$XDG_RUNTIME_DIR`, else `/tmp`.
pub fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
}
