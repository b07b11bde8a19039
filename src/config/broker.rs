use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AsklineError, Result};
use crate::queue::DEFAULT_MAX_PROMPT_CHARS;
use crate::session::DEFAULT_MAX_HISTORY;

/// Broker settings from `.askline/config.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Directory holding the queue and history documents. Relative paths
    /// resolve against the project root. Default: `.askline/state`.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Quiet window before a queue change is written. Default: 300.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Exchanges kept across sessions. Default: 100.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Longest accepted queued prompt, in characters.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,

    /// Give up on an unanswered question after this long. Unset waits forever.
    #[serde(default)]
    pub answer_timeout_secs: Option<u64>,

    #[serde(default)]
    pub agent_socket: Option<PathBuf>,

    #[serde(default)]
    pub ui_socket: Option<PathBuf>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".askline").join("state")
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}
fn default_max_prompt_chars() -> usize {
    DEFAULT_MAX_PROMPT_CHARS
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            debounce_ms: default_debounce_ms(),
            max_history: default_max_history(),
            max_prompt_chars: default_max_prompt_chars(),
            answer_timeout_secs: None,
            agent_socket: None,
            ui_socket: None,
            log_level: default_log_level(),
        }
    }
}

impl BrokerConfig {
    /// Load config from a YAML file. Returns default if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| AsklineError::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load `.askline/config.yml` under the project root, falling back to
    /// `~/.config/askline/config.yml`, then to defaults.
    pub fn load_project(project_root: &Path) -> Result<Self> {
        let path = project_root.join(".askline").join("config.yml");
        if path.exists() {
            return Self::load_from(&path);
        }
        Self::load_from(&super::dirs_global().join("config.yml"))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn answer_timeout(&self) -> Option<Duration> {
        self.answer_timeout_secs.map(Duration::from_secs)
    }

    /// Storage directory, resolved against `project_root` when relative.
    pub fn storage_path(&self, project_root: &Path) -> PathBuf {
        if self.storage_dir.is_absolute() {
            self.storage_dir.clone()
        } else {
            project_root.join(&self.storage_dir)
        }
    }

    pub fn agent_socket_path(&self) -> PathBuf {
        self.agent_socket
            .clone()
            .unwrap_or_else(|| super::runtime_dir().join("askline-agent.sock"))
    }

    pub fn ui_socket_path(&self) -> PathBuf {
        self.ui_socket
            .clone()
            .unwrap_or_else(|| super::runtime_dir().join("askline-ui.sock"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let cfg = BrokerConfig::load_from(&tmp.path().join("nope.yml")).unwrap();
        assert_eq!(cfg, BrokerConfig::default());
        assert_eq!(cfg.debounce(), Duration::from_millis(300));
        assert!(cfg.answer_timeout().is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        std::fs::write(&path, "max_history: 5\nanswer_timeout_secs: 30\n").unwrap();

        let cfg = BrokerConfig::load_from(&path).unwrap();
        assert_eq!(cfg.max_history, 5);
        assert_eq!(cfg.answer_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.max_prompt_chars, DEFAULT_MAX_PROMPT_CHARS);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_bad_yaml_is_config_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yml");
        std::fs::write(&path, "max_history: [not a number\n").unwrap();

        let err = BrokerConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AsklineError::ConfigParse { .. }));
    }

    #[test]
    fn test_project_file_wins() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".askline")).unwrap();
        std::fs::write(tmp.path().join(".askline/config.yml"), "debounce_ms: 10\n").unwrap();

        let cfg = BrokerConfig::load_project(tmp.path()).unwrap();
        assert_eq!(cfg.debounce_ms, 10);
    }

    #[test]
    fn test_storage_path_resolution() {
        let cfg = BrokerConfig::default();
        assert_eq!(
            cfg.storage_path(Path::new("/proj")),
            PathBuf::from("/proj/.askline/state")
        );

        let abs = BrokerConfig {
            storage_dir: PathBuf::from("/var/askline"),
            ..Default::default()
        };
        assert_eq!(abs.storage_path(Path::new("/proj")), PathBuf::from("/var/askline"));
    }

    #[test]
    fn test_explicit_sockets_override_runtime_dir() {
        let cfg = BrokerConfig {
            agent_socket: Some(PathBuf::from("/tmp/a.sock")),
            ..Default::default()
        };
        assert_eq!(cfg.agent_socket_path(), PathBuf::from("/tmp/a.sock"));
        assert!(cfg.ui_socket_path().ends_with("askline-ui.sock"));
    }
}
