use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{DocumentKind, DocumentStore};

/// One JSON file per document under a state directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, kind: DocumentKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self, kind: DocumentKind) -> Result<Option<String>> {
        let path = self.path_for(kind);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    /// Write through a temp file and rename, so a crash never leaves a torn document.
    fn write(&self, kind: DocumentKind, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(kind);
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(contents.as_bytes())?;
            file.sync_all()?;
        }
        set_file_permissions_0600(&tmp_path);
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

/// Set file permissions to 0600 (owner read/write only).
#[cfg(unix)]
fn set_file_permissions_0600(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let perms = fs::Permissions::from_mode(0o600);
    let _ = fs::set_permissions(path, perms);
}

#[cfg(not(unix))]
fn set_file_permissions_0600(_path: &Path) {
    // No-op on non-Unix platforms
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("state"));
        assert!(store.read(DocumentKind::QueueState).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("state"));

        store
            .write(DocumentKind::ExchangeHistory, r#"{"history":[]}"#)
            .unwrap();

        let contents = store.read(DocumentKind::ExchangeHistory).unwrap();
        assert_eq!(contents.as_deref(), Some(r#"{"history":[]}"#));
        assert!(tmp.path().join("state/exchange-history.json").exists());
        assert!(!tmp.path().join("state/exchange-history.tmp").exists());
    }

    #[test]
    fn test_documents_are_independent() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().to_path_buf());

        store.write(DocumentKind::QueueState, "a").unwrap();
        store.write(DocumentKind::ExchangeHistory, "b").unwrap();
        store.write(DocumentKind::QueueState, "c").unwrap();

        assert_eq!(store.read(DocumentKind::QueueState).unwrap().as_deref(), Some("c"));
        assert_eq!(
            store.read(DocumentKind::ExchangeHistory).unwrap().as_deref(),
            Some("b")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_written_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().to_path_buf());
        store.write(DocumentKind::QueueState, "{}").unwrap();

        let mode = fs::metadata(store.path_for(DocumentKind::QueueState))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
