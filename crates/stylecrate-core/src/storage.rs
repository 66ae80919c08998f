//! Durable client-side key/value storage.
//!
//! `FileStorage` keeps a flat JSON object of string items on disk with
//! restricted permissions (0600). Credentials are never logged.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};

/// Storage key of the opaque session token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the serialized user profile.
pub const USER_KEY: &str = "user";

/// String key/value storage that survives the process.
pub trait ClientStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    /// Removes an item. Returns whether it was present.
    fn remove_item(&self, key: &str) -> Result<bool>;
}

/// Storage backed by a JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all items. Returns an empty map if the file doesn't exist.
    fn load(&self) -> Result<BTreeMap<String, String>> {
        match self.read()? {
            Some(contents) => self.parse(&contents),
            None => Ok(BTreeMap::new()),
        }
    }

    /// Raw file contents, `None` when the file is missing or blank.
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read storage from {}", self.path.display()))?;
        Ok(Some(contents).filter(|c| !c.trim().is_empty()))
    }

    fn parse(&self, contents: &str) -> Result<BTreeMap<String, String>> {
        serde_json::from_str(contents)
            .with_context(|| format!("Failed to parse storage from {}", self.path.display()))
    }

    /// Saves all items with restricted permissions (0600).
    fn save(&self, items: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(items).context("Failed to serialize storage")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ClientStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard();
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard();
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    /// An unparsable file holds no usable item, so it is deleted as a whole.
    fn remove_item(&self, key: &str) -> Result<bool> {
        let _guard = self.guard();
        let Some(contents) = self.read()? else {
            return Ok(false);
        };
        let mut items = match self.parse(&contents) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!("discarding unreadable storage: {e:#}");
                fs::remove_file(&self.path)
                    .with_context(|| format!("Failed to remove {}", self.path.display()))?;
                return Ok(true);
            }
        };
        let had_item = items.remove(key).is_some();
        if had_item {
            self.save(&items)?;
        }
        Ok(had_item)
    }
}

/// Storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ClientStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<bool> {
        Ok(self.items().remove(key).is_some())
    }
}

/// Returns a masked version of a token for display (first 8 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));

        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
        assert!(!storage.remove_item(TOKEN_KEY).unwrap());
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        FileStorage::new(&path).set_item(TOKEN_KEY, "abc").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get_item(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_storage_remove_keeps_other_items() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set_item(TOKEN_KEY, "abc").unwrap();
        storage.set_item(USER_KEY, r#"{"name":"A"}"#).unwrap();

        assert!(storage.remove_item(TOKEN_KEY).unwrap());

        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
        assert_eq!(
            storage.get_item(USER_KEY).unwrap().as_deref(),
            Some(r#"{"name":"A"}"#)
        );
    }

    #[test]
    fn test_file_storage_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();

        assert!(FileStorage::new(&path).get_item(TOKEN_KEY).is_err());
    }

    #[test]
    fn test_file_storage_remove_discards_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{corrupt").unwrap();
        let storage = FileStorage::new(&path);

        assert!(storage.remove_item(TOKEN_KEY).unwrap());

        assert!(!path.exists());
        assert_eq!(storage.get_item(TOKEN_KEY).unwrap(), None);
        assert!(!storage.remove_item(USER_KEY).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        FileStorage::new(&path).set_item(TOKEN_KEY, "abc").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set_item(USER_KEY, "{}").unwrap();
        assert_eq!(storage.get_item(USER_KEY).unwrap().as_deref(), Some("{}"));
        assert!(storage.remove_item(USER_KEY).unwrap());
        assert_eq!(storage.get_item(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGci...");
        assert_eq!(mask_token("short"), "***");
    }
}
