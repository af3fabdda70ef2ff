// Local key-value persistence

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A local string key-value facility holding whole snapshots
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Directory-backed store: one `<key>.json` file per key
///
/// Writes take an exclusive lock on `<key>.lock`, go to a temporary file, and are
/// renamed over the target, so readers never observe a half-written snapshot.
#[derive(Debug, Clone)]
pub struct DirStore {
    base_path: PathBuf,
}

impl DirStore {
    /// Use `path` as the store directory. It is created on first write.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            base_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl KeyValueStore for DirStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.path_for(key);

        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        fs::create_dir_all(&self.base_path).context("Failed to create store directory")?;

        let lock_path = self.base_path.join(format!("{}.lock", key));
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        let target = self.path_for(key);
        let tmp = self.base_path.join(format!("{}.json.tmp", key));
        {
            let mut file = fs::File::create(&tmp).context("Failed to create temporary snapshot file")?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?; // Ensure data is flushed to disk before the rename
        }
        fs::rename(&tmp, &target).context("Failed to replace snapshot file")?;

        debug!(key, bytes = value.len(), path = ?target, "Wrote key");

        // Lock is released when `lock` is dropped
        Ok(())
    }
}

/// In-process store, for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `DirStore` uses the key verbatim as a file stem, so it must not contain path
/// separators, dots or anything else a file system might interpret
fn validate_key(key: &str) -> Result<()> {
    const MAX_KEY_LEN: usize = 64;

    if key.is_empty() {
        return Err(eyre!("Storage key is empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(eyre!(
            "Storage key {:?} is {} bytes; file stems are limited to {}",
            key,
            key.len(),
            MAX_KEY_LEN
        ));
    }
    if let Some(bad) = key.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(eyre!(
            "Storage key {:?} contains {:?}; only ASCII letters, digits, '_' and '-' are usable in a file stem",
            key,
            bad
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_store_missing_key() {
        let temp = TempDir::new().unwrap();
        let store = DirStore::new(temp.path().join("store"));
        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn test_dir_store_set_and_get() {
        let temp = TempDir::new().unwrap();
        let mut store = DirStore::new(temp.path().join("store"));

        store.set("tasks", "[1]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[1]"));
        assert!(store.path_for("tasks").exists());

        // Overwrite replaces wholesale
        store.set("tasks", "[]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[]"));
        assert!(!temp.path().join("store/tasks.json.tmp").exists());
    }

    #[test]
    fn test_dir_store_write_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp.path().join("blocked");
        fs::write(&blocker, "not a directory").unwrap();

        let mut store = DirStore::new(&blocker);
        assert!(store.set("tasks", "[]").is_err());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("tasks").unwrap(), None);
        store.set("tasks", "[]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("taskflow_tasks").is_ok());
        assert!(validate_key("task-flow").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
        assert!(validate_key("tasks.json").is_err());
        assert!(validate_key("zadání").is_err());

        let err = validate_key("a/b").unwrap_err();
        assert!(err.to_string().contains("'/'"));
    }
}
