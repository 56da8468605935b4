//! Durable cache store: one JSON file per key
//!
//! Entries live at `<cache_dir>/<key>.json` as `{ "data": ..., "timestamp": ... }`.
//! The store only moves bytes; freshness is decided by the façade.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;

use super::CacheEntry;
use crate::error::CacheError;

/// Reads and writes cache entries as JSON files under a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `cache_dir`; the directory is created lazily on first write
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    ///
    /// Anything other than ASCII letters, digits, `-` and `_` is replaced so
    /// that user-supplied keys (search keywords) cannot leave the directory.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.cache_dir.join(format!("{}.json", file_stem))
    }

    /// Reads an entry from disk
    ///
    /// # Returns
    /// * `Ok(Some(entry))` if the file exists and parses
    /// * `Ok(None)` if there is no file for this key
    /// * `Err(CacheError)` on I/O failure or corrupt JSON
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry<Value>>, CacheError> {
        let content = match fs::read_to_string(self.path_for(key)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    /// Writes an entry to disk, creating the cache directory if missing
    pub async fn write(&self, key: &str, entry: &CacheEntry<Value>) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir).await?;

        let json = serde_json::to_string_pretty(entry)?;
        fs::write(self.path_for(key), json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_write_creates_file_in_cache_directory() {
        let (store, temp_dir) = create_test_store();
        let entry = CacheEntry::new(json!({"name": "test", "value": 42}), 1_000);

        store.write("test_key", &entry).await.expect("Write should succeed");

        let expected_path = temp_dir.path().join("test_key.json");
        assert!(expected_path.exists(), "Cache file should exist");

        let content = std::fs::read_to_string(&expected_path).expect("Should read file");
        assert!(content.contains("\"data\""));
        assert!(content.contains("\"timestamp\""));
        assert!(content.contains("42"));
    }

    #[tokio::test]
    async fn test_read_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.read("nonexistent_key").await.expect("Missing is not an error");

        assert!(result.is_none(), "Should return None for missing key");
    }

    #[tokio::test]
    async fn test_read_returns_written_entry() {
        let (store, _temp_dir) = create_test_store();
        let entry = CacheEntry::new(json!({"tokens": [], "count": 0}), 123_456);

        store.write("token_boosts", &entry).await.unwrap();
        let result = store.read("token_boosts").await.unwrap();

        assert_eq!(result, Some(entry));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let (store, temp_dir) = create_test_store();
        std::fs::write(temp_dir.path().join("broken.json"), "{ not json").unwrap();

        let result = store.read("broken").await;

        assert!(matches!(result, Err(CacheError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_an_error() {
        let (store, temp_dir) = create_test_store();
        std::fs::write(temp_dir.path().join("shape.json"), r#"{"data": 1}"#).unwrap();

        assert!(store.read("shape").await.is_err());
    }

    #[tokio::test]
    async fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested_path = temp_dir.path().join("nested").join("cache").join("dir");
        let store = FileStore::new(nested_path.clone());

        for i in 0..3 {
            store
                .write("nested_key", &CacheEntry::new(json!(i), i))
                .await
                .expect("Repeated writes should succeed");
        }

        assert!(nested_path.is_dir(), "Nested directory should be created");
        assert!(nested_path.join("nested_key.json").exists(), "Cache file should exist");
        assert_eq!(std::fs::read_dir(&nested_path).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_existing_entry() {
        let (store, _temp_dir) = create_test_store();

        store.write("overwrite_key", &CacheEntry::new(json!("first"), 1)).await.unwrap();
        store.write("overwrite_key", &CacheEntry::new(json!("second"), 2)).await.unwrap();

        let result = store.read("overwrite_key").await.unwrap().unwrap();
        assert_eq!(result.data, json!("second"));
        assert_eq!(result.timestamp, 2);
    }

    #[test]
    fn test_path_for_sanitizes_keys() {
        let store = FileStore::new("/tmp/cache");

        assert_eq!(
            store.path_for("search_../../etc/passwd"),
            PathBuf::from("/tmp/cache/search_______etc_passwd.json")
        );
        assert_eq!(
            store.path_for("token_details_0xAbC-1_bsc"),
            PathBuf::from("/tmp/cache/token_details_0xAbC-1_bsc.json")
        );
    }
}
