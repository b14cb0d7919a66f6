//! Favorites store: per-user ordered list of saved suggestions, persisted as JSON.
//!
//! File layout: `{ "<user id>": ["idea", ...], ... }`. A missing or unreadable
//! file loads as an empty store. Every mutation rewrites the whole file through
//! a temporary file and a rename, under one lock, so concurrent saves and
//! deletes never lose updates and a failed write leaves the previous state intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::StorageError;

type FavoritesMap = BTreeMap<String, Vec<String>>;

/// JSON-file backed favorites store.
pub struct FavoritesStore {
    path: PathBuf,
    data: Mutex<FavoritesMap>,
}

impl FavoritesStore {
    /// Load the store from `path`. Missing or corrupt files start empty.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<FavoritesMap>(&content) {
                Ok(map) => {
                    info!(path = %path.display(), users = map.len(), "Loaded favorites");
                    map
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt favorites file, starting empty");
                    FavoritesMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No favorites file yet");
                FavoritesMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable favorites file, starting empty");
                FavoritesMap::new()
            }
        };

        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` unless the user already saved the exact same text.
    /// Returns `false` on duplicates.
    pub async fn add(&self, user_id: &str, text: &str) -> Result<bool, StorageError> {
        let mut data = self.data.lock().await;
        let mut list = data.get(user_id).cloned().unwrap_or_default();
        if list.iter().any(|saved| saved == text) {
            debug!(user_id, "Favorite already present");
            return Ok(false);
        }
        list.push(text.to_string());

        self.commit(&mut data, user_id, list).await?;
        info!(user_id, "Favorite added");
        Ok(true)
    }

    /// Remove the item at `index`. Out-of-range indices leave the list untouched.
    pub async fn remove(&self, user_id: &str, index: usize) -> Result<Option<String>, StorageError> {
        self.remove_where(user_id, index, |_| true).await
    }

    /// Remove the item at `index` only if it still equals `expected`.
    ///
    /// Used when the index comes from a listing shown earlier: if the list has
    /// changed since, nothing is removed.
    pub async fn remove_matching(
        &self,
        user_id: &str,
        index: usize,
        expected: &str,
    ) -> Result<Option<String>, StorageError> {
        self.remove_where(user_id, index, |current| current == expected)
            .await
    }

    /// The user's current list; empty if they never saved anything.
    pub async fn list(&self, user_id: &str) -> Vec<String> {
        self.data
            .lock()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn remove_where(
        &self,
        user_id: &str,
        index: usize,
        accept: impl FnOnce(&str) -> bool,
    ) -> Result<Option<String>, StorageError> {
        let mut data = self.data.lock().await;
        let Some(current) = data.get(user_id) else {
            return Ok(None);
        };
        if index >= current.len() || !accept(&current[index]) {
            debug!(user_id, index, "Favorite reference not found");
            return Ok(None);
        }

        let mut list = current.clone();
        let removed = list.remove(index);
        self.commit(&mut data, user_id, list).await?;
        info!(user_id, index, "Favorite removed");
        Ok(Some(removed))
    }

    /// Install `list` for `user_id` and persist; on failure restore the old entry.
    async fn commit(
        &self,
        data: &mut FavoritesMap,
        user_id: &str,
        list: Vec<String>,
    ) -> Result<(), StorageError> {
        let previous = data.insert(user_id.to_string(), list);
        if let Err(e) = self.persist(data).await {
            match previous {
                Some(old) => data.insert(user_id.to_string(), old),
                None => data.remove(user_id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&self, data: &FavoritesMap) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(data)?;
        let write_err = |source| StorageError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await.map_err(write_err)?;
        fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_store() -> (FavoritesStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FavoritesStore::open(dir.path().join("favorites.json")).await;
        (store, dir)
    }

    #[tokio::test]
    async fn add_suppresses_duplicates() {
        let (store, _dir) = test_store().await;
        assert!(store.add("42", "X").await.unwrap());
        assert!(!store.add("42", "X").await.unwrap());
        assert_eq!(store.list("42").await, vec!["X"]);
    }

    #[tokio::test]
    async fn list_unknown_user_is_empty() {
        let (store, _dir) = test_store().await;
        assert!(store.list("nobody").await.is_empty());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (store, _dir) = test_store().await;
        store.add("1", "kite").await.unwrap();
        assert!(store.add("2", "kite").await.unwrap());
        assert_eq!(store.remove("1", 0).await.unwrap().as_deref(), Some("kite"));
        assert_eq!(store.list("2").await, vec!["kite"]);
    }

    #[tokio::test]
    async fn remove_in_bounds_preserves_order() {
        let (store, _dir) = test_store().await;
        for item in ["a", "b", "c"] {
            store.add("7", item).await.unwrap();
        }
        assert_eq!(store.remove("7", 1).await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.list("7").await, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn remove_out_of_bounds_is_noop() {
        let (store, _dir) = test_store().await;
        store.add("7", "a").await.unwrap();
        assert_eq!(store.remove("7", 1).await.unwrap(), None);
        assert_eq!(store.remove("8", 0).await.unwrap(), None);
        assert_eq!(store.list("7").await, vec!["a"]);
    }

    #[tokio::test]
    async fn remove_matching_rejects_shifted_index() {
        let (store, _dir) = test_store().await;
        store.add("7", "a").await.unwrap();
        store.add("7", "b").await.unwrap();

        assert_eq!(store.remove_matching("7", 0, "a").await.unwrap().as_deref(), Some("a"));
        // "b" now sits at 0; a stale tap for the old first item must not remove it.
        assert_eq!(store.remove_matching("7", 0, "a").await.unwrap(), None);
        assert_eq!(store.list("7").await, vec!["b"]);
    }

    #[tokio::test]
    async fn survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        {
            let store = FavoritesStore::open(&path).await;
            store.add("5", "one").await.unwrap();
            store.add("5", "two").await.unwrap();
            store.remove("5", 0).await.unwrap();
        }
        let reopened = FavoritesStore::open(&path).await;
        assert_eq!(reopened.list("5").await, vec!["two"]);
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = FavoritesStore::open(&path).await;
        assert!(store.list("5").await.is_empty());
        assert!(store.add("5", "fresh").await.unwrap());
        assert_eq!(FavoritesStore::open(&path).await.list("5").await, vec!["fresh"]);
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/nested/favorites.json");
        let store = FavoritesStore::open(&path).await;
        store.add("1", "x").await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn failed_write_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the final rename fail.
        let path = dir.path().join("favorites.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let store = FavoritesStore::open(&path).await;
        let err = store.add("1", "lost").await.unwrap_err();
        assert!(matches!(err, StorageError::Write { .. }));
        assert!(store.list("1").await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_adds_are_not_lost() {
        let (store, _dir) = test_store().await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add("9", &format!("idea {i}")).await.unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.list("9").await.len(), 20);
        let reopened = FavoritesStore::open(store.path()).await;
        assert_eq!(reopened.list("9").await.len(), 20);
    }
}
