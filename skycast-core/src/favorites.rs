//! Durable favorites, kept as one JSON document under a well-known key.

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::model::Location;

pub const FAVORITES_KEY: &str = "favorites";

/// Minimal string key-value storage.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data directory: {}", self.dir.display()))?;
        let path = self.path_for(key);
        fs::write(&path, value).with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Favorite membership as seen by the selection controller. Synchronous and
/// assumed always available.
pub trait FavoritesStore: Send + Sync + std::fmt::Debug {
    fn add(&self, location: &Location);
    fn remove(&self, key: &str);
    fn list(&self) -> Vec<Location>;
    fn contains(&self, key: &str) -> bool;
}

#[derive(Debug)]
pub struct Favorites {
    storage: Box<dyn KeyValueStore>,
    entries: Mutex<Vec<Location>>,
}

impl Favorites {
    /// Load the stored list; a missing key means no favorites yet.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Result<Self> {
        let entries = match storage.get(FAVORITES_KEY)? {
            Some(text) => serde_json::from_str(&text).context("Failed to parse stored favorites")?,
            None => Vec::new(),
        };
        Ok(Self { storage, entries: Mutex::new(entries) })
    }

    fn persist(&self, entries: &[Location]) {
        let saved = serde_json::to_string(entries)
            .context("Failed to serialize favorites")
            .and_then(|text| self.storage.set(FAVORITES_KEY, &text));
        if let Err(e) = saved {
            tracing::warn!(error = %format!("{e:#}"), "favorites were not persisted");
        }
    }
}

impl FavoritesStore for Favorites {
    fn add(&self, location: &Location) {
        let mut entries = self.entries.lock();
        if entries.iter().any(|fav| fav.key == location.key) {
            return;
        }
        entries.push(location.clone());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock();
        entries.retain(|fav| fav.key != key);
        self.persist(&entries);
    }

    fn list(&self) -> Vec<Location> {
        self.entries.lock().clone()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().iter().any(|fav| fav.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent_and_keeps_order() {
        let favorites = Favorites::open(Box::new(MemoryStore::default())).unwrap();
        favorites.add(&Location::new("1", "Paris"));
        favorites.add(&Location::new("2", "Rome"));
        favorites.add(&Location::new("1", "Paris"));

        let names: Vec<_> = favorites.list().into_iter().map(|l| l.name).collect();
        assert_eq!(names, ["Paris", "Rome"]);
    }

    #[test]
    fn remove_drops_membership() {
        let favorites = Favorites::open(Box::new(MemoryStore::default())).unwrap();
        favorites.add(&Location::new("1", "Paris"));
        favorites.remove("1");
        assert!(!favorites.contains("1"));
        assert!(favorites.list().is_empty());
    }

    #[test]
    fn favorites_survive_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut paris = Location::new("623", "Paris");
        paris.raw = serde_json::json!({ "Key": "623", "Rank": 10 });

        {
            let favorites = Favorites::open(Box::new(FileStore::new(dir.path()))).unwrap();
            favorites.add(&paris);
        }

        let stored = fs::read_to_string(dir.path().join("favorites.json")).unwrap();
        assert!(stored.starts_with('['));

        let reopened = Favorites::open(Box::new(FileStore::new(dir.path()))).unwrap();
        assert!(reopened.contains("623"));
        assert_eq!(reopened.list(), vec![paris]);
    }

    #[test]
    fn corrupt_document_fails_to_open() {
        let store = MemoryStore::default();
        store.set(FAVORITES_KEY, "{not json").unwrap();

        let err = Favorites::open(Box::new(store)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse stored favorites"));
    }
}
