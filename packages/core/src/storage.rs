//! String key/value storage standing in for the browser's local storage.
//!
//! `LocalStorage` is either purely in-memory or backed by a JSON file that is
//! rewritten after every mutation. It holds the bearer token, user
//! preferences and the persisted slices of the stores (`pinia-<storeId>`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;

/// Well-known storage keys.
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const USER_PREFERENCES: &str = "user_preferences";
    pub const THEME: &str = "app_theme";
    pub const LANGUAGE: &str = "app_language";
    pub const DASHBOARD_LAYOUT: &str = "dashboard_layout";

    /// Key under which a store's persisted slice lives.
    pub fn persisted_store(store_id: &str) -> String {
        format!("pinia-{}", store_id)
    }
}

#[derive(Debug, Default)]
pub struct LocalStorage {
    path: Option<PathBuf>,
    entries: RwLock<BTreeMap<String, String>>,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or lazily create) a file-backed storage. A missing file is an
    /// empty storage; an unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|err| AppError::Storage(format!("{}: {}", path.display(), err)))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|err| AppError::Storage(format!("{}: {}", path.display(), err)))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), AppError> {
        {
            let mut entries = self.write_guard()?;
            entries.insert(key.to_string(), value.into());
        }
        self.flush()
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        let removed = self.write_guard()?.remove(key).is_some();
        if removed {
            self.flush()?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.write_guard()?.clear();
        self.flush()
    }

    /// Read a JSON document stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the stored
    /// value does not parse as `T`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.get(key) {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|err| AppError::Storage(format!("invalid value under '{}': {}", key, err))),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw)
    }

    fn write_guard(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, String>>, AppError> {
        self.entries
            .write()
            .map_err(|_| AppError::Storage("storage lock poisoned".into()))
    }

    fn flush(&self) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let snapshot = {
            let entries = self
                .entries
                .read()
                .map_err(|_| AppError::Storage("storage lock poisoned".into()))?;
            serde_json::to_string_pretty(&*entries)?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| AppError::Storage(format!("{}: {}", parent.display(), err)))?;
        }
        fs::write(path, snapshot)
            .map_err(|err| AppError::Storage(format!("{}: {}", path.display(), err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn in_memory_set_get_remove() {
        let storage = LocalStorage::in_memory();
        assert!(storage.get(keys::TOKEN).is_none());

        storage.set(keys::TOKEN, "abc").unwrap();
        assert_eq!(storage.get(keys::TOKEN).as_deref(), Some("abc"));

        storage.remove(keys::TOKEN).unwrap();
        assert!(storage.get(keys::TOKEN).is_none());
    }

    #[test]
    fn file_backed_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = LocalStorage::open(&path).unwrap();
        storage.set(keys::THEME, "dark").unwrap();
        drop(storage);

        let reopened = LocalStorage::open(&path).unwrap();
        assert_eq!(reopened.get(keys::THEME).as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(LocalStorage::open(&path), Err(AppError::Storage(_))));
    }

    #[test]
    fn json_helpers_round_trip_and_report_bad_values() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Prefs {
            compact: bool,
        }

        let storage = LocalStorage::in_memory();
        storage.set_json(keys::USER_PREFERENCES, &Prefs { compact: true }).unwrap();
        let prefs: Option<Prefs> = storage.get_json(keys::USER_PREFERENCES).unwrap();
        assert_eq!(prefs, Some(Prefs { compact: true }));

        storage.set(keys::USER_PREFERENCES, "garbage").unwrap();
        assert!(storage.get_json::<Prefs>(keys::USER_PREFERENCES).is_err());
    }

    #[test]
    fn persisted_store_key_is_prefixed() {
        assert_eq!(keys::persisted_store("alerts"), "pinia-alerts");
    }
}
