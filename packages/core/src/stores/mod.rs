//! Client-side state stores.
//!
//! A store may attach a [`LocalStorage`]; it then restores its persisted
//! slice from `pinia-<storeId>` on construction and writes the slice back
//! after every change to a persisted field. Persistence problems are logged
//! and never fail the action that caused them.

pub mod alerts;
pub mod dashboard;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::storage::{keys, LocalStorage};

pub use alerts::AlertsStore;
pub use dashboard::DashboardStore;

/// Load a store's persisted slice. Missing or unreadable slices yield
/// `None` so the store keeps its defaults.
pub(crate) fn restore_slice<T: DeserializeOwned>(storage: &LocalStorage, store_id: &str) -> Option<T> {
    let key = keys::persisted_store(store_id);
    match storage.get_json::<T>(&key) {
        Ok(slice) => slice,
        Err(err) => {
            tracing::warn!("Failed to restore state for store {}: {}", store_id, err);
            None
        }
    }
}

pub(crate) fn persist_slice<T: Serialize>(storage: &LocalStorage, store_id: &str, slice: &T) {
    let key = keys::persisted_store(store_id);
    if let Err(err) = storage.set_json(&key, slice) {
        tracing::warn!("Failed to persist state for store {}: {}", store_id, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Slice {
        page: u32,
    }

    #[test]
    fn slice_round_trips_under_prefixed_key() {
        let storage = LocalStorage::in_memory();
        persist_slice(&storage, "demo", &Slice { page: 4 });

        assert_eq!(storage.get("pinia-demo").as_deref(), Some(r#"{"page":4}"#));
        assert_eq!(restore_slice::<Slice>(&storage, "demo"), Some(Slice { page: 4 }));
    }

    #[test]
    fn corrupt_slice_is_ignored() {
        let storage = LocalStorage::in_memory();
        storage.set("pinia-demo", "{not json").unwrap();

        assert_eq!(restore_slice::<Slice>(&storage, "demo"), None);
    }
}
