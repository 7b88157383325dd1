//! Small key-value persistence port (dismissed banners, UI flags).

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    #[error("browser storage unavailable")]
    StorageUnavailable,

    #[error("storage error: {0}")]
    Io(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&mut self, key: &str) -> Result<bool, KvError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, KvError> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{KeyValueStore, KvError};

    /// `window.localStorage`, with every key namespaced under `key_prefix`.
    #[derive(Debug)]
    pub struct LocalStorageStore {
        key_prefix: String,
    }

    impl LocalStorageStore {
        pub fn new(key_prefix: impl Into<String>) -> Result<Self, KvError> {
            // Fail early rather than on first use.
            window_local_storage()?;
            Ok(Self {
                key_prefix: key_prefix.into(),
            })
        }

        fn full_key(&self, key: &str) -> String {
            format!("{}.{}", self.key_prefix, key)
        }
    }

    impl KeyValueStore for LocalStorageStore {
        fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            window_local_storage()?
                .get_item(&self.full_key(key))
                .map_err(|e| KvError::Io(format!("get_item failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
            window_local_storage()?
                .set_item(&self.full_key(key), value)
                .map_err(|e| KvError::Io(format!("set_item failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<bool, KvError> {
            let existed = self.get(key)?.is_some();
            if existed {
                window_local_storage()?
                    .remove_item(&self.full_key(key))
                    .map_err(|e| KvError::Io(format!("remove_item failed: {:?}", e)))?;
            }
            Ok(existed)
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, KvError> {
        let win = web_sys::window().ok_or(KvError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| KvError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(KvError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageStore {
    pub fn new(_key_prefix: impl Into<String>) -> Result<Self, KvError> {
        Err(KvError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl KeyValueStore for LocalStorageStore {
    fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Err(KvError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::StorageUnavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<bool, KvError> {
        Err(KvError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_and_removes() {
        let mut kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get("banner"), Ok(None));
        kv.set("banner", "dismissed").unwrap();
        assert_eq!(kv.get("banner"), Ok(Some("dismissed".to_string())));
        assert_eq!(kv.remove("banner"), Ok(true));
        assert_eq!(kv.remove("banner"), Ok(false));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn local_storage_is_unavailable_natively() {
        assert_eq!(
            LocalStorageStore::new("veda").err(),
            Some(KvError::StorageUnavailable)
        );
    }
}
