use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uap_admission::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Backend chosen at startup: a data directory when one is configured, memory otherwise.
pub(crate) enum PortalStore {
    Memory(MemoryKeyValueStore),
    Directory(FileKeyValueStore),
}

impl PortalStore {
    pub(crate) fn open(data_dir: Option<&Path>) -> Result<Self, StorageError> {
        match data_dir {
            Some(dir) => Ok(Self::Directory(FileKeyValueStore::open(dir)?)),
            None => Ok(Self::Memory(MemoryKeyValueStore::default())),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            PortalStore::Memory(_) => "memory".to_string(),
            PortalStore::Directory(store) => store.root().display().to_string(),
        }
    }
}

impl KeyValueStore for PortalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            PortalStore::Memory(store) => store.get(key),
            PortalStore::Directory(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            PortalStore::Memory(store) => store.set(key, value),
            PortalStore::Directory(store) => store.set(key, value),
        }
    }
}
