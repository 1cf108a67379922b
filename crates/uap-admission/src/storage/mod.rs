//! Whole-collection persistence over a pluggable key-value backend.
//!
//! Each collection lives under one fixed key and is rewritten in full on every save, so the
//! last writer wins. Components receive a [`PersistenceAdapter`] instead of reaching for
//! shared globals.

mod backend;

pub use backend::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::admissions::domain::Department;
use crate::admissions::repository::ApplicationRecord;

/// A named collection with a typed value and a default for first use.
pub trait Collection {
    const KEY: &'static str;
    /// Persist the default the first time the collection is loaded.
    const SEED_ON_LOAD: bool;

    type Value: Serialize + DeserializeOwned;

    fn default_value() -> Self::Value;
}

/// Submitted applications, in insertion order.
pub struct Applications;

impl Collection for Applications {
    const KEY: &'static str = "uap_applications";
    const SEED_ON_LOAD: bool = false;

    type Value = Vec<ApplicationRecord>;

    fn default_value() -> Self::Value {
        Vec::new()
    }
}

/// Remaining seats keyed by department code.
pub struct Seats;

impl Collection for Seats {
    const KEY: &'static str = "uap_seats";
    const SEED_ON_LOAD: bool = true;

    type Value = BTreeMap<String, u32>;

    fn default_value() -> Self::Value {
        Department::ALL
            .iter()
            .map(|department| (department.code().to_string(), department.initial_seats()))
            .collect()
    }
}

/// Storage failure; fatal to whichever operation triggered it.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("collection '{key}' could not be (de)serialized: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Typed load/save of collections against an injected backend.
pub struct PersistenceAdapter<S> {
    backend: Arc<S>,
}

impl<S> Clone for PersistenceAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(backend: Arc<S>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<S> {
        &self.backend
    }

    /// Stored value, or the collection default when the key is absent.
    pub fn load<C: Collection>(&self) -> Result<C::Value, StorageError> {
        match self.backend.get(C::KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Serialization {
                key: C::KEY.to_string(),
                source,
            }),
            None => {
                let value = C::default_value();
                if C::SEED_ON_LOAD {
                    debug!(key = C::KEY, "seeding collection");
                    self.save::<C>(&value)?;
                }
                Ok(value)
            }
        }
    }

    /// Overwrite the whole collection.
    pub fn save<C: Collection>(&self, value: &C::Value) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
            key: C::KEY.to_string(),
            source,
        })?;
        self.backend.set(C::KEY, &raw)
    }
}
