use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::domain::Department;
use crate::storage::{KeyValueStore, PersistenceAdapter, Seats, StorageError};

/// Remaining admission slots per department.
pub struct SeatLedger<S> {
    adapter: PersistenceAdapter<S>,
}

impl<S> Clone for SeatLedger<S> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
        }
    }
}

impl<S: KeyValueStore> SeatLedger<S> {
    pub fn new(adapter: PersistenceAdapter<S>) -> Self {
        Self { adapter }
    }

    /// A department missing from the stored map has no seats.
    pub fn remaining(&self, department: Department) -> Result<u32, StorageError> {
        let seats = self.adapter.load::<Seats>()?;
        Ok(seats.get(department.code()).copied().unwrap_or(0))
    }

    /// Take one seat, saturating at zero, and persist. Returns the new count.
    pub fn decrement(&self, department: Department) -> Result<u32, StorageError> {
        let mut seats = self.adapter.load::<Seats>()?;
        let entry = seats.entry(department.code().to_string()).or_insert(0);
        *entry = entry.saturating_sub(1);
        let left = *entry;
        self.adapter.save::<Seats>(&seats)?;
        debug!(%department, left, "seat taken");
        Ok(left)
    }

    pub fn snapshot(&self) -> Result<Vec<SeatAvailability>, StorageError> {
        let seats: BTreeMap<String, u32> = self.adapter.load::<Seats>()?;
        Ok(Department::ALL
            .into_iter()
            .map(|department| SeatAvailability {
                department,
                remaining: seats.get(department.code()).copied().unwrap_or(0),
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatAvailability {
    pub department: Department,
    pub remaining: u32,
}
