use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{ApplicationId, ApplicationStatus};
use super::lifecycle::LifecycleError;
use super::repository::{ApplicationRecord, ApplicationStore};
use super::sources::RandomSource;
use crate::storage::{KeyValueStore, StorageError};

/// Progress at which a simulated payment settles.
pub const PAYMENT_COMPLETE: u32 = 100;
/// Largest progress step taken per payment tick.
pub const MAX_PROGRESS_STEP: f64 = 30.0;

/// Mock payment gateway: each active session creeps towards 100% on every tick.
#[derive(Debug, Default)]
pub struct PaymentSimulator {
    sessions: Mutex<BTreeMap<ApplicationId, u32>>,
}

/// What happened to one session during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    Progressed {
        application_id: ApplicationId,
        progress: u32,
    },
    Completed {
        application_id: ApplicationId,
        receipt: String,
    },
    /// The record vanished or left `payment_pending` before settlement.
    Abandoned {
        application_id: ApplicationId,
        status: Option<ApplicationStatus>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentProgress {
    pub application_id: ApplicationId,
    pub progress: u32,
}

impl PaymentSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, BTreeMap<ApplicationId, u32>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_active(&self, id: &ApplicationId) -> bool {
        self.sessions().contains_key(id)
    }

    pub fn active(&self) -> Vec<PaymentProgress> {
        self.sessions()
            .iter()
            .map(|(id, progress)| PaymentProgress {
                application_id: id.clone(),
                progress: *progress,
            })
            .collect()
    }

    /// Move the record to `payment_pending` and open a session at 0%.
    ///
    /// Refused when payment already completed, the record is terminal, or a session for the
    /// same application is still running.
    pub fn begin<S: KeyValueStore>(
        &self,
        store: &ApplicationStore<S>,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, LifecycleError> {
        if self.is_active(id) {
            return Err(LifecycleError::PaymentInProgress { id: id.clone() });
        }

        let started = store.update(id, |record| {
            if !record.status().accepts_payment() {
                return Err(LifecycleError::PaymentRefused {
                    id: record.id().clone(),
                    status: record.status(),
                });
            }
            record.transition(ApplicationStatus::PaymentPending)?;
            Ok(record.clone())
        })?;

        if let Some(record) = &started {
            self.sessions().insert(record.id().clone(), 0);
            info!(id = %record.id(), fee = record.fee(), "payment started");
        }
        Ok(started)
    }

    /// Drop a session without settling it.
    pub fn cancel(&self, id: &ApplicationId) -> bool {
        self.sessions().remove(id).is_some()
    }

    /// Advance every session by a random step; settle those reaching 100%.
    pub fn advance<S: KeyValueStore>(
        &self,
        store: &ApplicationStore<S>,
        random: &dyn RandomSource,
        now: DateTime<Utc>,
    ) -> Result<Vec<PaymentEvent>, StorageError> {
        let mut events = Vec::new();
        let mut settled = Vec::new();

        {
            let mut sessions = self.sessions();
            for (id, progress) in sessions.iter_mut() {
                let step = (random.next_unit() * MAX_PROGRESS_STEP).round() as u32;
                *progress = progress.saturating_add(step);
                if *progress >= PAYMENT_COMPLETE {
                    settled.push(id.clone());
                } else {
                    events.push(PaymentEvent::Progressed {
                        application_id: id.clone(),
                        progress: *progress,
                    });
                }
            }
            for id in &settled {
                sessions.remove(id);
            }
        }

        for id in settled {
            events.push(self.settle(store, id, now)?);
        }
        Ok(events)
    }

    fn settle<S: KeyValueStore>(
        &self,
        store: &ApplicationStore<S>,
        id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<PaymentEvent, StorageError> {
        let settled = store.update(&id, |record| -> Result<String, SettleError> {
            let status = record.status();
            record
                .mark_paid(now)
                .map_err(|_| SettleError::Refused(status))?;
            Ok(record.receipt().unwrap_or_default().to_string())
        });

        match settled {
            Ok(Some(receipt)) => {
                info!(%id, "payment completed");
                Ok(PaymentEvent::Completed {
                    application_id: id,
                    receipt,
                })
            }
            Ok(None) => {
                warn!(%id, "payment abandoned, application no longer exists");
                Ok(PaymentEvent::Abandoned {
                    application_id: id,
                    status: None,
                })
            }
            Err(SettleError::Refused(status)) => {
                warn!(%id, ?status, "payment abandoned");
                Ok(PaymentEvent::Abandoned {
                    application_id: id,
                    status: Some(status),
                })
            }
            Err(SettleError::Storage(source)) => Err(source),
        }
    }
}

/// Reasons a settlement leaves the stored record untouched.
enum SettleError {
    Refused(ApplicationStatus),
    Storage(StorageError),
}

impl From<StorageError> for SettleError {
    fn from(source: StorageError) -> Self {
        Self::Storage(source)
    }
}
