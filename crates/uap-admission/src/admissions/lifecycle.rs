use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ApplicationId, ApplicationStatus, ApplicationSubmission, Department, SubmissionError,
    TransitionError,
};
use super::merit::{self, MeritRow, MeritWeights};
use super::payment::{PaymentEvent, PaymentSimulator};
use super::repository::{ApplicationRecord, ApplicationStore};
use super::seats::{SeatAvailability, SeatLedger};
use super::sources::{Clock, RandomSource, SystemClock, ThreadRandom};
use super::staging::{FileStager, StagingError};
use crate::storage::{KeyValueStore, PersistenceAdapter, StorageError};

/// Lifecycle controller: owns the record store, seat ledger and payment simulator over one
/// shared backend and enforces the status machine across them.
///
/// Read-modify-write cycles are serialized behind a single operation lock so concurrent
/// callers cannot interleave between a collection load and its save.
pub struct AdmissionService<S> {
    store: ApplicationStore<S>,
    seats: SeatLedger<S>,
    payments: PaymentSimulator,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    merit_weights: MeritWeights,
    operations: Mutex<()>,
}

/// Result of a successful acceptance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Acceptance {
    pub record: ApplicationRecord,
    pub seats_left: u32,
}

/// Error raised by lifecycle operations. Unknown ids are not errors; they yield `None`.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Upload(#[from] StagingError),
    #[error("no seats left in {department}")]
    NoSeatsRemaining { department: Department },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("payment refused for {id}: application is already {status}")]
    PaymentRefused {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("payment already in progress for {id}")]
    PaymentInProgress { id: ApplicationId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl<S: KeyValueStore> AdmissionService<S> {
    pub fn new(backend: Arc<S>) -> Self {
        Self::with_sources(backend, Arc::new(SystemClock), Arc::new(ThreadRandom))
    }

    pub fn with_sources(
        backend: Arc<S>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let adapter = PersistenceAdapter::new(backend);
        Self {
            store: ApplicationStore::new(adapter.clone()),
            seats: SeatLedger::new(adapter),
            payments: PaymentSimulator::new(),
            clock,
            random,
            merit_weights: MeritWeights::default(),
            operations: Mutex::new(()),
        }
    }

    pub fn with_merit_weights(mut self, weights: MeritWeights) -> Self {
        self.merit_weights = weights;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.operations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn merit_weights(&self) -> MeritWeights {
        self.merit_weights
    }

    pub fn payments(&self) -> &PaymentSimulator {
        &self.payments
    }

    /// Validate and store a new application in `submitted`.
    pub fn submit(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, LifecycleError> {
        let mut validated = submission.validate()?;

        let mut stager = FileStager::new();
        stager.stage_all(std::mem::take(&mut validated.files))?;
        validated.files = stager.into_files();

        if validated.files.photo.is_none() || validated.files.transcript.is_none() {
            warn!(
                name = %validated.applicant.name,
                "submission without photo or transcript"
            );
        }

        let _guard = self.lock();
        let record = self.store.create(validated, self.clock.now())?;
        info!(
            id = %record.id(),
            department = %record.department,
            program = %record.program,
            fee = record.fee(),
            "application submitted"
        );
        Ok(record)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, LifecycleError> {
        Ok(self.store.find(id)?)
    }

    pub fn list(&self) -> Result<Vec<ApplicationRecord>, LifecycleError> {
        Ok(self.store.list()?)
    }

    pub fn list_by_department(
        &self,
        department: Department,
    ) -> Result<Vec<ApplicationRecord>, LifecycleError> {
        Ok(self.store.list_by_department(department)?)
    }

    pub fn seats(&self) -> Result<Vec<SeatAvailability>, LifecycleError> {
        Ok(self.seats.snapshot()?)
    }

    pub fn remaining_seats(&self, department: Department) -> Result<u32, LifecycleError> {
        Ok(self.seats.remaining(department)?)
    }

    /// Accept an application and take one seat from its department.
    ///
    /// Fails without touching anything when the department is full or the record is
    /// already terminal.
    pub fn accept(&self, id: &ApplicationId) -> Result<Option<Acceptance>, LifecycleError> {
        let _guard = self.lock();
        let Some(current) = self.store.find(id)? else {
            return Ok(None);
        };

        if current.status().is_terminal() {
            return Err(TransitionError {
                id: id.clone(),
                from: current.status(),
                to: ApplicationStatus::Accepted,
            }
            .into());
        }

        let department = current.department;
        if self.seats.remaining(department)? == 0 {
            warn!(%id, %department, "acceptance refused, no seats left");
            return Err(LifecycleError::NoSeatsRemaining { department });
        }

        let Some(record) = self.store.update(id, |record| {
            record.transition(ApplicationStatus::Accepted)?;
            Ok::<_, LifecycleError>(record.clone())
        })?
        else {
            return Ok(None);
        };

        self.payments.cancel(id);
        let seats_left = self.seats.decrement(department)?;
        info!(%id, %department, seats_left, "application accepted");
        Ok(Some(Acceptance { record, seats_left }))
    }

    /// Reject an application. Rejecting twice is a no-op; an accepted record stays accepted.
    pub fn reject(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, LifecycleError> {
        let _guard = self.lock();
        let rejected = self.store.update(id, |record| {
            if record.status() != ApplicationStatus::Rejected {
                record.transition(ApplicationStatus::Rejected)?;
            }
            Ok::<_, LifecycleError>(record.clone())
        })?;

        if rejected.is_some() {
            self.payments.cancel(id);
            info!(%id, "application rejected");
        }
        Ok(rejected)
    }

    /// Remove an application. Seats taken by an accepted application are not returned.
    pub fn delete(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, LifecycleError> {
        let _guard = self.lock();
        let removed = self.store.delete(id)?;
        if let Some(record) = &removed {
            self.payments.cancel(id);
            if record.status() == ApplicationStatus::Accepted {
                warn!(
                    %id,
                    department = %record.department,
                    "deleted accepted application; seat not restored"
                );
            } else {
                info!(%id, "application deleted");
            }
        }
        Ok(removed)
    }

    /// Start the mock payment flow.
    pub fn begin_payment(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, LifecycleError> {
        let _guard = self.lock();
        self.payments.begin(&self.store, id)
    }

    /// One payment-simulator step; settled payments are stamped with `now`.
    pub fn advance_payments(&self, now: DateTime<Utc>) -> Result<Vec<PaymentEvent>, LifecycleError> {
        let _guard = self.lock();
        Ok(self.payments.advance(&self.store, self.random.as_ref(), now)?)
    }

    /// Status sweep: `submitted` with any document becomes `docs_verified`, `paid` with a
    /// photo or transcript becomes `verified`. Returns how many records moved.
    pub fn sweep(&self) -> Result<usize, LifecycleError> {
        let _guard = self.lock();
        let advanced = self.store.update_all(|record| match record.status() {
            ApplicationStatus::Submitted if record.files.has_any() => record
                .transition(ApplicationStatus::DocsVerified)
                .is_ok(),
            ApplicationStatus::Paid if record.files.has_identity_documents() => {
                record.transition(ApplicationStatus::Verified).is_ok()
            }
            _ => false,
        })?;

        if advanced > 0 {
            info!(advanced, "status sweep advanced applications");
        }
        Ok(advanced)
    }

    /// Rank every stored application. `None` uses the configured weights.
    pub fn merit(&self, weights: Option<MeritWeights>) -> Result<Vec<MeritRow>, LifecycleError> {
        let records = self.store.list()?;
        Ok(merit::rank(
            &records,
            weights.unwrap_or(self.merit_weights),
            self.random.as_ref(),
        ))
    }
}
