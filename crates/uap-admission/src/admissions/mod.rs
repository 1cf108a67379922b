//! Admission intake, seat allocation, mock payment, and merit ranking.
//!
//! [`AdmissionService`] is the only writer: it owns the record store and seat ledger over one
//! shared key-value backend and is driven by HTTP handlers and a host-invoked
//! [`LifecycleScheduler`] tick.

pub mod domain;
pub mod lifecycle;
pub mod merit;
pub mod payment;
pub mod repository;
pub mod router;
pub mod scheduler;
pub mod seats;
pub mod sources;
pub mod staging;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantDetails, ApplicationId, ApplicationStatus, ApplicationSubmission, AttachedFiles,
    Department, FileSlot, Program, StagedFile, SubmissionError, TransitionError,
    ValidatedSubmission,
};
pub use lifecycle::{Acceptance, AdmissionService, LifecycleError};
pub use merit::{MeritError, MeritRow, MeritWeights};
pub use payment::{PaymentEvent, PaymentProgress, PaymentSimulator};
pub use repository::{ApplicationRecord, ApplicationStatusView, ApplicationStore};
pub use router::admission_router;
pub use scheduler::{LifecycleScheduler, TickReport};
pub use seats::{SeatAvailability, SeatLedger};
pub use sources::{Clock, ManualClock, RandomSource, ScriptedRandom, SystemClock, ThreadRandom};
pub use staging::{FileStager, StagingError};
