//! Admission portal core.
//!
//! Application records move through a fixed status machine, draw from a per-department seat
//! ledger when accepted, and are persisted as whole collections in an injected key-value
//! store. Payments are simulated and merit rankings are derived on demand.

pub mod admissions;
pub mod config;
pub mod error;
pub mod storage;
pub mod telemetry;
pub mod tuition;
