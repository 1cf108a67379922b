use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::admissions::domain::{ApplicantDetails, ApplicationSubmission, AttachedFiles, StagedFile};
use crate::admissions::sources::{ManualClock, ScriptedRandom};
use crate::admissions::{admission_router, AdmissionService};
use crate::storage::{KeyValueStore, MemoryKeyValueStore, StorageError};

pub(super) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn submission(name: &str, department: &str, program: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        applicant: ApplicantDetails {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_ascii_lowercase().replace(' ', ".")),
            phone: "+8801711000000".to_string(),
            guardian: "Rahim Uddin".to_string(),
            address: "Farmgate, Dhaka".to_string(),
            education: "HSC 2024, GPA: 4.50".to_string(),
            exam_roll: "72".to_string(),
        },
        department: department.to_string(),
        program: program.to_string(),
        files: AttachedFiles::default(),
    }
}

pub(super) fn upload(name: &str, media_type: &str, bytes: &[u8]) -> StagedFile {
    StagedFile {
        name: name.to_string(),
        size: bytes.len() as u64,
        media_type: media_type.to_string(),
        content: STANDARD.encode(bytes),
    }
}

pub(super) fn with_photo(mut submission: ApplicationSubmission) -> ApplicationSubmission {
    submission.files.photo = Some(upload("photo.png", "image/png", b"\x89PNG\r\n"));
    submission
}

pub(super) fn with_signature(mut submission: ApplicationSubmission) -> ApplicationSubmission {
    submission.files.signature = Some(upload("sign.png", "image/png", b"\x89PNG-sig"));
    submission
}

pub(super) type MemoryService = AdmissionService<MemoryKeyValueStore>;

pub(super) fn build_service() -> (MemoryService, Arc<MemoryKeyValueStore>, Arc<ManualClock>) {
    build_service_with_random(ScriptedRandom::constant(0.5))
}

pub(super) fn build_service_with_random(
    random: ScriptedRandom,
) -> (MemoryService, Arc<MemoryKeyValueStore>, Arc<ManualClock>) {
    let backend = Arc::new(MemoryKeyValueStore::default());
    let clock = Arc::new(ManualClock::new(start()));
    let service = AdmissionService::with_sources(backend.clone(), clock.clone(), Arc::new(random));
    (service, backend, clock)
}

/// Backend that refuses every call.
pub(super) struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("disk offline".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk offline".to_string()))
    }
}

/// In-memory backend that counts writes.
#[derive(Default)]
pub(super) struct CountingStore {
    inner: MemoryKeyValueStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }
}

pub(super) fn router_with_service(service: MemoryService) -> (axum::Router, Arc<MemoryService>) {
    let service = Arc::new(service);
    (admission_router(service.clone()), service)
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
