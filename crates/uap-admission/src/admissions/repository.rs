use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    ApplicantDetails, ApplicationId, ApplicationStatus, AttachedFiles, Department, Program,
    TransitionError, ValidatedSubmission,
};
use crate::storage::{Applications, KeyValueStore, PersistenceAdapter, StorageError};

const ID_PREFIX: &str = "UAP";
const ID_TOKEN_LEN: usize = 9;

/// Persisted application. Identity, fee and receipt are fixed once set; status only moves
/// through [`ApplicationRecord::transition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    id: ApplicationId,
    #[serde(flatten)]
    pub applicant: ApplicantDetails,
    #[serde(rename = "dept")]
    pub department: Department,
    pub program: Program,
    #[serde(default)]
    pub files: AttachedFiles,
    fee: u32,
    status: ApplicationStatus,
    applied_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    receipt: Option<String>,
}

impl ApplicationRecord {
    pub fn new(id: ApplicationId, submission: ValidatedSubmission, applied_at: DateTime<Utc>) -> Self {
        let ValidatedSubmission {
            applicant,
            department,
            program,
            files,
        } = submission;

        Self {
            id,
            applicant,
            department,
            program,
            files,
            fee: program.fee(),
            status: ApplicationStatus::Submitted,
            applied_at,
            paid_at: None,
            receipt: None,
        }
    }

    pub fn id(&self) -> &ApplicationId {
        &self.id
    }

    pub fn fee(&self) -> u32 {
        self.fee
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn receipt(&self) -> Option<&str> {
        self.receipt.as_deref()
    }

    pub fn transition(&mut self, next: ApplicationStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Complete payment: `paid`, paid timestamp, and the receipt if none was issued yet.
    pub fn mark_paid(&mut self, paid_at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(ApplicationStatus::Paid)?;
        self.paid_at = Some(paid_at);
        if self.receipt.is_none() {
            self.receipt = Some(self.render_receipt(paid_at));
        }
        Ok(())
    }

    fn render_receipt(&self, paid_at: DateTime<Utc>) -> String {
        format!(
            "UAP RECEIPT\nAppID: {}\nName: {}\nProgram: {}\nDept: {}\nAmount: {} BDT\nPaidAt: {}",
            self.id,
            self.applicant.name,
            self.program,
            self.department,
            self.fee,
            paid_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.id.clone(),
            name: self.applicant.name.clone(),
            department: self.department,
            program: self.program,
            status: self.status.label(),
            fee: self.fee,
            files: self
                .files
                .present_slots()
                .into_iter()
                .map(|slot| slot.label())
                .collect(),
            applied_at: self.applied_at,
            paid_at: self.paid_at,
        }
    }
}

/// Public projection of a record without file contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub name: String,
    pub department: Department,
    pub program: Program,
    pub status: &'static str,
    pub fee: u32,
    pub files: Vec<&'static str>,
    pub applied_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// CRUD over the application collection. Every mutation rewrites the whole collection.
pub struct ApplicationStore<S> {
    adapter: PersistenceAdapter<S>,
}

impl<S> Clone for ApplicationStore<S> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
        }
    }
}

impl<S: KeyValueStore> ApplicationStore<S> {
    pub fn new(adapter: PersistenceAdapter<S>) -> Self {
        Self { adapter }
    }

    pub fn create(
        &self,
        submission: ValidatedSubmission,
        now: DateTime<Utc>,
    ) -> Result<ApplicationRecord, StorageError> {
        let mut records = self.adapter.load::<Applications>()?;
        let id = unique_id(&records, now);
        let record = ApplicationRecord::new(id, submission, now);
        records.push(record.clone());
        self.adapter.save::<Applications>(&records)?;
        Ok(record)
    }

    pub fn list(&self) -> Result<Vec<ApplicationRecord>, StorageError> {
        self.adapter.load::<Applications>()
    }

    pub fn find(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, StorageError> {
        Ok(self.list()?.into_iter().find(|record| &record.id == id))
    }

    pub fn list_by_department(
        &self,
        department: Department,
    ) -> Result<Vec<ApplicationRecord>, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| record.department == department)
            .collect())
    }

    /// Apply `mutate` to one record and persist. `Ok(None)` when the id is unknown; nothing
    /// is written when the mutator fails.
    pub fn update<T, E, F>(&self, id: &ApplicationId, mutate: F) -> Result<Option<T>, E>
    where
        F: FnOnce(&mut ApplicationRecord) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut records = self.adapter.load::<Applications>()?;
        let Some(record) = records.iter_mut().find(|record| &record.id == id) else {
            return Ok(None);
        };

        let outcome = mutate(record)?;
        self.adapter.save::<Applications>(&records)?;
        Ok(Some(outcome))
    }

    /// Apply `mutate` to every record, persisting once if any call reported a change.
    pub fn update_all<F>(&self, mut mutate: F) -> Result<usize, StorageError>
    where
        F: FnMut(&mut ApplicationRecord) -> bool,
    {
        let mut records = self.adapter.load::<Applications>()?;
        let changed = records
            .iter_mut()
            .map(|record| mutate(record))
            .filter(|changed| *changed)
            .count();

        if changed > 0 {
            self.adapter.save::<Applications>(&records)?;
        }
        Ok(changed)
    }

    /// Remove a record. `Ok(None)` when the id is unknown.
    pub fn delete(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, StorageError> {
        let mut records = self.adapter.load::<Applications>()?;
        let Some(index) = records.iter().position(|record| &record.id == id) else {
            return Ok(None);
        };

        let removed = records.remove(index);
        self.adapter.save::<Applications>(&records)?;
        Ok(Some(removed))
    }
}

/// `UAP` + the trailing base-36 digits of the microsecond timestamp, bumped past collisions.
fn unique_id(records: &[ApplicationRecord], now: DateTime<Utc>) -> ApplicationId {
    let mut stamp = now.timestamp_micros().unsigned_abs();
    loop {
        let candidate = ApplicationId(format!("{ID_PREFIX}{}", base36_token(stamp)));
        if records.iter().all(|record| record.id != candidate) {
            return candidate;
        }
        warn!(id = %candidate, "application id collision, bumping timestamp");
        stamp = stamp.wrapping_add(1);
    }
}

fn base36_token(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut token = [b'0'; ID_TOKEN_LEN];
    for slot in token.iter_mut().rev() {
        *slot = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    token.iter().map(|digit| char::from(*digit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_token_is_fixed_width_uppercase() {
        assert_eq!(base36_token(0), "000000000");
        assert_eq!(base36_token(35), "00000000Z");
        assert_eq!(base36_token(36), "000000010");
        let token = base36_token(1_760_000_000_123_456);
        assert_eq!(token.len(), ID_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
