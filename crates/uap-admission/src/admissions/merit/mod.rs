//! Weighted GPA/exam ranking over the stored applications.
//!
//! Rows are recomputed on every request and never persisted: applicants without a parseable
//! GPA or exam roll get randomized estimates, so two generations can disagree.

mod export;
mod extract;

pub use export::{write_csv, CSV_HEADER};
pub use extract::InputSource;

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, Department};
use super::repository::ApplicationRecord;
use super::sources::RandomSource;
use extract::{exam_or_estimate, gpa_or_estimate, round_to};

/// Percent weights applied to GPA and normalized exam score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct MeritWeights {
    gpa: f64,
    exam: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    gpa: Option<f64>,
    exam: Option<f64>,
}

impl TryFrom<RawWeights> for MeritWeights {
    type Error = MeritError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        let defaults = MeritWeights::default();
        MeritWeights::new(
            raw.gpa.unwrap_or(defaults.gpa),
            raw.exam.unwrap_or(defaults.exam),
        )
    }
}

impl Default for MeritWeights {
    fn default() -> Self {
        Self {
            gpa: 60.0,
            exam: 40.0,
        }
    }
}

impl MeritWeights {
    pub fn new(gpa: f64, exam: f64) -> Result<Self, MeritError> {
        let valid = |weight: f64| weight.is_finite() && weight >= 0.0;
        if !valid(gpa) || !valid(exam) {
            return Err(MeritError::InvalidWeights { gpa, exam });
        }
        Ok(Self { gpa, exam })
    }

    pub fn gpa(&self) -> f64 {
        self.gpa
    }

    pub fn exam(&self) -> f64 {
        self.exam
    }

    /// Composite on the 0-5 scale, rounded to three decimals.
    pub fn composite(&self, gpa: f64, exam_normalized: f64) -> f64 {
        round_to(
            (self.gpa / 100.0) * gpa + (self.exam / 100.0) * exam_normalized,
            3,
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeritError {
    #[error("merit weights must be finite and non-negative (gpa {gpa}, exam {exam})")]
    InvalidWeights { gpa: f64, exam: f64 },
}

/// One ranked applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeritRow {
    pub rank: usize,
    pub application_id: ApplicationId,
    pub name: String,
    pub department: Department,
    pub gpa: f64,
    pub gpa_source: InputSource,
    /// Raw exam score in `0..=100`.
    pub exam: u32,
    pub exam_source: InputSource,
    pub score: f64,
    #[serde(skip)]
    applied_at: DateTime<Utc>,
}

/// Exam raw score mapped onto the GPA scale.
pub fn normalize_exam(exam: u32) -> f64 {
    f64::from(exam) / 100.0 * 5.0
}

/// Score and order applications: score desc, then GPA desc, then earliest submission.
pub fn rank(
    records: &[ApplicationRecord],
    weights: MeritWeights,
    random: &dyn RandomSource,
) -> Vec<MeritRow> {
    let mut rows: Vec<MeritRow> = records
        .iter()
        .map(|record| {
            let (gpa, gpa_source) = gpa_or_estimate(&record.applicant.education, random);
            let (exam, exam_source) = exam_or_estimate(&record.applicant.exam_roll, random);
            MeritRow {
                rank: 0,
                application_id: record.id().clone(),
                name: record.applicant.name.clone(),
                department: record.department,
                gpa,
                gpa_source,
                exam,
                exam_source,
                score: weights.composite(gpa, normalize_exam(exam)),
                applied_at: record.applied_at(),
            }
        })
        .collect();

    rows.sort_by(compare_rows);
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    rows
}

fn compare_rows(a: &MeritRow, b: &MeritRow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.gpa.total_cmp(&a.gpa))
        .then_with(|| a.applied_at.cmp(&b.applied_at))
}
