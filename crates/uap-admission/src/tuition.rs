//! Tuition estimate shown on the admission info page.

use serde::{Deserialize, Serialize};

/// Semesters in a standard undergraduate program.
pub const SEMESTERS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuitionRequest {
    pub credits: f64,
    pub per_credit_fee: f64,
    #[serde(default)]
    pub scholarship_pct: f64,
}

/// Whole-taka amounts for a degree at a flat per-credit rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TuitionQuote {
    pub total: f64,
    pub after_scholarship: f64,
    pub per_semester: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TuitionError {
    #[error("credits must be greater than zero (got {0})")]
    Credits(f64),
    #[error("per-credit fee must be greater than zero (got {0})")]
    Fee(f64),
    #[error("scholarship must be between 0 and 100 percent (got {0})")]
    Scholarship(f64),
}

impl TuitionQuote {
    pub fn calculate(
        credits: f64,
        per_credit_fee: f64,
        scholarship_pct: f64,
    ) -> Result<Self, TuitionError> {
        if !(credits.is_finite() && credits > 0.0) {
            return Err(TuitionError::Credits(credits));
        }
        if !(per_credit_fee.is_finite() && per_credit_fee > 0.0) {
            return Err(TuitionError::Fee(per_credit_fee));
        }
        if !(0.0..=100.0).contains(&scholarship_pct) {
            return Err(TuitionError::Scholarship(scholarship_pct));
        }

        let total = credits * per_credit_fee;
        let after_scholarship = total * (1.0 - scholarship_pct / 100.0);
        Ok(Self {
            total: total.round(),
            after_scholarship: after_scholarship.round(),
            per_semester: (after_scholarship / f64::from(SEMESTERS)).round(),
        })
    }
}

impl TryFrom<TuitionRequest> for TuitionQuote {
    type Error = TuitionError;

    fn try_from(request: TuitionRequest) -> Result<Self, Self::Error> {
        TuitionQuote::calculate(
            request.credits,
            request.per_credit_fee,
            request.scholarship_pct,
        )
    }
}
