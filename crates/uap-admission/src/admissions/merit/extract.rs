use std::sync::OnceLock;

use regex::Regex;

use crate::admissions::sources::RandomSource;

fn gpa_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)GPA\s*[:\-]?\s*([0-9.]+)").expect("GPA pattern compiles")
    })
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("digit pattern compiles"))
}

/// Where a merit input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    Parsed,
    Estimated,
}

/// GPA written after a `GPA` marker in the education text.
pub(crate) fn parse_gpa(education: &str) -> Option<f64> {
    gpa_pattern()
        .captures(education)
        .and_then(|captures| captures.get(1))
        .and_then(|value| value.as_str().parse::<f64>().ok())
        .filter(|gpa| gpa.is_finite())
}

/// First run of digits in the exam roll, folded into `0..=100`.
pub(crate) fn parse_exam(exam_roll: &str) -> Option<u32> {
    let digits = digits_pattern().find(exam_roll)?;
    // fold digit by digit; rolls can be longer than any integer type
    let folded = digits
        .as_str()
        .bytes()
        .fold(0u32, |acc, digit| (acc * 10 + u32::from(digit - b'0')) % 101);
    Some(folded)
}

pub(crate) fn estimate_gpa(random: &dyn RandomSource) -> f64 {
    round_to(3.5 + random.next_unit() * 1.5, 2)
}

pub(crate) fn estimate_exam(random: &dyn RandomSource) -> u32 {
    (40.0 + random.next_unit() * 60.0).round() as u32
}

pub(crate) fn gpa_or_estimate(education: &str, random: &dyn RandomSource) -> (f64, InputSource) {
    match parse_gpa(education) {
        Some(gpa) => (gpa, InputSource::Parsed),
        None => (estimate_gpa(random), InputSource::Estimated),
    }
}

pub(crate) fn exam_or_estimate(exam_roll: &str, random: &dyn RandomSource) -> (u32, InputSource) {
    match parse_exam(exam_roll) {
        Some(exam) => (exam, InputSource::Parsed),
        None => (estimate_exam(random), InputSource::Estimated),
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
