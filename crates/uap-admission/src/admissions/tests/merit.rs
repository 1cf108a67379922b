use super::common::*;
use chrono::Duration;

use crate::admissions::domain::{ApplicationId, Department};
use crate::admissions::merit::{self, InputSource, MeritWeights, CSV_HEADER};
use crate::admissions::repository::ApplicationRecord;
use crate::admissions::sources::ScriptedRandom;

fn scored(name: &str, education: &str, exam_roll: &str) -> crate::admissions::ApplicationSubmission {
    let mut raw = submission(name, "CSE", "");
    raw.applicant.education = education.to_string();
    raw.applicant.exam_roll = exam_roll.to_string();
    raw
}

#[test]
fn default_weights_rank_higher_gpa_first() {
    let (service, _, clock) = build_service();
    service
        .submit(scored("Second Place", "HSC GPA: 3.0", "100"))
        .expect("submission succeeds");
    clock.advance(Duration::seconds(1));
    service
        .submit(scored("First Place", "HSC GPA: 4.0", "80"))
        .expect("submission succeeds");

    let rows = service.merit(None).expect("merit");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "First Place");
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[0].score, 4.0);
    assert_eq!(rows[0].gpa_source, InputSource::Parsed);
    assert_eq!(rows[1].name, "Second Place");
    assert_eq!(rows[1].rank, 2);
    assert_eq!(rows[1].score, 3.8);
}

#[test]
fn equal_scores_break_ties_by_submission_time() {
    let earlier = start();
    let later = start() + Duration::minutes(5);
    let record = |id: &str, at| {
        ApplicationRecord::new(
            ApplicationId(id.to_string()),
            scored(id, "GPA 4.25", "75")
                .validate()
                .expect("valid submission"),
            at,
        )
    };
    let records = vec![record("UAPLATE00001", later), record("UAPEARLY0001", earlier)];

    let rows = merit::rank(
        &records,
        MeritWeights::default(),
        &ScriptedRandom::constant(0.0),
    );

    assert_eq!(rows[0].score, rows[1].score);
    assert_eq!(rows[0].application_id.as_str(), "UAPEARLY0001");
    assert_eq!(rows[1].application_id.as_str(), "UAPLATE00001");
}

#[test]
fn unparseable_inputs_fall_back_to_estimates() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(0.5));
    service
        .submit(scored("No Marks", "Science group", "roll pending"))
        .expect("submission succeeds");

    let rows = service.merit(None).expect("merit");

    assert_eq!(rows[0].gpa, 4.25);
    assert_eq!(rows[0].gpa_source, InputSource::Estimated);
    assert_eq!(rows[0].exam, 70);
    assert_eq!(rows[0].exam_source, InputSource::Estimated);
    assert_eq!(rows[0].score, 3.95);
}

#[test]
fn custom_weights_change_the_order() {
    let (service, _, _) = build_service();
    service
        .submit(scored("Strong Exam", "GPA: 3.0", "100"))
        .expect("submission succeeds");
    service
        .submit(scored("Strong GPA", "GPA: 5.0", "60"))
        .expect("submission succeeds");

    let exam_heavy = MeritWeights::new(10.0, 90.0).expect("valid weights");
    let rows = service.merit(Some(exam_heavy)).expect("merit");
    assert_eq!(rows[0].name, "Strong Exam");
    assert_eq!(rows[0].score, 4.8);
    assert_eq!(rows[1].score, 3.2);

    let rows = service.merit(None).expect("merit");
    assert_eq!(rows[0].name, "Strong GPA");
    assert_eq!(rows[0].score, 4.2);
    assert_eq!(rows[1].score, 3.8);
}

#[test]
fn csv_export_quotes_every_field() {
    let (service, _, _) = build_service();
    service
        .submit(scored("Nadia \"Nini\" Islam", "GPA: 4.0", "80"))
        .expect("submission succeeds");
    let rows = service.merit(None).expect("merit");

    let mut out = Vec::new();
    merit::write_csv(&rows, &mut out).expect("csv writes");
    let text = String::from_utf8(out).expect("utf8");
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some(CSV_HEADER));
    assert_eq!(
        lines.next(),
        Some(
            format!(
                "\"{}\",\"Nadia \"\"Nini\"\" Islam\",\"CSE\",\"4\",\"80\",\"4\"",
                rows[0].application_id
            )
            .as_str()
        )
    );
    assert_eq!(lines.next(), None);
    assert_eq!(rows[0].department, Department::Cse);
}

#[test]
fn empty_store_ranks_nothing() {
    let (service, _, _) = build_service();
    assert!(service.merit(None).expect("merit").is_empty());

    let mut out = Vec::new();
    merit::write_csv(&[], &mut out).expect("csv writes");
    assert_eq!(String::from_utf8(out).expect("utf8"), format!("{CSV_HEADER}\n"));
}
