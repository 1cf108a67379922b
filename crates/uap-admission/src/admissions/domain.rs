use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Departments taking applications this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Department {
    #[serde(rename = "CSE")]
    Cse,
    #[serde(rename = "EEE")]
    Eee,
    Civil,
    Architecture,
    #[serde(rename = "BBA")]
    Bba,
}

impl Department {
    pub const ALL: [Department; 5] = [
        Department::Cse,
        Department::Eee,
        Department::Civil,
        Department::Architecture,
        Department::Bba,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Department::Cse => "CSE",
            Department::Eee => "EEE",
            Department::Civil => "Civil",
            Department::Architecture => "Architecture",
            Department::Bba => "BBA",
        }
    }

    /// Seats available before any acceptance.
    pub const fn initial_seats(self) -> u32 {
        match self {
            Department::Cse => 50,
            Department::Eee => 36,
            Department::Civil => 30,
            Department::Architecture => 16,
            Department::Bba => 40,
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Department {
    type Err = SubmissionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Department::ALL
            .into_iter()
            .find(|department| department.code().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| SubmissionError::UnknownDepartment(trimmed.to_string()))
    }
}

/// Degree level applied for; determines the application fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Program {
    Bachelors,
    Masters,
    Postgraduate,
}

impl Program {
    pub const fn label(self) -> &'static str {
        match self {
            Program::Bachelors => "bachelors",
            Program::Masters => "masters",
            Program::Postgraduate => "postgraduate",
        }
    }

    /// Application fee in BDT.
    pub const fn fee(self) -> u32 {
        match self {
            Program::Bachelors => 500,
            Program::Masters => 700,
            Program::Postgraduate => 900,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Program {
    type Err = SubmissionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "bachelors" => Ok(Program::Bachelors),
            "masters" => Ok(Program::Masters),
            "postgraduate" => Ok(Program::Postgraduate),
            other => Err(SubmissionError::UnknownProgram(other.to_string())),
        }
    }
}

/// Status tracked throughout the admission workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    DocsVerified,
    PaymentPending,
    Paid,
    Verified,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::DocsVerified => "docs_verified",
            ApplicationStatus::PaymentPending => "payment_pending",
            ApplicationStatus::Paid => "paid",
            ApplicationStatus::Verified => "verified",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected
        )
    }

    /// Payment can only start before any payment has completed.
    pub const fn accepts_payment(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted
                | ApplicationStatus::DocsVerified
                | ApplicationStatus::PaymentPending
        )
    }

    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        match (self, next) {
            (Submitted, DocsVerified) => true,
            (from, PaymentPending) => from.accepts_payment(),
            (PaymentPending, Paid) => true,
            (Paid, Verified) => true,
            (from, Accepted | Rejected) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attempted status change outside the transition table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("application {id} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub id: ApplicationId,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Free-text applicant details captured on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub guardian: String,
    #[serde(default)]
    pub address: String,
    /// May embed a `GPA: x.yz` marker.
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub exam_roll: String,
}

/// The three document slots on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSlot {
    Photo,
    #[serde(rename = "sign", alias = "signature")]
    Signature,
    Transcript,
}

impl FileSlot {
    pub const ALL: [FileSlot; 3] = [FileSlot::Photo, FileSlot::Signature, FileSlot::Transcript];

    pub const fn label(self) -> &'static str {
        match self {
            FileSlot::Photo => "photo",
            FileSlot::Signature => "sign",
            FileSlot::Transcript => "transcript",
        }
    }

    /// Upload ceiling in bytes.
    pub const fn max_size(self) -> u64 {
        match self {
            FileSlot::Photo | FileSlot::Signature => 5 * 1024 * 1024,
            FileSlot::Transcript => 10 * 1024 * 1024,
        }
    }
}

impl FromStr for FileSlot {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "photo" => Ok(FileSlot::Photo),
            "sign" | "signature" => Ok(FileSlot::Signature),
            "transcript" => Ok(FileSlot::Transcript),
            other => Err(format!("unknown file slot '{other}'")),
        }
    }
}

/// A document held inline with the application: metadata plus base64 content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub content: String,
}

impl StagedFile {
    pub fn is_image(&self) -> bool {
        self.media_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == mime::IMAGE)
            .unwrap_or(false)
    }
}

/// Optional documents attached to an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFiles {
    #[serde(default)]
    pub photo: Option<StagedFile>,
    #[serde(default, rename = "sign", alias = "signature")]
    pub signature: Option<StagedFile>,
    #[serde(default)]
    pub transcript: Option<StagedFile>,
}

impl AttachedFiles {
    pub fn get(&self, slot: FileSlot) -> Option<&StagedFile> {
        match slot {
            FileSlot::Photo => self.photo.as_ref(),
            FileSlot::Signature => self.signature.as_ref(),
            FileSlot::Transcript => self.transcript.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: FileSlot) -> &mut Option<StagedFile> {
        match slot {
            FileSlot::Photo => &mut self.photo,
            FileSlot::Signature => &mut self.signature,
            FileSlot::Transcript => &mut self.transcript,
        }
    }

    pub fn has_any(&self) -> bool {
        self.photo.is_some() || self.signature.is_some() || self.transcript.is_some()
    }

    /// Photo or transcript present; required before a paid application is verified.
    pub fn has_identity_documents(&self) -> bool {
        self.photo.is_some() || self.transcript.is_some()
    }

    pub fn present_slots(&self) -> Vec<FileSlot> {
        FileSlot::ALL
            .into_iter()
            .filter(|slot| self.get(*slot).is_some())
            .collect()
    }
}

/// Raw form input before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    #[serde(flatten)]
    pub applicant: ApplicantDetails,
    #[serde(alias = "dept")]
    pub department: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub files: AttachedFiles,
}

/// Submission validated into closed sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub applicant: ApplicantDetails,
    pub department: Department,
    pub program: Program,
    pub files: AttachedFiles,
}

impl ApplicationSubmission {
    pub fn validate(self) -> Result<ValidatedSubmission, SubmissionError> {
        let ApplicationSubmission {
            applicant,
            department,
            program,
            files,
        } = self;

        let applicant = ApplicantDetails {
            name: applicant.name.trim().to_string(),
            email: applicant.email.trim().to_string(),
            phone: applicant.phone.trim().to_string(),
            guardian: applicant.guardian.trim().to_string(),
            address: applicant.address.trim().to_string(),
            education: applicant.education.trim().to_string(),
            exam_roll: applicant.exam_roll.trim().to_string(),
        };

        let missing: Vec<&'static str> = [
            ("name", applicant.name.is_empty()),
            ("email", applicant.email.is_empty()),
            ("phone", applicant.phone.is_empty()),
            ("department", department.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, empty)| empty.then_some(field))
        .collect();

        if !missing.is_empty() {
            return Err(SubmissionError::MissingFields(missing));
        }

        Ok(ValidatedSubmission {
            applicant,
            department: department.parse()?,
            program: program.parse()?,
            files,
        })
    }
}

/// Rejected submission; nothing is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("please fill {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("unknown department '{0}'")]
    UnknownDepartment(String),
    #[error("unknown program '{0}'")]
    UnknownProgram(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ApplicationSubmission {
        ApplicationSubmission {
            applicant: ApplicantDetails {
                name: " Nadia Islam ".to_string(),
                email: "nadia@example.com".to_string(),
                phone: "+8801700000000".to_string(),
                ..ApplicantDetails::default()
            },
            department: "cse".to_string(),
            program: String::new(),
            files: AttachedFiles::default(),
        }
    }

    #[test]
    fn validate_trims_and_parses_closed_sets() {
        let validated = submission().validate().expect("valid");
        assert_eq!(validated.applicant.name, "Nadia Islam");
        assert_eq!(validated.department, Department::Cse);
        assert_eq!(validated.program, Program::Bachelors);
    }

    #[test]
    fn validate_lists_every_missing_field() {
        let mut raw = submission();
        raw.applicant.email = "  ".to_string();
        raw.department = String::new();
        assert_eq!(
            raw.validate(),
            Err(SubmissionError::MissingFields(vec!["email", "department"]))
        );
    }

    #[test]
    fn validate_rejects_unknown_program() {
        let mut raw = submission();
        raw.program = "diploma".to_string();
        assert_eq!(
            raw.validate(),
            Err(SubmissionError::UnknownProgram("diploma".to_string()))
        );
    }

    #[test]
    fn program_fees_follow_table() {
        assert_eq!(Program::Bachelors.fee(), 500);
        assert_eq!(Program::Masters.fee(), 700);
        assert_eq!(Program::Postgraduate.fee(), 900);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for next in [
            ApplicationStatus::DocsVerified,
            ApplicationStatus::PaymentPending,
            ApplicationStatus::Paid,
            ApplicationStatus::Verified,
            ApplicationStatus::Accepted,
            ApplicationStatus::Rejected,
        ] {
            assert!(!ApplicationStatus::Accepted.can_transition_to(next));
            assert!(!ApplicationStatus::Rejected.can_transition_to(next));
        }
    }

    #[test]
    fn payment_is_refused_after_completion() {
        assert!(ApplicationStatus::DocsVerified.can_transition_to(ApplicationStatus::PaymentPending));
        assert!(!ApplicationStatus::Paid.can_transition_to(ApplicationStatus::PaymentPending));
        assert!(!ApplicationStatus::Verified.can_transition_to(ApplicationStatus::PaymentPending));
        assert!(!ApplicationStatus::Submitted.can_transition_to(ApplicationStatus::Paid));
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&ApplicationStatus::PaymentPending).expect("serializes");
        assert_eq!(json, "\"payment_pending\"");
    }
}
