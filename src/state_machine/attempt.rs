use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::State;
use crate::posting::JobPosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    Submitted,
    Skipped,
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Submitted => write!(f, "Submitted"),
            OutcomeKind::Skipped => write!(f, "Skipped"),
            OutcomeKind::Failed => write!(f, "Failed"),
        }
    }
}

/// Machine-readable reason attached to every terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeReason {
    /// Submit acknowledged; carries the confirmation reference if any.
    Confirmed(Option<String>),
    CapabilityMismatch,
    UnresolvableField(String),
    CoverLetterUnavailable,
    SubmitUnconfirmed,
    UiTimeout,
    SessionAborted,
}

impl OutcomeReason {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            OutcomeReason::Confirmed(_) => OutcomeKind::Submitted,
            OutcomeReason::CapabilityMismatch => OutcomeKind::Skipped,
            _ => OutcomeKind::Failed,
        }
    }

    pub fn terminal_state(&self) -> State {
        match self.kind() {
            OutcomeKind::Submitted => State::Submitted,
            OutcomeKind::Skipped => State::Skipped,
            OutcomeKind::Failed => State::Failed,
        }
    }
}

impl fmt::Display for OutcomeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeReason::Confirmed(Some(reference)) => write!(f, "confirmed:{reference}"),
            OutcomeReason::Confirmed(None) => write!(f, "confirmed"),
            OutcomeReason::CapabilityMismatch => write!(f, "capability_mismatch"),
            OutcomeReason::UnresolvableField(label) => write!(f, "unresolvable_field:{label}"),
            OutcomeReason::CoverLetterUnavailable => write!(f, "cover_letter_unavailable"),
            OutcomeReason::SubmitUnconfirmed => write!(f, "submit_unconfirmed"),
            OutcomeReason::UiTimeout => write!(f, "ui_timeout"),
            OutcomeReason::SessionAborted => write!(f, "session_aborted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationOutcome {
    pub kind: OutcomeKind,
    pub reason: String,
    pub ended_at: DateTime<Utc>,
}

/// How one try at a form step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum StepResult {
    /// Another step followed.
    Advanced,
    /// The review/submit surface followed.
    Completed,
    /// A transient fault; the step was discovered again.
    Retried(String),
    /// The attempt ended on this step.
    Ended(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepLog {
    /// 1-based position of the step in the form.
    pub step: u32,
    /// 1-based try of this step.
    pub try_number: u32,
    pub fields: usize,
    pub result: StepResult,
}

/// Everything known about one posting's attempt. Only constructed once the
/// attempt reached a terminal state, so the outcome is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    pub id: Uuid,
    pub posting: JobPosting,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepLog>,
    pub states: Vec<State>,
    pub outcome: ApplicationOutcome,
}

impl ApplicationAttempt {
    pub fn is_submitted(&self) -> bool {
        self.outcome.kind == OutcomeKind::Submitted
    }

    /// An attempt that never started because the session was aborted.
    pub fn aborted_before_start(posting: JobPosting) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            posting,
            started_at: now,
            steps: Vec::new(),
            states: vec![State::Idle, State::Failed],
            outcome: ApplicationOutcome {
                kind: OutcomeKind::Failed,
                reason: OutcomeReason::SessionAborted.to_string(),
                ended_at: now,
            },
        }
    }
}

/// The persisted form of an attempt, one per posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub timestamp: DateTime<Utc>,
    pub job_id: String,
    pub job_title: String,
    pub company: String,
    pub link: String,
    pub outcome_kind: OutcomeKind,
    pub reason: String,
    pub steps_attempted: usize,
}

impl OutcomeRecord {
    pub fn from_attempt(attempt: &ApplicationAttempt) -> Self {
        Self {
            timestamp: attempt.outcome.ended_at,
            job_id: attempt.posting.id.clone(),
            job_title: attempt.posting.title.clone(),
            company: attempt.posting.company.clone(),
            link: attempt.posting.link.clone(),
            outcome_kind: attempt.outcome.kind,
            reason: attempt.outcome.reason.clone(),
            steps_attempted: attempt.steps.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting() -> JobPosting {
        JobPosting {
            id: "42".into(),
            title: "Backend Engineer".into(),
            company: "Initech".into(),
            location: String::new(),
            description: String::new(),
            link: "https://example.com/jobs/42".into(),
            quick_apply: true,
        }
    }

    #[test]
    fn reason_strings() {
        assert_eq!(
            OutcomeReason::UnresolvableField("Salary expectation".into()).to_string(),
            "unresolvable_field:Salary expectation"
        );
        assert_eq!(OutcomeReason::CapabilityMismatch.to_string(), "capability_mismatch");
        assert_eq!(OutcomeReason::UiTimeout.to_string(), "ui_timeout");
        assert_eq!(OutcomeReason::SubmitUnconfirmed.to_string(), "submit_unconfirmed");
        assert_eq!(OutcomeReason::Confirmed(Some("A-1".into())).to_string(), "confirmed:A-1");
    }

    #[test]
    fn reason_kinds() {
        assert_eq!(OutcomeReason::Confirmed(None).kind(), OutcomeKind::Submitted);
        assert_eq!(OutcomeReason::CapabilityMismatch.kind(), OutcomeKind::Skipped);
        assert_eq!(OutcomeReason::SessionAborted.kind(), OutcomeKind::Failed);
        assert_eq!(OutcomeReason::CoverLetterUnavailable.terminal_state(), State::Failed);
    }

    #[test]
    fn record_from_aborted_attempt() {
        let attempt = ApplicationAttempt::aborted_before_start(posting());
        assert!(!attempt.is_submitted());
        let record = OutcomeRecord::from_attempt(&attempt);
        assert_eq!(record.job_id, "42");
        assert_eq!(record.job_title, "Backend Engineer");
        assert_eq!(record.outcome_kind, OutcomeKind::Failed);
        assert_eq!(record.reason, "session_aborted");
        assert_eq!(record.steps_attempted, 0);
    }

    #[test]
    fn record_serializes_schema_fields() {
        let record = OutcomeRecord::from_attempt(&ApplicationAttempt::aborted_before_start(posting()));
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "timestamp",
            "job_title",
            "company",
            "link",
            "outcome_kind",
            "reason",
            "steps_attempted",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["outcome_kind"], "Failed");
    }
}
