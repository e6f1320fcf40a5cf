use std::fmt;

use serde::{Deserialize, Serialize};

/// States of one application attempt.
///
/// `Idle → Opening → FillingStep ⇄ AwaitingCoverLetter → Reviewing →
/// Submitting → {Submitted, Failed, Skipped}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Idle,
    Opening,
    FillingStep,
    AwaitingCoverLetter,
    Reviewing,
    Submitting,
    Submitted,
    Failed,
    Skipped,
}

impl State {
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Submitted | State::Failed | State::Skipped)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Any non-terminal state may fail, and staying in `FillingStep` covers
    /// both the next form step and a transient retry of the current one.
    pub fn can_transition_to(self, next: State) -> bool {
        use State::{
            AwaitingCoverLetter, FillingStep, Idle, Opening, Reviewing, Skipped, Submitted,
            Submitting,
        };

        if self.is_terminal() {
            return false;
        }
        if next == State::Failed {
            return true;
        }
        matches!(
            (self, next),
            (Idle, Opening)
                | (Opening, FillingStep)
                | (Opening, Skipped)
                | (FillingStep, FillingStep)
                | (FillingStep, AwaitingCoverLetter)
                | (FillingStep, Reviewing)
                | (FillingStep, Skipped)
                | (AwaitingCoverLetter, FillingStep)
                | (Reviewing, Submitting)
                | (Submitting, Submitted)
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Idle => "IDLE",
            State::Opening => "OPENING",
            State::FillingStep => "FILLING_STEP",
            State::AwaitingCoverLetter => "AWAITING_COVER_LETTER",
            State::Reviewing => "REVIEWING",
            State::Submitting => "SUBMITTING",
            State::Submitted => "SUBMITTED",
            State::Failed => "FAILED",
            State::Skipped => "SKIPPED",
        };
        f.write_str(name)
    }
}
