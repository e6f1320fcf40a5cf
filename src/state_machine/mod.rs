mod attempt;
mod machine;
mod state;

pub use attempt::{
    ApplicationAttempt, ApplicationOutcome, OutcomeKind, OutcomeReason, OutcomeRecord, StepLog,
    StepResult,
};
pub use machine::{ApplicationMachine, AttemptContext, Completion, MachineSettings, SessionAbort};
pub use state::State;
