//! The session loop: enumerate, pace, apply, record.

use std::fmt;

use crate::cover_letter::TextGenerator;
use crate::enumerator::JobEnumerator;
use crate::error::{EnumerationError, QuickApplyError};
use crate::port::{AutomationPort, ListingSource};
use crate::rate_limit::{RateBudget, RateLimiter};
use crate::recorder::OutcomeRecorder;
use crate::state_machine::{
    ApplicationAttempt, ApplicationMachine, AttemptContext, OutcomeKind, SessionAbort,
};

/// Why the session loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ListingsExhausted,
    CapReached,
    Aborted(SessionAbort),
    EnumerationFailed(EnumerationError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ListingsExhausted => write!(f, "no more listings"),
            StopReason::CapReached => write!(f, "application cap reached"),
            StopReason::Aborted(abort) => write!(f, "aborted: {abort}"),
            StopReason::EnumerationFailed(err) => write!(f, "listing failed: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub attempted: usize,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub stop: StopReason,
}

impl SessionReport {
    /// True when the session ended on a fault rather than running out of
    /// work or budget.
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self.stop,
            StopReason::Aborted(_) | StopReason::EnumerationFailed(_)
        )
    }
}

#[derive(Default)]
struct Tally {
    attempted: usize,
    submitted: usize,
    skipped: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, attempt: &ApplicationAttempt) {
        self.attempted += 1;
        match attempt.outcome.kind {
            OutcomeKind::Submitted => self.submitted += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
    }

    fn finish(self, stop: StopReason) -> SessionReport {
        SessionReport {
            attempted: self.attempted,
            submitted: self.submitted,
            skipped: self.skipped,
            failed: self.failed,
            stop,
        }
    }
}

/// Owns the session budget; the only place it is mutated.
pub struct Orchestrator<'a, G> {
    ctx: AttemptContext<'a, G>,
    budget: RateBudget,
    limiter: RateLimiter,
}

impl<'a, G: TextGenerator> Orchestrator<'a, G> {
    pub fn new(ctx: AttemptContext<'a, G>, budget: RateBudget, limiter: RateLimiter) -> Self {
        Self {
            ctx,
            budget,
            limiter,
        }
    }

    /// Attempts postings in enumeration order until the listing runs out,
    /// the cap is reached, or the session is aborted. Every posting taken
    /// from the enumerator is recorded exactly once. A recorder error ends
    /// the session with `Err`.
    pub async fn run<S, R>(
        &mut self,
        surface: &mut S,
        enumerator: &mut JobEnumerator,
        recorder: &mut R,
    ) -> Result<SessionReport, QuickApplyError>
    where
        S: AutomationPort + ListingSource,
        R: OutcomeRecorder,
    {
        let cancel = self.ctx.cancel;
        let mut tally = Tally::default();
        tracing::info!(
            max_applications = self.budget.max_applications(),
            "session started"
        );

        let stop = loop {
            if cancel.is_cancelled() {
                break StopReason::Aborted(SessionAbort::Cancelled);
            }
            if self.budget.is_exhausted() {
                break StopReason::CapReached;
            }

            let posting = match enumerator.next(surface, cancel).await {
                Ok(Some(posting)) => posting,
                Ok(None) => break StopReason::ListingsExhausted,
                Err(EnumerationError::Cancelled) => {
                    break StopReason::Aborted(SessionAbort::Cancelled);
                }
                Err(EnumerationError::Fatal(msg)) => {
                    break StopReason::Aborted(SessionAbort::Fatal(msg));
                }
                Err(err) => break StopReason::EnumerationFailed(err),
            };

            match self.limiter.wait(&self.budget, cancel).await {
                Ok(true) => {}
                Ok(false) => break StopReason::CapReached,
                Err(_) => {
                    let attempt = ApplicationAttempt::aborted_before_start(posting);
                    recorder.record(&attempt)?;
                    tally.add(&attempt);
                    break StopReason::Aborted(SessionAbort::Cancelled);
                }
            }

            let done = ApplicationMachine::new(surface, self.ctx, posting).run().await;
            recorder.record(&done.attempt)?;
            tally.add(&done.attempt);
            if done.attempt.is_submitted() {
                self.budget.record_submission();
            }
            if let Some(abort) = done.abort {
                break StopReason::Aborted(abort);
            }
        };

        let report = tally.finish(stop);
        if report.is_abnormal() {
            tracing::error!(stop = %report.stop, attempted = report.attempted, "session stopped");
        } else {
            tracing::info!(
                stop = %report.stop,
                listed = enumerator.yielded(),
                attempted = report.attempted,
                submitted = self.budget.submitted(),
                "session finished"
            );
        }
        Ok(report)
    }
}
