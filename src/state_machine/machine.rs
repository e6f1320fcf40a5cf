//! Drives a single posting through its quick-apply form.
//!
//! Per-posting faults end here as a terminal outcome. Only a fatal
//! automation fault or cancellation leaves through [`Completion::abort`],
//! and even then the attempt carries a `session_aborted` outcome.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::attempt::{
    ApplicationAttempt, ApplicationOutcome, OutcomeReason, StepLog, StepResult,
};
use super::state::State;
use crate::config::{CoverLetterConfig, CoverLetterFallback, RetryPolicy, SessionConfig};
use crate::cover_letter::{CoverLetterRequest, TextGenerator, template_letter};
use crate::error::{AutomationFault, CoverLetterFault};
use crate::form::{FieldValue, FormField, FormStep};
use crate::port::{Advance, AutomationPort, Confirmation};
use crate::posting::JobPosting;
use crate::profile::UserProfile;
use crate::resolver::{Resolution, Resolver};
use crate::suspend::{Interrupt, guarded, pause};

/// Timeouts and retry limits for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSettings {
    pub ui_timeout: Duration,
    pub confirm_timeout: Duration,
    pub transient: RetryPolicy,
    pub cover_letter: CoverLetterConfig,
}

impl MachineSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            ui_timeout: config.timeouts.ui(),
            confirm_timeout: config.timeouts.confirm(),
            transient: config.retry.transient,
            cover_letter: config.cover_letter.clone(),
        }
    }
}

/// Why the whole session must stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAbort {
    Fatal(String),
    Cancelled,
}

impl fmt::Display for SessionAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAbort::Fatal(msg) => write!(f, "automation session invalidated: {msg}"),
            SessionAbort::Cancelled => write!(f, "session cancelled"),
        }
    }
}

/// A finished attempt, plus the session abort it observed, if any.
#[derive(Debug, Clone)]
pub struct Completion {
    pub attempt: ApplicationAttempt,
    pub abort: Option<SessionAbort>,
}

/// Shared, read-only collaborators of every attempt in a session.
pub struct AttemptContext<'a, G> {
    pub generator: &'a G,
    pub resolver: &'a dyn Resolver,
    pub profile: &'a UserProfile,
    pub settings: &'a MachineSettings,
    pub cancel: &'a CancellationToken,
}

impl<G> Clone for AttemptContext<'_, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<G> Copy for AttemptContext<'_, G> {}

/// Terminal exits of the workflow.
enum Halt {
    End(OutcomeReason),
    Abort(SessionAbort),
}

enum Fault {
    Transient(String),
    Halt(Halt),
}

impl From<Halt> for Fault {
    fn from(halt: Halt) -> Self {
        Fault::Halt(halt)
    }
}

fn classify<T>(res: Result<T, Interrupt<AutomationFault>>) -> Result<T, Fault> {
    match res {
        Ok(value) => Ok(value),
        Err(Interrupt::Cancelled) => Err(Halt::Abort(SessionAbort::Cancelled).into()),
        Err(Interrupt::TimedOut) => Err(Fault::Transient("timed out".into())),
        Err(Interrupt::Failed(AutomationFault::Transient(msg))) => Err(Fault::Transient(msg)),
        Err(Interrupt::Failed(AutomationFault::Fatal(msg))) => {
            Err(Halt::Abort(SessionAbort::Fatal(msg)).into())
        }
        Err(Interrupt::Failed(AutomationFault::CapabilityMismatch)) => {
            Err(Halt::End(OutcomeReason::CapabilityMismatch).into())
        }
    }
}

enum StepExit {
    Next(FormStep),
    Review,
}

pub struct ApplicationMachine<'a, P, G> {
    port: &'a mut P,
    ctx: AttemptContext<'a, G>,
    posting: JobPosting,
    state: State,
    states: Vec<State>,
    steps: Vec<StepLog>,
    started_at: DateTime<Utc>,
    cover_letter: Option<String>,
}

impl<'a, P, G> ApplicationMachine<'a, P, G>
where
    P: AutomationPort,
    G: TextGenerator,
{
    pub fn new(port: &'a mut P, ctx: AttemptContext<'a, G>, posting: JobPosting) -> Self {
        Self {
            port,
            ctx,
            posting,
            state: State::Idle,
            states: vec![State::Idle],
            steps: Vec::new(),
            started_at: Utc::now(),
            cover_letter: None,
        }
    }

    /// Runs the attempt to a terminal state. Consumes the machine.
    pub async fn run(mut self) -> Completion {
        tracing::info!(job = %self.posting.id, posting = %self.posting, "starting application");
        let (reason, abort) = match self.drive().await {
            Ok(reason) | Err(Halt::End(reason)) => (reason, None),
            Err(Halt::Abort(abort)) => (OutcomeReason::SessionAborted, Some(abort)),
        };
        self.finish(reason, abort)
    }

    async fn drive(&mut self) -> Result<OutcomeReason, Halt> {
        self.enter(State::Opening);
        let mut surface = self.open().await?;
        self.enter(State::FillingStep);

        let mut retries = 0u32;
        let mut step_no = 1u32;
        let mut try_no = 1u32;
        let mut current: Option<FormStep> = None;

        loop {
            let step = match current.take() {
                Some(step) => step,
                None => {
                    let cancel = self.ctx.cancel;
                    let timeout = self.ctx.settings.ui_timeout;
                    match classify(
                        guarded(cancel, timeout, self.port.discover_step(&mut surface, timeout))
                            .await,
                    ) {
                        Ok(step) => step,
                        Err(Fault::Transient(msg)) => {
                            self.log_step(step_no, try_no, 0, StepResult::Retried(msg.clone()));
                            self.back_off(&mut retries, &msg).await?;
                            try_no += 1;
                            self.enter(State::FillingStep);
                            continue;
                        }
                        Err(Fault::Halt(halt)) => {
                            self.log_step(step_no, try_no, 0, ended(&halt));
                            return Err(halt);
                        }
                    }
                }
            };

            match self.fill_step(&mut surface, &step).await {
                Ok(StepExit::Next(next)) => {
                    self.log_step(step_no, try_no, step.fields.len(), StepResult::Advanced);
                    step_no += 1;
                    try_no = 1;
                    retries = 0;
                    current = Some(next);
                    self.enter(State::FillingStep);
                }
                Ok(StepExit::Review) => {
                    self.log_step(step_no, try_no, step.fields.len(), StepResult::Completed);
                    break;
                }
                Err(Fault::Transient(msg)) => {
                    self.log_step(step_no, try_no, step.fields.len(), StepResult::Retried(msg.clone()));
                    self.back_off(&mut retries, &msg).await?;
                    try_no += 1;
                    self.enter(State::FillingStep);
                }
                Err(Fault::Halt(halt)) => {
                    self.log_step(step_no, try_no, step.fields.len(), ended(&halt));
                    return Err(halt);
                }
            }
        }

        self.enter(State::Reviewing);
        self.submit(&mut surface).await
    }

    async fn open(&mut self) -> Result<P::Surface, Halt> {
        let mut retries = 0u32;
        loop {
            let cancel = self.ctx.cancel;
            let timeout = self.ctx.settings.ui_timeout;
            let res = guarded(cancel, timeout, self.port.open(&self.posting, timeout)).await;
            match classify(res) {
                Ok(surface) => return Ok(surface),
                Err(Fault::Transient(msg)) => self.back_off(&mut retries, &msg).await?,
                Err(Fault::Halt(halt)) => return Err(halt),
            }
        }
    }

    /// Resolves every field once, acquires cover letters, writes the values
    /// and leaves the step.
    async fn fill_step(&mut self, surface: &mut P::Surface, step: &FormStep) -> Result<StepExit, Fault> {
        tracing::debug!(
            job = %self.posting.id,
            fields = step.fields.len(),
            required = step.required_count(),
            "filling step"
        );
        let mut planned: Vec<(&FormField, Option<FieldValue>)> = Vec::with_capacity(step.fields.len());
        for field in &step.fields {
            match self.ctx.resolver.resolve(field, self.ctx.profile) {
                Resolution::Value(value) => planned.push((field, Some(value))),
                Resolution::NeedsCoverLetter if field.required => planned.push((field, None)),
                Resolution::NeedsCoverLetter => {
                    tracing::debug!(field = %field.label, "leaving optional cover letter empty");
                }
                Resolution::Unresolvable if field.required => {
                    tracing::warn!(job = %self.posting.id, field = %field.label, "required field unresolvable");
                    return Err(Halt::End(OutcomeReason::UnresolvableField(field.label.clone())).into());
                }
                Resolution::Unresolvable => {
                    tracing::debug!(field = %field.label, "skipping optional field");
                }
            }
        }

        let cancel = self.ctx.cancel;
        let timeout = self.ctx.settings.ui_timeout;
        for (field, value) in planned {
            let value = match value {
                Some(value) => value,
                None => FieldValue::Text(self.acquire_cover_letter(field).await?),
            };
            tracing::debug!(field = %field.label, kind = ?field.kind, "writing field");
            classify(
                guarded(cancel, timeout, self.port.write_field(surface, field, &value, timeout)).await,
            )?;
        }

        if step.is_final {
            return Ok(StepExit::Review);
        }
        match classify(guarded(cancel, timeout, self.port.advance(surface, timeout)).await)? {
            Advance::Step(next) => Ok(StepExit::Next(next)),
            Advance::Review => Ok(StepExit::Review),
        }
    }

    async fn acquire_cover_letter(&mut self, field: &FormField) -> Result<String, Halt> {
        if let Some(text) = &self.cover_letter {
            return Ok(text.clone());
        }
        self.enter(State::AwaitingCoverLetter);

        let settings = self.ctx.settings;
        let config = &settings.cover_letter;
        let mut text = None;
        if config.enabled {
            text = self.generate_cover_letter(config).await?;
        }
        if text.is_none() {
            text = match config.fallback {
                CoverLetterFallback::None => None,
                CoverLetterFallback::Summary => self.ctx.profile.background().map(str::to_string),
                CoverLetterFallback::Template => Some(template_letter(&self.posting, self.ctx.profile)),
            };
            if text.is_some() {
                tracing::info!(job = %self.posting.id, fallback = ?config.fallback, "using cover letter fallback");
            }
        }

        match text {
            Some(text) => {
                self.cover_letter = Some(text.clone());
                self.enter(State::FillingStep);
                Ok(text)
            }
            None if config.enabled => Err(Halt::End(OutcomeReason::CoverLetterUnavailable)),
            None => Err(Halt::End(OutcomeReason::UnresolvableField(field.label.clone()))),
        }
    }

    async fn generate_cover_letter(&self, config: &CoverLetterConfig) -> Result<Option<String>, Halt> {
        let cancel = self.ctx.cancel;
        let request = CoverLetterRequest::for_posting(&self.posting, self.ctx.profile, config.excerpt_chars);
        let backoff = config.backoff();

        for attempt in 1..=config.max_attempts {
            let mut server_delay = Duration::ZERO;
            let res = guarded(cancel, config.timeout(), self.ctx.generator.generate(&request, config.timeout())).await;
            let failure = match res {
                Ok(text) if !text.trim().is_empty() => return Ok(Some(text)),
                Ok(_) => "empty text".to_string(),
                Err(Interrupt::Cancelled) => return Err(Halt::Abort(SessionAbort::Cancelled)),
                Err(Interrupt::TimedOut) => "timed out".to_string(),
                Err(Interrupt::Failed(CoverLetterFault::Unavailable(reason))) => {
                    tracing::warn!(job = %self.posting.id, %reason, "cover letter generation unavailable");
                    return Ok(None);
                }
                Err(Interrupt::Failed(fault)) => {
                    if let CoverLetterFault::RateLimited { retry_after_ms } = fault {
                        server_delay = Duration::from_millis(retry_after_ms);
                    }
                    fault.to_string()
                }
            };
            tracing::warn!(
                job = %self.posting.id,
                attempt,
                max = config.max_attempts,
                reason = %failure,
                "cover letter generation failed"
            );
            if attempt < config.max_attempts {
                // the server's retry-after is a floor under our own backoff
                pause(cancel, backoff.delay_for_attempt(attempt).max(server_delay))
                    .await
                    .map_err(|_| Halt::Abort(SessionAbort::Cancelled))?;
            }
        }
        Ok(None)
    }

    /// Invokes submit exactly once. Anything short of a confirmation is a
    /// failed attempt; the submit is never retried.
    async fn submit(&mut self, surface: &mut P::Surface) -> Result<OutcomeReason, Halt> {
        self.enter(State::Submitting);
        let cancel = self.ctx.cancel;
        let timeout = self.ctx.settings.confirm_timeout;
        match guarded(cancel, timeout, self.port.submit(surface, timeout)).await {
            Ok(Confirmation::Confirmed { reference }) => Ok(OutcomeReason::Confirmed(reference)),
            Ok(Confirmation::Unconfirmed) => Ok(OutcomeReason::SubmitUnconfirmed),
            Err(Interrupt::Cancelled) => Err(Halt::Abort(SessionAbort::Cancelled)),
            Err(Interrupt::Failed(AutomationFault::Fatal(msg))) => {
                Err(Halt::Abort(SessionAbort::Fatal(msg)))
            }
            Err(Interrupt::TimedOut) | Err(Interrupt::Failed(_)) => {
                tracing::warn!(job = %self.posting.id, "no submit confirmation");
                Ok(OutcomeReason::SubmitUnconfirmed)
            }
        }
    }

    async fn back_off(&mut self, retries: &mut u32, reason: &str) -> Result<(), Halt> {
        *retries += 1;
        let policy = self.ctx.settings.transient;
        if *retries > policy.max_retries {
            tracing::warn!(job = %self.posting.id, reason, "transient retries exhausted");
            return Err(Halt::End(OutcomeReason::UiTimeout));
        }
        let delay = policy.delay_for_attempt(*retries);
        tracing::warn!(
            job = %self.posting.id,
            state = %self.state,
            retry = *retries,
            max = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            reason,
            "transient fault, retrying"
        );
        pause(self.ctx.cancel, delay)
            .await
            .map_err(|_| Halt::Abort(SessionAbort::Cancelled))
    }

    fn enter(&mut self, next: State) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(job = %self.posting.id, from = %self.state, to = %next, "transition");
        self.state = next;
        self.states.push(next);
    }

    fn log_step(&mut self, step: u32, try_number: u32, fields: usize, result: StepResult) {
        self.steps.push(StepLog {
            step,
            try_number,
            fields,
            result,
        });
    }

    fn finish(mut self, reason: OutcomeReason, abort: Option<SessionAbort>) -> Completion {
        self.enter(reason.terminal_state());
        let outcome = ApplicationOutcome {
            kind: reason.kind(),
            reason: reason.to_string(),
            ended_at: Utc::now(),
        };
        tracing::info!(
            job = %self.posting.id,
            outcome = %outcome.kind,
            reason = %outcome.reason,
            steps = self.steps.len(),
            "application finished"
        );
        Completion {
            attempt: ApplicationAttempt {
                id: Uuid::new_v4(),
                posting: self.posting,
                started_at: self.started_at,
                steps: self.steps,
                states: self.states,
                outcome,
            },
            abort,
        }
    }
}

fn ended(halt: &Halt) -> StepResult {
    match halt {
        Halt::End(reason) => StepResult::Ended(reason.to_string()),
        Halt::Abort(_) => StepResult::Ended(OutcomeReason::SessionAborted.to_string()),
    }
}
