//! Terminal output: a spinner while the session runs, one coloured line per
//! recorded outcome, and a closing summary.
//!
//! Uses `indicatif` for the spinner and `console` for styles. Diagnostics go
//! through `tracing` to stderr; this module only writes the human summary.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::QuickApplyError;
use crate::orchestrator::SessionReport;
use crate::recorder::OutcomeRecorder;
use crate::state_machine::{ApplicationAttempt, OutcomeKind};

/// Prints each outcome and forwards it to `inner`.
pub struct ConsoleRecorder<R> {
    inner: R,
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
    recorded: usize,
}

impl<R: OutcomeRecorder> ConsoleRecorder<R> {
    pub fn new(inner: R) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("searching listings");
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            inner,
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            recorded: 0,
        }
    }

    /// Stops the spinner and hands back the wrapped recorder.
    pub fn finish(self) -> R {
        self.pb.finish_and_clear();
        self.inner
    }

    fn line(&self, attempt: &ApplicationAttempt) -> String {
        let (mark, style) = match attempt.outcome.kind {
            OutcomeKind::Submitted => ("✓", &self.green),
            OutcomeKind::Skipped => ("↷", &self.yellow),
            OutcomeKind::Failed => ("✗", &self.red),
        };
        format!(
            "  {} {} ({})",
            style.apply_to(mark),
            attempt.posting,
            style.apply_to(&attempt.outcome.reason)
        )
    }
}

impl<R: OutcomeRecorder> OutcomeRecorder for ConsoleRecorder<R> {
    fn record(&mut self, attempt: &ApplicationAttempt) -> Result<(), QuickApplyError> {
        self.inner.record(attempt)?;
        self.recorded += 1;
        self.pb.println(self.line(attempt));
        self.pb
            .set_message(format!("{} postings recorded, searching", self.recorded));
        Ok(())
    }
}

/// Prints the end-of-session summary.
pub fn print_summary(report: &SessionReport) {
    let header = if report.is_abnormal() {
        Style::new().red().bold()
    } else {
        Style::new().green().bold()
    };
    println!();
    println!("{}", header.apply_to("─── Session Summary ───"));
    println!("  attempted: {}", report.attempted);
    println!("  submitted: {}", report.submitted);
    println!("  skipped:   {}", report.skipped);
    println!("  failed:    {}", report.failed);
    println!("  stopped:   {}", report.stop);
}
