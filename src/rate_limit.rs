//! Session-wide submission budget and the randomized wait between attempts.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::config::PacingConfig;
use crate::suspend::{Cancelled, pause};

/// Counts confirmed submissions against the session cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBudget {
    submitted: u32,
    max_applications: u32,
    wait_min: Duration,
    wait_max: Duration,
}

impl RateBudget {
    pub fn new(max_applications: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            submitted: 0,
            max_applications,
            wait_min,
            wait_max,
        }
    }

    pub fn from_pacing(pacing: &PacingConfig) -> Self {
        Self::new(
            pacing.max_applications,
            Duration::from_secs(pacing.wait_min_secs),
            Duration::from_secs(pacing.wait_max_secs),
        )
    }

    pub fn submitted(&self) -> u32 {
        self.submitted
    }

    pub fn max_applications(&self) -> u32 {
        self.max_applications
    }

    pub fn is_exhausted(&self) -> bool {
        self.submitted >= self.max_applications
    }

    /// Counts one confirmed submission. Returns false, without counting, once
    /// the cap is reached.
    pub fn record_submission(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.submitted += 1;
        true
    }
}

/// Draws uniform waits from the budget's window.
#[derive(Debug)]
pub struct RateLimiter {
    rng: StdRng,
    skip_initial_wait: bool,
    waited_once: bool,
}

impl RateLimiter {
    pub fn new(skip_initial_wait: bool) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            skip_initial_wait,
            waited_once: false,
        }
    }

    /// Deterministic draws for tests and replays.
    pub fn with_seed(seed: u64, skip_initial_wait: bool) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            skip_initial_wait,
            waited_once: false,
        }
    }

    /// A wait in `[wait_min, wait_max]`, both ends inclusive, at millisecond
    /// resolution.
    pub fn draw_wait(&mut self, budget: &RateBudget) -> Duration {
        let min = budget.wait_min.as_millis() as u64;
        let max = budget.wait_max.as_millis() as u64;
        if max <= min {
            return budget.wait_min;
        }
        Duration::from_millis(self.rng.gen_range(min..=max))
    }

    /// Waits before the next attempt. Returns `Ok(false)` when the budget is
    /// already exhausted and no attempt should start.
    pub async fn wait(
        &mut self,
        budget: &RateBudget,
        cancel: &CancellationToken,
    ) -> Result<bool, Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        if budget.is_exhausted() {
            return Ok(false);
        }
        let first = !self.waited_once;
        self.waited_once = true;
        if first && self.skip_initial_wait {
            return Ok(true);
        }
        let wait = self.draw_wait(budget);
        tracing::info!(wait_secs = wait.as_secs_f64(), "waiting before next application");
        pause(cancel, wait).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max: u32) -> RateBudget {
        RateBudget::new(max, Duration::from_secs(10), Duration::from_secs(30))
    }

    #[test]
    fn budget_never_exceeds_cap() {
        let mut budget = budget(2);
        assert!(budget.record_submission());
        assert!(budget.record_submission());
        assert!(budget.is_exhausted());
        assert!(!budget.record_submission());
        assert_eq!(budget.submitted(), 2);
    }

    #[test]
    fn zero_cap_is_exhausted_immediately() {
        assert!(budget(0).is_exhausted());
    }

    #[test]
    fn draws_stay_inside_window() {
        let budget = budget(5);
        let mut limiter = RateLimiter::with_seed(7, false);
        for _ in 0..500 {
            let wait = limiter.draw_wait(&budget);
            assert!(wait >= Duration::from_secs(10) && wait <= Duration::from_secs(30));
        }
    }

    #[test]
    fn degenerate_window_draws_its_bound() {
        let fixed = RateBudget::new(1, Duration::from_secs(3), Duration::from_secs(3));
        let mut limiter = RateLimiter::with_seed(1, false);
        assert_eq!(limiter.draw_wait(&fixed), Duration::from_secs(3));
    }

    #[test]
    fn seeded_limiters_agree() {
        let budget = budget(5);
        let mut a = RateLimiter::with_seed(42, false);
        let mut b = RateLimiter::with_seed(42, false);
        for _ in 0..10 {
            assert_eq!(a.draw_wait(&budget), b.draw_wait(&budget));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_within_window() {
        let budget = budget(5);
        let mut limiter = RateLimiter::with_seed(3, false);
        let cancel = CancellationToken::new();

        let start = tokio::time::Instant::now();
        assert_eq!(limiter.wait(&budget, &cancel).await, Ok(true));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "{elapsed:?}");
        assert!(elapsed <= Duration::from_secs(31), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn first_wait_can_be_skipped() {
        let budget = budget(5);
        let mut limiter = RateLimiter::with_seed(3, true);
        let cancel = CancellationToken::new();

        let start = tokio::time::Instant::now();
        assert_eq!(limiter.wait(&budget, &cancel).await, Ok(true));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.wait(&budget, &cancel).await, Ok(true));
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn exhausted_budget_does_not_wait() {
        let mut limiter = RateLimiter::with_seed(3, false);
        let result = limiter.wait(&budget(0), &CancellationToken::new()).await;
        assert_eq!(result, Ok(false));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_wait() {
        let budget = budget(5);
        let mut limiter = RateLimiter::with_seed(3, false);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        assert_eq!(limiter.wait(&budget, &cancel).await, Err(Cancelled));
        assert!(start.elapsed() < Duration::from_secs(10));
    }
}
