//! Lazy, deduplicated walk over the search result pages.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::error::{AutomationFault, EnumerationError};
use crate::port::{ListingPage, ListingSource};
use crate::posting::{JobPosting, SearchQuery};
use crate::suspend::{Interrupt, guarded, pause};

/// Yields quick-apply postings in listing order, each identifier at most
/// once. Once it returns `None` or an error it stays finished.
#[derive(Debug)]
pub struct JobEnumerator {
    query: SearchQuery,
    retry: RetryPolicy,
    timeout: Duration,
    seen: HashSet<String>,
    recorded: HashSet<String>,
    buffer: VecDeque<JobPosting>,
    next_page: u32,
    yielded: usize,
    finished: bool,
}

impl JobEnumerator {
    pub fn new(query: SearchQuery, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            query,
            retry,
            timeout,
            seen: HashSet::new(),
            recorded: HashSet::new(),
            buffer: VecDeque::new(),
            next_page: 0,
            yielded: 0,
            finished: false,
        }
    }

    /// Skips identifiers that were already recorded. Recorded postings still
    /// count as new for the end-of-listing check, so a page made only of them
    /// is passed over rather than ending the walk.
    pub fn resume<I>(mut self, recorded: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.recorded.extend(recorded);
        self
    }

    pub fn yielded(&self) -> usize {
        self.yielded
    }

    pub async fn next<L: ListingSource>(
        &mut self,
        source: &mut L,
        cancel: &CancellationToken,
    ) -> Result<Option<JobPosting>, EnumerationError> {
        loop {
            if self.yielded >= self.query.max_results {
                self.finished = true;
                return Ok(None);
            }
            if let Some(posting) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(posting));
            }
            if self.finished {
                return Ok(None);
            }

            let page = match self.load(source, cancel).await {
                Ok(page) => page,
                Err(err) => {
                    self.finished = true;
                    return Err(err);
                }
            };
            self.absorb(page);
        }
    }

    fn absorb(&mut self, page: ListingPage) {
        let number = self.next_page;
        self.next_page += 1;
        if page.partial {
            tracing::warn!(page = number, loaded = page.postings.len(), "partial listing page");
        }

        let mut fresh = 0usize;
        for posting in page.postings {
            if !self.seen.insert(posting.id.clone()) {
                continue;
            }
            fresh += 1;
            if self.recorded.contains(&posting.id) {
                tracing::debug!(job = %posting.id, "already recorded");
            } else if posting.quick_apply {
                self.buffer.push_back(posting);
            } else {
                tracing::debug!(job = %posting.id, "not a quick-apply posting");
            }
        }
        tracing::debug!(page = number, fresh, queued = self.buffer.len(), "listing page loaded");

        if !page.has_next || fresh == 0 {
            self.finished = true;
        }
    }

    async fn load<L: ListingSource>(
        &self,
        source: &mut L,
        cancel: &CancellationToken,
    ) -> Result<ListingPage, EnumerationError> {
        let page = self.next_page;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let res = guarded(
                cancel,
                self.timeout,
                source.load_page(&self.query, page, self.timeout),
            )
            .await;
            let last = match res {
                Ok(listing) => return Ok(listing),
                Err(Interrupt::Cancelled) => return Err(EnumerationError::Cancelled),
                Err(Interrupt::Failed(AutomationFault::Fatal(msg))) => {
                    return Err(EnumerationError::Fatal(msg));
                }
                Err(Interrupt::TimedOut) => "timed out".to_string(),
                Err(Interrupt::Failed(fault)) => fault.to_string(),
            };

            if attempts > self.retry.max_retries {
                tracing::error!(page, attempts, reason = %last, "listing unreachable");
                return Err(EnumerationError::Unreachable { page, attempts, last });
            }
            let delay = self.retry.delay_for_attempt(attempts);
            tracing::warn!(
                page,
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                reason = %last,
                "listing page failed, retrying"
            );
            pause(cancel, delay)
                .await
                .map_err(|_| EnumerationError::Cancelled)?;
        }
    }
}
