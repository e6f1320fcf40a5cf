//! Contracts for the automation surface.
//!
//! [`AutomationPort`] drives one application form; [`ListingSource`] loads
//! search result pages. A concrete browser driver implements both over one
//! browser session. Every call takes a timeout and reports faults as
//! [`AutomationFault`]: transient, fatal, or capability mismatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AutomationFault;
use crate::form::{FieldValue, FormField, FormStep};
use crate::posting::{JobPosting, SearchQuery};

/// What the surface shows after leaving a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Step(FormStep),
    /// Review/submit surface: no further fields.
    Review,
}

/// Signal returned by the final submit action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    Confirmed { reference: Option<String> },
    Unconfirmed,
}

/// One page of search results, possibly only partly loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub postings: Vec<JobPosting>,
    /// Some cards failed to load; the rest are still usable.
    pub partial: bool,
    pub has_next: bool,
}

pub trait AutomationPort {
    /// Handle to an opened application form.
    type Surface;

    async fn open(
        &mut self,
        posting: &JobPosting,
        timeout: Duration,
    ) -> Result<Self::Surface, AutomationFault>;

    async fn discover_step(
        &mut self,
        surface: &mut Self::Surface,
        timeout: Duration,
    ) -> Result<FormStep, AutomationFault>;

    async fn write_field(
        &mut self,
        surface: &mut Self::Surface,
        field: &FormField,
        value: &FieldValue,
        timeout: Duration,
    ) -> Result<(), AutomationFault>;

    async fn advance(
        &mut self,
        surface: &mut Self::Surface,
        timeout: Duration,
    ) -> Result<Advance, AutomationFault>;

    /// Invoked at most once per posting.
    async fn submit(
        &mut self,
        surface: &mut Self::Surface,
        timeout: Duration,
    ) -> Result<Confirmation, AutomationFault>;
}

pub trait ListingSource {
    /// Loads the zero-based `page` of results for `query`.
    async fn load_page(
        &mut self,
        query: &SearchQuery,
        page: u32,
        timeout: Duration,
    ) -> Result<ListingPage, AutomationFault>;
}
