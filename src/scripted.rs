//! In-memory automation surface driven by a listing script.
//!
//! Implements both [`AutomationPort`] and [`ListingSource`] from a
//! serde-described [`ListingScript`]: pages of postings, the form steps each
//! posting opens, and faults to inject per call. Every call is journaled so
//! callers can check exactly what was touched.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AutomationFault, QuickApplyError};
use crate::form::{FieldValue, FormField, FormStep};
use crate::port::{Advance, AutomationPort, Confirmation, ListingPage, ListingSource};
use crate::posting::{JobPosting, SearchQuery};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingScript {
    pub pages: Vec<ScriptedPage>,
    /// Faults raised by `load_page`, consumed in order.
    #[serde(default)]
    pub listing_faults: Vec<ScriptedFault>,
}

impl ListingScript {
    pub fn from_json_file(path: &Path) -> Result<Self, QuickApplyError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedPage {
    pub postings: Vec<ScriptedPosting>,
    #[serde(default)]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedPosting {
    pub posting: JobPosting,
    #[serde(default)]
    pub steps: Vec<FormStep>,
    /// False when the card advertises quick apply but the opened page has none.
    #[serde(default = "default_true")]
    pub quick_apply_on_open: bool,
    #[serde(default = "default_true")]
    pub confirms: bool,
    #[serde(default)]
    pub faults: Vec<ScriptedFault>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortCall {
    LoadPage,
    Open,
    Discover,
    Write,
    Advance,
    Submit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Transient,
    Fatal,
    /// Never answers; the caller's timeout has to fire.
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedFault {
    pub call: PortCall,
    pub kind: FaultKind,
    #[serde(default = "one")]
    pub times: u32,
    #[serde(default)]
    pub message: String,
}

fn one() -> u32 {
    1
}

impl ScriptedFault {
    pub fn new(call: PortCall, kind: FaultKind, times: u32) -> Self {
        Self {
            call,
            kind,
            times,
            message: format!("scripted {kind:?} on {call:?}").to_lowercase(),
        }
    }

    async fn fire<T>(&self) -> Result<T, AutomationFault> {
        match self.kind {
            FaultKind::Transient => Err(AutomationFault::Transient(self.message.clone())),
            FaultKind::Fatal => Err(AutomationFault::Fatal(self.message.clone())),
            FaultKind::Hang => std::future::pending().await,
        }
    }
}

/// One journaled port call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    LoadPage(u32),
    Open(String),
    Discover { job: String, step: usize },
    Write { job: String, field: String, value: FieldValue },
    Advance(String),
    Submit(String),
}

/// Handle to an opened scripted form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedForm {
    job_id: String,
    step: usize,
}

#[derive(Debug, Default)]
pub struct ScriptedSurface {
    pages: Vec<ScriptedPage>,
    forms: HashMap<String, ScriptedPosting>,
    faults: HashMap<String, Vec<ScriptedFault>>,
    listing_faults: Vec<ScriptedFault>,
    journal: Vec<PortEvent>,
}

impl ScriptedSurface {
    pub fn new(script: ListingScript) -> Self {
        let mut forms = HashMap::new();
        let mut faults = HashMap::new();
        for page in &script.pages {
            for scripted in &page.postings {
                faults
                    .entry(scripted.posting.id.clone())
                    .or_insert_with(|| scripted.faults.clone());
                forms
                    .entry(scripted.posting.id.clone())
                    .or_insert_with(|| scripted.clone());
            }
        }
        Self {
            pages: script.pages,
            forms,
            faults,
            listing_faults: script.listing_faults,
            journal: Vec::new(),
        }
    }

    pub fn journal(&self) -> &[PortEvent] {
        &self.journal
    }

    pub fn submissions(&self, job_id: &str) -> usize {
        self.journal
            .iter()
            .filter(|e| matches!(e, PortEvent::Submit(id) if id == job_id))
            .count()
    }

    pub fn opened(&self) -> Vec<String> {
        self.journal
            .iter()
            .filter_map(|e| match e {
                PortEvent::Open(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Values written for `job_id`, in write order.
    pub fn written(&self, job_id: &str) -> Vec<(String, FieldValue)> {
        self.journal
            .iter()
            .filter_map(|e| match e {
                PortEvent::Write { job, field, value } if job == job_id => {
                    Some((field.clone(), value.clone()))
                }
                _ => None,
            })
            .collect()
    }

    fn take_fault(&mut self, job_id: &str, call: PortCall) -> Option<ScriptedFault> {
        let queue = self.faults.get_mut(job_id)?;
        take_from(queue, call)
    }

    fn steps(&self, surface: &ScriptedForm) -> &[FormStep] {
        self.forms
            .get(&surface.job_id)
            .map(|f| f.steps.as_slice())
            .unwrap_or_default()
    }
}

fn take_from(queue: &mut [ScriptedFault], call: PortCall) -> Option<ScriptedFault> {
    let fault = queue.iter_mut().find(|f| f.call == call && f.times > 0)?;
    fault.times -= 1;
    Some(fault.clone())
}

impl AutomationPort for ScriptedSurface {
    type Surface = ScriptedForm;

    async fn open(
        &mut self,
        posting: &JobPosting,
        _timeout: Duration,
    ) -> Result<ScriptedForm, AutomationFault> {
        self.journal.push(PortEvent::Open(posting.id.clone()));
        if let Some(fault) = self.take_fault(&posting.id, PortCall::Open) {
            return fault.fire().await;
        }
        match self.forms.get(&posting.id) {
            Some(form) if form.quick_apply_on_open && !form.steps.is_empty() => Ok(ScriptedForm {
                job_id: posting.id.clone(),
                step: 0,
            }),
            _ => Err(AutomationFault::CapabilityMismatch),
        }
    }

    async fn discover_step(
        &mut self,
        surface: &mut ScriptedForm,
        _timeout: Duration,
    ) -> Result<FormStep, AutomationFault> {
        self.journal.push(PortEvent::Discover {
            job: surface.job_id.clone(),
            step: surface.step,
        });
        if let Some(fault) = self.take_fault(&surface.job_id, PortCall::Discover) {
            return fault.fire().await;
        }
        self.steps(surface)
            .get(surface.step)
            .cloned()
            .ok_or_else(|| AutomationFault::Transient("form step not rendered".into()))
    }

    async fn write_field(
        &mut self,
        surface: &mut ScriptedForm,
        field: &FormField,
        value: &FieldValue,
        _timeout: Duration,
    ) -> Result<(), AutomationFault> {
        if let Some(fault) = self.take_fault(&surface.job_id, PortCall::Write) {
            return fault.fire().await;
        }
        self.journal.push(PortEvent::Write {
            job: surface.job_id.clone(),
            field: field.name.clone(),
            value: value.clone(),
        });
        Ok(())
    }

    async fn advance(
        &mut self,
        surface: &mut ScriptedForm,
        _timeout: Duration,
    ) -> Result<Advance, AutomationFault> {
        self.journal.push(PortEvent::Advance(surface.job_id.clone()));
        if let Some(fault) = self.take_fault(&surface.job_id, PortCall::Advance) {
            return fault.fire().await;
        }
        surface.step += 1;
        Ok(match self.steps(surface).get(surface.step) {
            Some(step) => Advance::Step(step.clone()),
            None => Advance::Review,
        })
    }

    async fn submit(
        &mut self,
        surface: &mut ScriptedForm,
        _timeout: Duration,
    ) -> Result<Confirmation, AutomationFault> {
        self.journal.push(PortEvent::Submit(surface.job_id.clone()));
        if let Some(fault) = self.take_fault(&surface.job_id, PortCall::Submit) {
            return fault.fire().await;
        }
        let confirms = self.forms.get(&surface.job_id).is_some_and(|f| f.confirms);
        Ok(if confirms {
            Confirmation::Confirmed {
                reference: Some(format!("APP-{}", surface.job_id)),
            }
        } else {
            Confirmation::Unconfirmed
        })
    }
}

impl ListingSource for ScriptedSurface {
    async fn load_page(
        &mut self,
        query: &SearchQuery,
        page: u32,
        _timeout: Duration,
    ) -> Result<ListingPage, AutomationFault> {
        tracing::debug!(url = %query.search_url(page), "loading scripted listing page");
        self.journal.push(PortEvent::LoadPage(page));
        if let Some(fault) = take_from(&mut self.listing_faults, PortCall::LoadPage) {
            return fault.fire().await;
        }
        let Some(scripted) = self.pages.get(page as usize) else {
            return Ok(ListingPage::default());
        };
        Ok(ListingPage {
            postings: scripted.postings.iter().map(|p| p.posting.clone()).collect(),
            partial: scripted.partial,
            has_next: (page as usize) + 1 < self.pages.len(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn query() -> SearchQuery {
        SearchQuery {
            keywords: "rust".into(),
            location: "Remote".into(),
            filters: Default::default(),
            max_results: 10,
            page_size: 25,
        }
    }

    #[tokio::test]
    async fn walks_steps_to_review_and_confirms() {
        let two_steps = scripted(
            "1",
            vec![
                step(vec![text_field("phone", "Phone")], false),
                step(vec![text_field("email", "Email")], false),
            ],
        );
        let mut surface = ScriptedSurface::new(single_page(vec![two_steps]));
        let t = Duration::from_secs(1);

        let mut form = surface.open(&posting("1"), t).await.unwrap();
        let first = surface.discover_step(&mut form, t).await.unwrap();
        assert_eq!(first.fields[0].name, "phone");
        let value = FieldValue::Text("555".into());
        surface.write_field(&mut form, &first.fields[0], &value, t).await.unwrap();
        assert!(matches!(surface.advance(&mut form, t).await.unwrap(), Advance::Step(_)));
        assert_eq!(surface.advance(&mut form, t).await.unwrap(), Advance::Review);
        assert!(matches!(
            surface.submit(&mut form, t).await.unwrap(),
            Confirmation::Confirmed { .. }
        ));
        assert_eq!(surface.submissions("1"), 1);
        assert_eq!(surface.written("1"), vec![("phone".to_string(), value)]);
    }

    #[tokio::test]
    async fn injected_faults_fire_the_configured_number_of_times() {
        let mut flaky = simple("1");
        flaky.faults.push(ScriptedFault::new(PortCall::Discover, FaultKind::Transient, 2));
        let mut surface = ScriptedSurface::new(single_page(vec![flaky]));
        let t = Duration::from_secs(1);

        let mut form = surface.open(&posting("1"), t).await.unwrap();
        for _ in 0..2 {
            let err = surface.discover_step(&mut form, t).await.unwrap_err();
            assert!(matches!(err, AutomationFault::Transient(_)));
        }
        assert!(surface.discover_step(&mut form, t).await.is_ok());
    }

    #[tokio::test]
    async fn capability_mismatch_on_open() {
        let mut no_form = simple("1");
        no_form.quick_apply_on_open = false;
        let mut surface = ScriptedSurface::new(single_page(vec![no_form]));
        let err = surface.open(&posting("1"), Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err, AutomationFault::CapabilityMismatch);
    }

    #[tokio::test]
    async fn listing_pages_report_next_page() {
        let mut script = single_page(vec![simple("1")]);
        script.pages.push(ScriptedPage {
            postings: vec![simple("2")],
            partial: true,
        });
        let mut surface = ScriptedSurface::new(script);
        let t = Duration::from_secs(1);

        let first = surface.load_page(&query(), 0, t).await.unwrap();
        assert!(first.has_next);
        let second = surface.load_page(&query(), 1, t).await.unwrap();
        assert!(!second.has_next);
        assert!(second.partial);
        assert_eq!(second.postings[0].id, "2");
        assert!(surface.load_page(&query(), 5, t).await.unwrap().postings.is_empty());
    }

    #[test]
    fn bundled_replay_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/listing.json");
        let script = ListingScript::from_json_file(&path).unwrap();
        assert_eq!(script.pages.len(), 2);
        assert!(script.pages[1].partial);
        assert!(!script.pages[0].postings[2].confirms);
    }

    #[test]
    fn script_deserializes_from_json() {
        let json = r#"{
            "pages": [{"postings": [{
                "posting": {"id": "9", "title": "SRE", "company": "Globex",
                            "link": "https://example.com/9", "quick_apply": true},
                "steps": [{"fields": [{"name": "phone", "kind": "short_text",
                                       "label": "Phone", "required": true}], "is_final": true}],
                "faults": [{"call": "submit", "kind": "hang"}]
            }]}]
        }"#;
        let script: ListingScript = serde_json::from_str(json).unwrap();
        let scripted = &script.pages[0].postings[0];
        assert!(scripted.confirms);
        assert!(scripted.quick_apply_on_open);
        assert_eq!(scripted.faults[0].times, 1);
        assert_eq!(scripted.faults[0].kind, FaultKind::Hang);
    }
}
