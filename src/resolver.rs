//! Maps discovered form fields to values from the user's profile.
//!
//! Policy, in order:
//! 1. exact semantic-name match in the profile;
//! 2. a configured default for that name (booleans only via `boolean_defaults`);
//! 3. file uploads get the resume;
//! 4. otherwise the field is unresolvable, unless its name is listed in
//!    `accept_empty`.
//!
//! Values for selects must name one of the allowed options. A mapped value
//! that matches no option, or more than one, is unresolvable: the resolver
//! never guesses.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::form::{FieldKind, FieldValue, FormField};
use crate::profile::UserProfile;

/// Configured defaults for fields the profile does not answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPolicy {
    /// Answers for yes/no questions, e.g. `requires_sponsorship = false`.
    #[serde(default)]
    pub boolean_defaults: BTreeMap<String, bool>,
    /// Fallback answers for any other kind, validated like profile values.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Semantic names that may be submitted empty.
    #[serde(default)]
    pub accept_empty: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Value(FieldValue),
    /// A cover-letter field with no explicit answer; text must be acquired.
    NeedsCoverLetter,
    Unresolvable,
}

/// Field resolution seam used by the state machine.
pub trait Resolver {
    fn resolve(&self, field: &FormField, profile: &UserProfile) -> Resolution;
}

#[derive(Debug, Clone, Default)]
pub struct FieldResolver {
    policy: FieldPolicy,
}

impl FieldResolver {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    fn default_for(&self, field: &FormField) -> Option<Resolution> {
        match field.kind {
            FieldKind::Boolean => self
                .policy
                .boolean_defaults
                .get(&field.name)
                .map(|b| Resolution::Value(FieldValue::Bool(*b))),
            FieldKind::SingleSelect => {
                if let Some(b) = self.policy.boolean_defaults.get(&field.name) {
                    return Some(coerce(field, if *b { "Yes" } else { "No" }));
                }
                self.policy.defaults.get(&field.name).map(|raw| coerce(field, raw))
            }
            _ => self.policy.defaults.get(&field.name).map(|raw| coerce(field, raw)),
        }
    }
}

impl Resolver for FieldResolver {
    fn resolve(&self, field: &FormField, profile: &UserProfile) -> Resolution {
        if let Some(raw) = profile.lookup(&field.name) {
            return coerce(field, &raw);
        }
        if field.is_cover_letter() {
            return Resolution::NeedsCoverLetter;
        }
        if let Some(resolution) = self.default_for(field) {
            return resolution;
        }
        if field.kind == FieldKind::FileUpload {
            if let Some(resume) = &profile.resume_path {
                return Resolution::Value(FieldValue::File(resume.clone()));
            }
        }
        if self.policy.accept_empty.contains(&field.name) {
            return Resolution::Value(FieldValue::Empty);
        }
        Resolution::Unresolvable
    }
}

fn coerce(field: &FormField, raw: &str) -> Resolution {
    let value = match field.kind {
        FieldKind::ShortText | FieldKind::LongText => Some(FieldValue::Text(raw.to_string())),
        FieldKind::SingleSelect => unique_option(field, raw).map(FieldValue::Choice),
        FieldKind::MultiSelect => multi_options(field, raw).map(FieldValue::Choices),
        FieldKind::Boolean => parse_bool(raw).map(FieldValue::Bool),
        FieldKind::FileUpload => Some(FieldValue::File(PathBuf::from(raw))),
    };
    value.map_or(Resolution::Unresolvable, Resolution::Value)
}

fn unique_option(field: &FormField, raw: &str) -> Option<String> {
    let wanted = raw.trim();
    let mut matches = field
        .options
        .iter()
        .filter(|option| option.trim().eq_ignore_ascii_case(wanted));
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first.clone())
}

fn multi_options(field: &FormField, raw: &str) -> Option<Vec<String>> {
    let mut chosen: Vec<String> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let option = unique_option(field, part)?;
        if !chosen.contains(&option) {
            chosen.push(option);
        }
    }
    (!chosen.is_empty()).then_some(chosen)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, kind: FieldKind, options: &[&str]) -> FormField {
        FormField {
            name: name.into(),
            kind,
            label: format!("{name}?"),
            required: true,
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            full_name: "Grace Hopper".into(),
            phone: "+1 555 0100".into(),
            fields: BTreeMap::from([
                ("years_experience".to_string(), "12".to_string()),
                ("degree".to_string(), "master's".to_string()),
                ("languages".to_string(), "rust, Go".to_string()),
                ("relocate".to_string(), "yes".to_string()),
                ("clearance".to_string(), "maybe".to_string()),
            ]),
            resume_path: Some(PathBuf::from("/tmp/resume.pdf")),
            ..Default::default()
        }
    }

    #[test]
    fn exact_profile_match_for_text() {
        let r = FieldResolver::default();
        assert_eq!(
            r.resolve(&field("phone", FieldKind::ShortText, &[]), &profile()),
            Resolution::Value(FieldValue::Text("+1 555 0100".into()))
        );
        assert_eq!(
            r.resolve(&field("years_experience", FieldKind::ShortText, &[]), &profile()),
            Resolution::Value(FieldValue::Text("12".into()))
        );
    }

    #[test]
    fn single_select_writes_canonical_option() {
        let r = FieldResolver::default();
        let degree = field("degree", FieldKind::SingleSelect, &["Bachelor's", "Master's"]);
        assert_eq!(
            r.resolve(&degree, &profile()),
            Resolution::Value(FieldValue::Choice("Master's".into()))
        );
    }

    #[test]
    fn mapped_value_outside_options_is_unresolvable_even_with_default() {
        let policy = FieldPolicy {
            defaults: BTreeMap::from([("degree".to_string(), "PhD".to_string())]),
            ..Default::default()
        };
        let r = FieldResolver::new(policy);
        let degree = field("degree", FieldKind::SingleSelect, &["Bachelor's", "PhD"]);
        assert_eq!(r.resolve(&degree, &profile()), Resolution::Unresolvable);
    }

    #[test]
    fn duplicate_matching_options_are_ambiguous() {
        let r = FieldResolver::default();
        let degree = field("degree", FieldKind::SingleSelect, &["Master's", "MASTER'S"]);
        assert_eq!(r.resolve(&degree, &profile()), Resolution::Unresolvable);
    }

    #[test]
    fn multi_select_requires_every_value_to_match() {
        let r = FieldResolver::default();
        let langs = field("languages", FieldKind::MultiSelect, &["Rust", "Go", "C"]);
        assert_eq!(
            r.resolve(&langs, &profile()),
            Resolution::Value(FieldValue::Choices(vec!["Rust".into(), "Go".into()]))
        );
        let narrow = field("languages", FieldKind::MultiSelect, &["Rust"]);
        assert_eq!(r.resolve(&narrow, &profile()), Resolution::Unresolvable);
    }

    #[test]
    fn booleans_parse_or_fail() {
        let r = FieldResolver::default();
        assert_eq!(
            r.resolve(&field("relocate", FieldKind::Boolean, &[]), &profile()),
            Resolution::Value(FieldValue::Bool(true))
        );
        assert_eq!(
            r.resolve(&field("clearance", FieldKind::Boolean, &[]), &profile()),
            Resolution::Unresolvable
        );
    }

    #[test]
    fn boolean_default_only_when_configured() {
        let sponsorship = field("requires_sponsorship", FieldKind::Boolean, &[]);
        assert_eq!(
            FieldResolver::default().resolve(&sponsorship, &profile()),
            Resolution::Unresolvable
        );

        let policy = FieldPolicy {
            boolean_defaults: BTreeMap::from([("requires_sponsorship".to_string(), false)]),
            ..Default::default()
        };
        let r = FieldResolver::new(policy);
        assert_eq!(
            r.resolve(&sponsorship, &profile()),
            Resolution::Value(FieldValue::Bool(false))
        );
        let as_select = field("requires_sponsorship", FieldKind::SingleSelect, &["Yes", "No"]);
        assert_eq!(
            r.resolve(&as_select, &profile()),
            Resolution::Value(FieldValue::Choice("No".into()))
        );
    }

    #[test]
    fn file_upload_uses_resume() {
        let r = FieldResolver::default();
        assert_eq!(
            r.resolve(&field("resume", FieldKind::FileUpload, &[]), &profile()),
            Resolution::Value(FieldValue::File(PathBuf::from("/tmp/resume.pdf")))
        );
        let no_resume = UserProfile::default();
        assert_eq!(
            r.resolve(&field("resume", FieldKind::FileUpload, &[]), &no_resume),
            Resolution::Unresolvable
        );
    }

    #[test]
    fn cover_letter_needs_generation_unless_mapped() {
        let r = FieldResolver::default();
        let cover = field("cover_letter", FieldKind::LongText, &[]);
        assert_eq!(r.resolve(&cover, &profile()), Resolution::NeedsCoverLetter);

        let mut mapped = profile();
        mapped
            .fields
            .insert("cover_letter".into(), "Hand-written letter".into());
        assert_eq!(
            r.resolve(&cover, &mapped),
            Resolution::Value(FieldValue::Text("Hand-written letter".into()))
        );
    }

    #[test]
    fn accept_empty_is_last_resort() {
        let policy = FieldPolicy {
            accept_empty: BTreeSet::from(["middle_name".to_string()]),
            ..Default::default()
        };
        let r = FieldResolver::new(policy);
        assert_eq!(
            r.resolve(&field("middle_name", FieldKind::ShortText, &[]), &profile()),
            Resolution::Value(FieldValue::Empty)
        );
        assert_eq!(
            r.resolve(&field("salary", FieldKind::ShortText, &[]), &profile()),
            Resolution::Unresolvable
        );
    }
}
