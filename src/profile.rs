//! The applicant's profile, read-only input to the field resolver.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    /// Semantic field name (e.g. `years_experience`) to answer.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub resume_path: Option<PathBuf>,
    /// Free-text background, used in cover-letter prompts and as fallback.
    #[serde(default)]
    pub summary: Option<String>,
}

impl UserProfile {
    /// Exact lookup of a semantic field name.
    ///
    /// The explicit mapping wins over the structured fields; empty values
    /// count as absent.
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.fields.get(name) {
            return non_empty(value);
        }
        match name {
            "full_name" | "name" => non_empty(&self.full_name),
            "first_name" => self.full_name.split_whitespace().next().map(str::to_string),
            "last_name" => {
                let mut parts = self.full_name.split_whitespace();
                parts.next()?;
                let rest: Vec<&str> = parts.collect();
                (!rest.is_empty()).then(|| rest.join(" "))
            }
            "email" => non_empty(&self.email),
            "phone" | "phone_number" => non_empty(&self.phone),
            "location" | "city" => non_empty(&self.location),
            _ => None,
        }
    }

    /// Background summary, if set and not blank.
    pub fn background(&self) -> Option<&str> {
        self.summary.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            full_name: "Ada Lovelace King".into(),
            email: "ada@example.com".into(),
            phone: "".into(),
            location: "London".into(),
            fields: BTreeMap::from([
                ("years_experience".to_string(), "7".to_string()),
                ("email".to_string(), "work@example.com".to_string()),
            ]),
            resume_path: None,
            summary: Some("   ".into()),
        }
    }

    #[test]
    fn mapping_wins_over_structured_fields() {
        assert_eq!(profile().lookup("email").as_deref(), Some("work@example.com"));
        assert_eq!(profile().lookup("years_experience").as_deref(), Some("7"));
    }

    #[test]
    fn names_are_derived_from_full_name() {
        let p = profile();
        assert_eq!(p.lookup("first_name").as_deref(), Some("Ada"));
        assert_eq!(p.lookup("last_name").as_deref(), Some("Lovelace King"));
        assert_eq!(p.lookup("full_name").as_deref(), Some("Ada Lovelace King"));
    }

    #[test]
    fn blank_values_are_absent() {
        let p = profile();
        assert_eq!(p.lookup("phone"), None);
        assert_eq!(p.lookup("unknown"), None);
        assert_eq!(p.background(), None);
    }
}
