//! Session configuration loaded from `quickapply.toml`.
//!
//! Every field has a default, so partial files work and a missing default
//! file means "all defaults". Environment variables override the file, and
//! CLI flags override both (applied in `main`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QuickApplyError;
use crate::posting::SearchQuery;
use crate::profile::UserProfile;
use crate::resolver::FieldPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "quickapply.toml";
const DEMO_OUTCOMES_FILE: &str = "demo-outcomes.jsonl";

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first try; 0 means a single try.
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Anthropic API key. `ANTHROPIC_API_KEY` takes precedence.
    #[serde(default)]
    pub api_key: String,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub cover_letter: CoverLetterConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub retry: RetryLimits,
    #[serde(default)]
    pub fields: FieldPolicy,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub keywords: String,
    pub location: String,
    pub filters: BTreeMap<String, String>,
    pub max_results: usize,
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            location: "Remote".into(),
            filters: BTreeMap::new(),
            max_results: 100,
            page_size: 25,
        }
    }
}

impl SearchConfig {
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            keywords: self.keywords.clone(),
            location: self.location.clone(),
            filters: self.filters.clone(),
            max_results: self.max_results,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub max_applications: u32,
    pub wait_min_secs: u64,
    pub wait_max_secs: u64,
    /// Start the first attempt without waiting.
    pub skip_initial_wait: bool,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            max_applications: 10,
            wait_min_secs: 10,
            wait_max_secs: 30,
            skip_initial_wait: false,
        }
    }
}

/// What to write into a cover-letter field when generation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverLetterFallback {
    #[default]
    None,
    /// The profile's background summary.
    Summary,
    /// A short generic letter signed with the profile name.
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterConfig {
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
    /// Total generation attempts per field, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub fallback: CoverLetterFallback,
    /// Characters of the job description sent with the request.
    pub excerpt_chars: usize,
}

impl Default for CoverLetterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "claude-haiku-4-5-20251001".into(),
            max_tokens: 600,
            max_attempts: 3,
            base_delay_ms: 2000,
            timeout_secs: 60,
            fallback: CoverLetterFallback::None,
            excerpt_chars: 2000,
        }
    }
}

impl CoverLetterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_attempts.saturating_sub(1),
            base_delay_ms: self.base_delay_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per call for open/discover/write/advance.
    pub ui_ms: u64,
    /// Bounded wait for the submit confirmation.
    pub confirm_ms: u64,
    pub listing_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ui_ms: 10_000,
            confirm_ms: 10_000,
            listing_ms: 60_000,
        }
    }
}

impl TimeoutConfig {
    pub fn ui(&self) -> Duration {
        Duration::from_millis(self.ui_ms)
    }

    pub fn confirm(&self) -> Duration {
        Duration::from_millis(self.confirm_ms)
    }

    pub fn listing(&self) -> Duration {
        Duration::from_millis(self.listing_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryLimits {
    /// Timeouts and missing elements while filling a posting.
    pub transient: RetryPolicy,
    /// Loading a listing page.
    pub enumeration: RetryPolicy,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            transient: RetryPolicy {
                max_retries: 2,
                base_delay_ms: 500,
            },
            enumeration: RetryPolicy {
                max_retries: 3,
                base_delay_ms: 2000,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// JSON-lines file receiving one record per attempt.
    pub path: PathBuf,
}

impl RecorderConfig {
    /// Where `demo` records, kept apart from the file `replay` resumes from.
    pub fn demo_path(&self) -> PathBuf {
        self.path.with_file_name(DEMO_OUTCOMES_FILE)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/outcomes.jsonl"),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            log_level: default_log_level(),
            search: SearchConfig::default(),
            pacing: PacingConfig::default(),
            cover_letter: CoverLetterConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: RetryLimits::default(),
            fields: FieldPolicy::default(),
            profile: UserProfile::default(),
            recorder: RecorderConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Loads `path`, or `quickapply.toml` in the working directory when
    /// `path` is `None`. Only the implicit default file may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self, QuickApplyError> {
        let mut config = match path {
            Some(explicit) => Self::from_file(explicit)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, QuickApplyError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            QuickApplyError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Ok(toml::from_str::<SessionConfig>(&contents)?)
    }

    /// Applies environment overrides through `get`, so tests can pass a map.
    /// A value that does not parse is a config error.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), QuickApplyError> {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.api_key = key;
        }
        if let Some(keywords) = var("QUICKAPPLY_KEYWORDS") {
            self.search.keywords = keywords;
        }
        if let Some(location) = var("QUICKAPPLY_LOCATION") {
            self.search.location = location;
        }
        if let Some(max) = var("QUICKAPPLY_MAX_APPS") {
            self.pacing.max_applications = max.trim().parse().map_err(|_| {
                QuickApplyError::Config(format!(
                    "QUICKAPPLY_MAX_APPS must be a non-negative integer, got {max:?}"
                ))
            })?;
        }
        if let Some(enabled) = var("QUICKAPPLY_COVER_LETTER") {
            self.cover_letter.enabled = match enabled.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(QuickApplyError::Config(format!(
                        "QUICKAPPLY_COVER_LETTER must be true or false, got {enabled:?}"
                    )));
                }
            };
        }
        if let Some(name) = var("QUICKAPPLY_FULL_NAME") {
            self.profile.full_name = name;
        }
        if let Some(phone) = var("QUICKAPPLY_PHONE") {
            self.profile.phone = phone;
        }
        if let Some(resume) = var("QUICKAPPLY_RESUME") {
            self.profile.resume_path = Some(PathBuf::from(resume));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), QuickApplyError> {
        if self.pacing.wait_min_secs > self.pacing.wait_max_secs {
            return Err(QuickApplyError::Config(format!(
                "pacing.wait_min_secs ({}) exceeds pacing.wait_max_secs ({})",
                self.pacing.wait_min_secs, self.pacing.wait_max_secs
            )));
        }
        if self.cover_letter.max_attempts == 0 {
            return Err(QuickApplyError::Config(
                "cover_letter.max_attempts must be at least 1".into(),
            ));
        }
        if self.search.page_size == 0 {
            return Err(QuickApplyError::Config(
                "search.page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// A copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_key.is_empty() {
            copy.api_key = "***".into();
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_values() {
        let config = SessionConfig::default();
        assert_eq!(config.pacing.max_applications, 10);
        assert_eq!(config.pacing.wait_min_secs, 10);
        assert_eq!(config.pacing.wait_max_secs, 30);
        assert_eq!(config.search.location, "Remote");
        assert!(!config.cover_letter.enabled);
        assert_eq!(config.cover_letter.fallback, CoverLetterFallback::None);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"

            [search]
            keywords = "rust engineer"
            filters = { f_WT = "2" }

            [pacing]
            max_applications = 3
            skip_initial_wait = true

            [cover_letter]
            enabled = true
            fallback = "summary"

            [fields]
            boolean_defaults = { requires_sponsorship = false }
            accept_empty = ["middle_name"]

            [profile]
            full_name = "Grace Hopper"
            fields = { years_experience = "12" }
        "#;
        let config: SessionConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.search.keywords, "rust engineer");
        assert_eq!(config.search.location, "Remote");
        assert_eq!(config.search.filters.get("f_WT").map(String::as_str), Some("2"));
        assert_eq!(config.pacing.max_applications, 3);
        assert_eq!(config.pacing.wait_max_secs, 30);
        assert!(config.pacing.skip_initial_wait);
        assert_eq!(config.cover_letter.fallback, CoverLetterFallback::Summary);
        assert_eq!(config.cover_letter.max_attempts, 3);
        assert_eq!(config.fields.boolean_defaults.get("requires_sponsorship"), Some(&false));
        assert!(config.fields.accept_empty.contains("middle_name"));
        assert_eq!(config.profile.lookup("years_experience").as_deref(), Some("12"));
        assert_eq!(config.retry.transient.max_retries, 2);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ANTHROPIC_API_KEY", "sk-env"),
            ("QUICKAPPLY_KEYWORDS", "platform engineer"),
            ("QUICKAPPLY_MAX_APPS", "4"),
            ("QUICKAPPLY_COVER_LETTER", "true"),
            ("QUICKAPPLY_RESUME", "/home/me/cv.pdf"),
            ("QUICKAPPLY_LOCATION", "  "),
        ]);
        let mut config = SessionConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.search.keywords, "platform engineer");
        assert_eq!(config.search.location, "Remote");
        assert_eq!(config.pacing.max_applications, 4);
        assert!(config.cover_letter.enabled);
        assert_eq!(config.profile.resume_path, Some(PathBuf::from("/home/me/cv.pdf")));
    }

    #[test]
    fn unparsable_env_values_are_config_errors() {
        for (key, value) in [("QUICKAPPLY_MAX_APPS", "five"), ("QUICKAPPLY_COVER_LETTER", "maybe")] {
            let mut config = SessionConfig::default();
            let err = config
                .apply_env(|k| (k == key).then(|| value.to_string()))
                .unwrap_err();
            assert!(matches!(err, QuickApplyError::Config(ref msg) if msg.contains(key)));
        }
    }

    #[test]
    fn demo_outcomes_live_next_to_the_configured_file() {
        let recorder = RecorderConfig {
            path: PathBuf::from("runs/outcomes.jsonl"),
        };
        assert_eq!(recorder.demo_path(), PathBuf::from("runs/demo-outcomes.jsonl"));
    }

    #[test]
    fn validation_rejects_inverted_wait_range() {
        let mut config = SessionConfig::default();
        config.pacing.wait_min_secs = 40;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wait_min_secs"));

        let mut config = SessionConfig::default();
        config.cover_letter.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = SessionConfig::load(Some(Path::new("/nonexistent/quickapply.toml"))).unwrap_err();
        assert!(matches!(err, QuickApplyError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quickapply.toml");
        std::fs::write(&path, "[pacing]\nmax_applications = 2\n").unwrap();
        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.pacing.max_applications, 2);
    }

    #[test]
    fn example_config_parses_and_validates() {
        let config: SessionConfig =
            toml::from_str(include_str!("../quickapply.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.cover_letter.fallback, CoverLetterFallback::Template);
        assert_eq!(config.fields.defaults.get("notice_period").map(String::as_str), Some("2 weeks"));
        assert_eq!(config.profile.resume_path, Some(PathBuf::from("resume.pdf")));
    }

    #[test]
    fn redacted_masks_api_key() {
        let config = SessionConfig {
            api_key: "sk-secret".into(),
            ..Default::default()
        };
        assert_eq!(config.redacted().api_key, "***");
        assert_eq!(SessionConfig::default().redacted().api_key, "");
    }

    #[test]
    fn retry_policy_exponential_backoff() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 1000,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(8000));
    }
}
