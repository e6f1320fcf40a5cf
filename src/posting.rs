//! Job postings and the search query that produces them.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";

/// Query parameters the listing surface manages itself; configured filters
/// with these keys are dropped.
const EXCLUDED_FILTERS: &[&str] = &["currentJobId", "miniJob", "pageNum"];

/// One listing entry. Immutable once produced by the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub link: String,
    pub quick_apply: bool,
}

impl std::fmt::Display for JobPosting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.title, self.company)
    }
}

/// Search parameters for the enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
    /// Extra query filters appended verbatim (e.g. `f_WT = "2"` for remote).
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Upper bound on postings yielded in one session.
    pub max_results: usize,
    /// Listing entries per page, used for the `start` offset.
    pub page_size: u32,
}

impl SearchQuery {
    /// The listing URL for a zero-based page.
    pub fn search_url(&self, page: u32) -> Url {
        let mut params: Vec<(&str, String)> = vec![
            ("keywords", self.keywords.clone()),
            ("location", self.location.clone()),
            ("f_LF", "f_AL".to_string()),
            ("sortBy", "DD".to_string()),
        ];
        for (key, value) in &self.filters {
            if value.is_empty() || EXCLUDED_FILTERS.contains(&key.as_str()) {
                continue;
            }
            params.push((key.as_str(), value.clone()));
        }
        if page > 0 {
            params.push(("start", (page * self.page_size).to_string()));
        }

        let mut url = Url::parse(SEARCH_URL).expect("search base URL is valid");
        url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        url
    }
}
