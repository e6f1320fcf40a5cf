//! Text-generation port for cover letters and its Anthropic implementation.
//!
//! Requests carry only what the prompt needs; generating has no side effects
//! beyond the returned text, so callers may retry freely.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::anthropic::{MessageSender, MessagesRequest};
use crate::error::CoverLetterFault;
use crate::posting::JobPosting;
use crate::profile::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetterRequest {
    pub job_title: String,
    pub company: String,
    pub description_excerpt: String,
    pub background: String,
}

impl CoverLetterRequest {
    pub fn for_posting(posting: &JobPosting, profile: &UserProfile, excerpt_chars: usize) -> Self {
        Self {
            job_title: posting.title.clone(),
            company: posting.company.clone(),
            description_excerpt: excerpt(&posting.description, excerpt_chars),
            background: profile.background().unwrap_or_default().to_string(),
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "You are a professional resume writer. Please write a concise, tailored cover letter \
             for the position '{}' at '{}'.\n\nJob description: {}\n\nMy background: {}\n\n\
             Output only the cover letter, professional with a friendly tone, under 250 words.",
            self.job_title, self.company, self.description_excerpt, self.background
        )
    }
}

pub type CoverLetterResult = Result<String, CoverLetterFault>;

pub trait TextGenerator {
    async fn generate(&self, request: &CoverLetterRequest, timeout: Duration) -> CoverLetterResult;
}

/// Cover letters from the Anthropic Messages API.
pub struct AnthropicCoverLetter<S> {
    sender: S,
    model: String,
    max_tokens: u32,
}

impl<S: MessageSender> AnthropicCoverLetter<S> {
    pub fn new(sender: S, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            sender,
            model: model.into(),
            max_tokens,
        }
    }
}

impl<S: MessageSender> TextGenerator for AnthropicCoverLetter<S> {
    async fn generate(&self, request: &CoverLetterRequest, timeout: Duration) -> CoverLetterResult {
        let mut req = MessagesRequest::single_turn(&self.model, self.max_tokens, request.prompt());
        req.temperature = Some(0.7);

        let response = tokio::time::timeout(timeout, self.sender.send_message(&req))
            .await
            .map_err(|_| CoverLetterFault::Timeout)??;
        let text = response.text();
        if text.is_empty() {
            return Err(CoverLetterFault::Empty);
        }
        Ok(text)
    }
}

/// Generator used when generation is switched off or no API key is set.
pub struct Unavailable(pub String);

impl TextGenerator for Unavailable {
    async fn generate(&self, _request: &CoverLetterRequest, _timeout: Duration) -> CoverLetterResult {
        Err(CoverLetterFault::Unavailable(self.0.clone()))
    }
}

/// Whitespace-normalised prefix of `text`, at most `max_chars` characters.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let normalised = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match normalised.char_indices().nth(max_chars) {
        Some((cut, _)) => normalised[..cut].trim_end().to_string(),
        None => normalised,
    }
}

/// Generic letter used by the `template` fallback.
pub fn template_letter(posting: &JobPosting, profile: &UserProfile) -> String {
    let signature = if profile.full_name.trim().is_empty() {
        "Best regards".to_string()
    } else {
        format!("Best regards,\n{}", profile.full_name.trim())
    };
    format!(
        "Dear Hiring Manager,\n\nI am excited to apply for the {} position at {}. \
         Thank you for your consideration.\n\n{}",
        posting.title, posting.company, signature
    )
}
