use std::time::Duration;

use reqwest::Client;

use super::error::AnthropicError;
use super::types::{MessagesRequest, MessagesResponse};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anything that can answer a Messages request. Implemented by the HTTP
/// client and by test doubles.
pub trait MessageSender {
    async fn send_message(&self, req: &MessagesRequest)
    -> Result<MessagesResponse, AnthropicError>;
}

pub struct AnthropicClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, AnthropicError> {
        Self::with_base_url(api_key, API_URL.to_string(), timeout)
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, AnthropicError> {
        if api_key.trim().is_empty() {
            return Err(AnthropicError::MissingApiKey);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }
}

impl MessageSender for AnthropicClient {
    async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, AnthropicError> {
        tracing::debug!(model = %req.model, max_tokens = req.max_tokens, "sending messages request");
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(AnthropicError::RateLimited { retry_after_ms });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AnthropicError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<MessagesResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::with_base_url(
            "sk-test".into(),
            format!("{}/v1/messages", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn request() -> MessagesRequest {
        MessagesRequest::single_turn("claude-haiku-4-5-20251001", 300, "Write a cover letter")
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = AnthropicClient::new("  ".into(), Duration::from_secs(1)).err().unwrap();
        assert!(matches!(err, AnthropicError::MissingApiKey));
    }

    #[tokio::test]
    async fn sends_headers_and_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": [{"type": "text", "text": "Dear Hiring Manager"}],
                "model": "claude-haiku-4-5-20251001",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 4}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server).send_message(&request()).await.unwrap();
        assert_eq!(resp.text(), "Dear Hiring Manager");
        assert_eq!(resp.usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_message(&request()).await.unwrap_err();
        assert!(matches!(err, AnthropicError::RateLimited { retry_after_ms: 7000 }));
    }

    #[tokio::test]
    async fn non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let err = client_for(&server).send_message(&request()).await.unwrap_err();
        match err {
            AnthropicError::ApiError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }
}
