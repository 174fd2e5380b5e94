// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! Rate-limited requests (HTTP 429) are retried with exponential backoff.
//! Every other failure is returned on the first attempt.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, error, warn};

use persona_core::PersonaError;

use crate::types::{ApiErrorResponse, GenerateContentRequest, GenerateContentResponse};

/// Default API root.
pub const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Retry schedule for rate-limited requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay after the first rate-limited attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt: `base * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        base_url: &str,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, PersonaError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| PersonaError::Config(format!("invalid Gemini API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| PersonaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Sends the request to `model` and returns the trimmed text of the first candidate.
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, PersonaError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let mut attempt = 1;

        loop {
            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| PersonaError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, model, "generateContent response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| PersonaError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return extract_text(&body);
            }

            let body = response.text().await.unwrap_or_default();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.retry.max_attempts {
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                error!(attempt, body = %body, "rate limited on every attempt");
                return Err(PersonaError::RateLimited {
                    status: status.as_u16(),
                    body,
                });
            }

            error!(status = %status, body = %body, "Gemini request failed");
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => format!(
                    "Gemini API error ({} {}): {}",
                    api.error.code, api.error.status, api.error.message
                ),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(PersonaError::Provider {
                message,
                source: None,
            });
        }
    }
}

fn extract_text(body: &str) -> Result<String, PersonaError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| PersonaError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })?;

    parsed.first_text().ok_or_else(|| {
        let reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .or_else(|| parsed.candidates.first().and_then(|c| c.finish_reason.clone()))
            .unwrap_or_else(|| "no candidates".to_string());
        error!(reason = %reason, body = %body, "response carried no text");
        PersonaError::Provider {
            message: format!("response carried no text ({reason})"),
            source: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    fn test_client(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-key", base_url, fast_retry(), Duration::from_secs(5)).unwrap()
    }

    fn text_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
    }

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(4000));
        assert!(policy.backoff_delay(2) > policy.backoff_delay(1));
    }

    #[tokio::test]
    async fn success_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-pro:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"parts": [{"text": "hello"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("  hi there\n")))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        let text = client.generate_content("gemini-2.5-pro", &request).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        assert_eq!(client.generate_content("m", &request).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn gives_up_after_three_rate_limited_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        let err = client.generate_content("m", &request).await.unwrap_err();
        assert!(err.is_rate_limited(), "got: {err}");
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": {"code": 500, "message": "internal", "status": "INTERNAL"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        let err = client.generate_content("m", &request).await.unwrap_err();
        assert!(err.to_string().contains("INTERNAL"), "got: {err}");
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        assert!(client.generate_content("m", &request).await.is_err());
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = GenerateContentRequest::single_turn("hello", &[]);
        let err = client.generate_content("m", &request).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"), "got: {err}");
    }
}
