// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Speech synthesis through the Google Translate TTS endpoint.
//!
//! The endpoint accepts at most 200 characters per request, so longer text
//! is split on whitespace and the returned MP3 chunks are concatenated.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use persona_core::{AdapterType, HealthStatus, PersonaError, PluginAdapter, SpeechSynthesizer};

pub const TTS_BASE_URL: &str = "https://translate.google.com";

/// Per-request character limit of the endpoint.
pub const MAX_CHUNK_CHARS: usize = 200;

/// MP3 synthesizer backed by `translate.google.com/translate_tts`.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleTranslateTts {
    pub fn new(timeout: Duration) -> Result<Self, PersonaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersonaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: TTS_BASE_URL.to_string(),
        })
    }

    /// Overrides the endpoint root (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn fetch_chunk(
        &self,
        text: &str,
        language: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, PersonaError> {
        let endpoint = format!("{}/translate_tts", self.base_url.trim_end_matches('/'));
        let textlen = text.chars().count().to_string();
        let (idx, total) = (idx.to_string(), total.to_string());
        let url = reqwest::Url::parse_with_params(
            &endpoint,
            [
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", language),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
                ("prev", "input"),
                ("ttsspeed", "1"),
            ],
        )
        .map_err(|e| PersonaError::Provider {
            message: format!("invalid TTS url: {e}"),
            source: Some(Box::new(e)),
        })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PersonaError::Provider {
                message: format!("TTS request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersonaError::Provider {
                message: format!("TTS endpoint returned {status}: {body}"),
                source: None,
            });
        }

        let bytes = response.bytes().await.map_err(|e| PersonaError::Provider {
            message: format!("failed to read TTS audio: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PluginAdapter for GoogleTranslateTts {
    fn name(&self) -> &str {
        "google-translate-tts"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Synthesizer
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        Ok(())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, PersonaError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(PersonaError::Voice {
                message: "nothing to synthesize".to_string(),
            });
        }

        let total = chunks.len();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, language, idx, total).await?);
        }
        debug!(chunks = total, bytes = audio.len(), "speech synthesized");
        Ok(audio)
    }
}

/// Splits `text` into chunks of at most `max_chars` characters.
///
/// Breaks at whitespace where possible; a single word longer than the limit
/// (common in unspaced CJK text) is cut at the limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current_len == 0 { word_len } else { word_len + 1 };

        if current_len + needed <= max_chars {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += needed;
            continue;
        }

        if current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len <= max_chars {
            current.push_str(word);
            current_len = word_len;
        } else {
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(max_chars).peekable();
            while let Some(piece) = pieces.next() {
                let piece: String = piece.iter().collect();
                if pieces.peek().is_some() {
                    chunks.push(piece);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
        }
    }

    if current_len > 0 {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("  hello   world ", 200), vec!["hello world"]);
    }

    #[test]
    fn splits_on_whitespace() {
        let chunks = split_text("aaa bbb ccc", 7);
        assert_eq!(chunks, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn long_unspaced_text_is_cut_by_chars() {
        let text = "你".repeat(450);
        let chunks = split_text(&text, 200);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 200);
        assert_eq!(chunks[2].chars().count(), 50);
    }

    #[test]
    fn blank_text_has_no_chunks() {
        assert!(split_text("   ", 200).is_empty());
    }

    #[tokio::test]
    async fn synthesize_requests_each_chunk_and_concatenates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("tl", "zh-TW"))
            .and(query_param("client", "tw-ob"))
            .and(query_param("idx", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2]))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("idx", "1"))
            .and(query_param("total", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8]))
            .expect(1)
            .mount(&server)
            .await;

        let tts = GoogleTranslateTts::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        let text = format!("{} {}", "a".repeat(150), "b".repeat(150));
        let audio = tts.synthesize(&text, "zh-TW").await.unwrap();
        assert_eq!(audio, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn endpoint_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tts = GoogleTranslateTts::new(Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.uri());
        assert!(tts.synthesize("hello", "en").await.is_err());
    }
}
