// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini model backend for the Persona agent.
//!
//! [`GeminiProvider`] implements [`ModelProvider`]: one prompt plus optional
//! inline media in, trimmed text out. Text-only prompts go to the more
//! capable model, prompts carrying image or audio go to the multimodal one.
//! Transcription uses the same path with an audio part attached.
//! [`GoogleTranslateTts`] implements speech synthesis.

pub mod client;
pub mod tts;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use persona_config::model::GeminiConfig;
use persona_core::{
    AdapterType, HealthStatus, InlineMedia, ModelProvider, PersonaError, PluginAdapter,
};

use crate::client::{GeminiClient, RetryPolicy};
use crate::types::GenerateContentRequest;

pub use crate::tts::GoogleTranslateTts;

/// Gemini provider implementing [`ModelProvider`].
pub struct GeminiProvider {
    client: GeminiClient,
    text_model: String,
    multimodal_model: String,
}

impl GeminiProvider {
    /// Creates a provider from configuration. Fails when no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self, PersonaError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                PersonaError::Config(
                    "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
                )
            })?;

        let retry = RetryPolicy {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        };
        let client = GeminiClient::new(
            api_key,
            &config.base_url,
            retry,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(
            text_model = config.text_model,
            multimodal_model = config.multimodal_model,
            "Gemini provider initialized"
        );

        Ok(Self {
            client,
            text_model: config.text_model.clone(),
            multimodal_model: config.multimodal_model.clone(),
        })
    }

    /// The model a request with `media` attached is routed to.
    pub fn select_model(&self, media: &[InlineMedia]) -> &str {
        if media.is_empty() {
            &self.text_model
        } else {
            &self.multimodal_model
        }
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn generate(&self, prompt: &str, media: &[InlineMedia]) -> Result<String, PersonaError> {
        let model = self.select_model(media);
        let request = GenerateContentRequest::single_turn(prompt, media);
        debug!(model, media = media.len(), "invoking model");
        self.client.generate_content(model, &request).await
    }
}
