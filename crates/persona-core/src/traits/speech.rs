// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-to-speech trait.

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::traits::adapter::PluginAdapter;

/// Converts text into an encoded audio stream the voice transport can play.
#[async_trait]
pub trait SpeechSynthesizer: PluginAdapter {
    /// Synthesizes `text` in `language` (e.g. `zh-TW`) and returns encoded audio bytes.
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, PersonaError>;
}
