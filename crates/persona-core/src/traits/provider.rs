// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language model provider trait.

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InlineMedia;

/// Adapter for the generative model backend.
#[async_trait]
pub trait ModelProvider: PluginAdapter {
    /// Sends one prompt plus optional inline media and returns the trimmed text reply.
    async fn generate(
        &self,
        prompt: &str,
        media: &[InlineMedia],
    ) -> Result<String, PersonaError>;

    /// Like [`generate`](Self::generate), but collapses failures and empty
    /// replies into `None`.
    ///
    /// Callers at turn boundaries use this so a backend failure silently ends
    /// the turn instead of surfacing to the user.
    async fn invoke(&self, prompt: &str, media: &[InlineMedia]) -> Option<String> {
        match self.generate(prompt, media).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::debug!(provider = self.name(), "model returned an empty reply");
                None
            }
            Err(e) => {
                tracing::error!(provider = self.name(), error = %e, "model invocation failed");
                None
            }
        }
    }
}
