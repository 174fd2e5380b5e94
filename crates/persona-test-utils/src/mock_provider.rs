// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model provider for deterministic testing.
//!
//! Replies are popped from a FIFO queue. A queued `None`, or an empty queue,
//! fails the call the way an unreachable backend would.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use persona_core::{
    AdapterType, HealthStatus, InlineMedia, ModelProvider, PersonaError, PluginAdapter,
};

/// A recorded model call.
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub prompt: String,
    pub media: Vec<InlineMedia>,
}

/// A model provider that replays queued replies and records every prompt.
pub struct MockProvider {
    replies: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider pre-loaded with successful replies.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Some(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(Some(reply.into()));
    }

    /// Queues a backend failure.
    pub async fn push_failure(&self) {
        self.replies.lock().await.push_back(None);
    }

    pub async fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().await.clone()
    }

    pub async fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|c| c.prompt.clone())
            .collect()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
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
        Ok(())
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn generate(&self, prompt: &str, media: &[InlineMedia]) -> Result<String, PersonaError> {
        self.calls.lock().await.push(ProviderCall {
            prompt: prompt.to_string(),
            media: media.to_vec(),
        });
        match self.replies.lock().await.pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(PersonaError::Provider {
                message: "mock backend failure".into(),
                source: None,
            }),
            None => Err(PersonaError::Provider {
                message: "no queued mock reply".into(),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_in_order_then_fails() {
        let provider = MockProvider::with_replies(["first", "second"]);
        assert_eq!(provider.generate("a", &[]).await.unwrap(), "first");
        assert_eq!(provider.generate("b", &[]).await.unwrap(), "second");
        assert!(provider.generate("c", &[]).await.is_err());
        assert_eq!(provider.prompts().await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn invoke_maps_failure_to_none() {
        let provider = MockProvider::new();
        provider.push_failure().await;
        assert_eq!(provider.invoke("x", &[]).await, None);
    }
}
