// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock speech synthesizer and voice transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use persona_core::{
    AdapterType, ChannelId, GuildId, HealthStatus, PersonaError, PluginAdapter,
    SpeechSynthesizer, VoiceEvents, VoiceGateway,
};

/// A synthesizer that returns the UTF-8 bytes of the text it was given.
pub struct MockSynthesizer {
    requests: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Every `(text, language)` pair synthesized, in order.
    pub async fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().await.clone()
    }

    pub async fn spoken_texts(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSynthesizer {
    fn name(&self) -> &str {
        "mock-synthesizer"
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
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> Result<Vec<u8>, PersonaError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersonaError::Provider {
                message: "mock synthesis failure".into(),
                source: None,
            });
        }
        self.requests
            .lock()
            .await
            .push((text.to_string(), language.to_string()));
        Ok(text.as_bytes().to_vec())
    }
}

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCall {
    Join(GuildId, ChannelId),
    Leave(GuildId),
    Play(GuildId, Vec<u8>),
    Stop(GuildId),
}

/// A voice transport that records calls and exposes registered event sinks.
pub struct MockVoiceGateway {
    calls: Mutex<Vec<VoiceCall>>,
    events: Mutex<HashMap<GuildId, Arc<dyn VoiceEvents>>>,
    fail_join: AtomicBool,
    join_delay: Mutex<Option<Duration>>,
    play_delay: Mutex<Option<Duration>>,
}

impl MockVoiceGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(HashMap::new()),
            fail_join: AtomicBool::new(false),
            join_delay: Mutex::new(None),
            play_delay: Mutex::new(None),
        }
    }

    pub fn fail_join(&self, fail: bool) {
        self.fail_join.store(fail, Ordering::SeqCst);
    }

    /// Makes `join` wait before resolving.
    pub async fn delay_join(&self, delay: Duration) {
        *self.join_delay.lock().await = Some(delay);
    }

    /// Makes `play` wait before resolving.
    pub async fn delay_play(&self, delay: Duration) {
        *self.play_delay.lock().await = Some(delay);
    }

    pub async fn calls(&self) -> Vec<VoiceCall> {
        self.calls.lock().await.clone()
    }

    /// Audio payloads played, in order.
    pub async fn played(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                VoiceCall::Play(_, audio) => Some(audio.clone()),
                _ => None,
            })
            .collect()
    }

    /// The event sink registered by the last successful join in `guild`.
    pub async fn events(&self, guild: &GuildId) -> Option<Arc<dyn VoiceEvents>> {
        self.events.lock().await.get(guild).cloned()
    }

    async fn record(&self, call: VoiceCall) {
        self.calls.lock().await.push(call);
    }
}

impl Default for MockVoiceGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceGateway for MockVoiceGateway {
    async fn join(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        events: Arc<dyn VoiceEvents>,
    ) -> Result<(), PersonaError> {
        self.record(VoiceCall::Join(guild.clone(), channel.clone()))
            .await;
        let delay = *self.join_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(PersonaError::Voice {
                message: "mock join rejected".into(),
            });
        }
        self.events.lock().await.insert(guild.clone(), events);
        Ok(())
    }

    async fn leave(&self, guild: &GuildId) -> Result<(), PersonaError> {
        self.record(VoiceCall::Leave(guild.clone())).await;
        self.events.lock().await.remove(guild);
        Ok(())
    }

    async fn play(&self, guild: &GuildId, audio: Vec<u8>) -> Result<(), PersonaError> {
        self.record(VoiceCall::Play(guild.clone(), audio)).await;
        let delay = *self.play_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn stop(&self, guild: &GuildId) -> Result<(), PersonaError> {
        self.record(VoiceCall::Stop(guild.clone())).await;
        Ok(())
    }
}
