// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice session lifecycle: join, leave, speak, and the listen loop that
//! turns captured speech into spoken replies.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use persona_config::model::VoiceConfig;
use persona_core::{
    ChannelId, GuildId, InlineMedia, ModelProvider, PersonaError, PersonaProfile, SpeakerFrame,
    SpeechSynthesizer, VoiceEvents, VoiceGateway,
};

use crate::capture::SpeechCapture;
use crate::pcm::{GateVerdict, VoiceGate};
use crate::session::{SessionRegistry, SessionState};
use crate::speech::sanitize_for_speech;
use crate::wav::encode_wav;

/// Instruction sent with captured audio to get a bare transcript back.
pub const TRANSCRIBE_PROMPT: &str = "Transcribe the following audio. Respond with ONLY the transcribed text, without any additional explanatory words, labels, or formatting. For example, if the user says 'hello', your entire response should be just 'hello'.";

/// What happened to one captured utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutcome {
    /// Rejected by the gate before any backend call.
    Discarded(GateVerdict),
    NoTranscript,
    NoReply,
    Spoken { transcript: String, reply: String },
    Failed,
}

/// Owns every voice session and drives the capture, transcribe, reply, speak loop.
pub struct VoiceManager {
    gateway: Arc<dyn VoiceGateway>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    provider: Arc<dyn ModelProvider>,
    profile: PersonaProfile,
    config: VoiceConfig,
    gate: VoiceGate,
    sessions: SessionRegistry,
    this: Weak<VoiceManager>,
}

impl VoiceManager {
    pub fn new(
        gateway: Arc<dyn VoiceGateway>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        provider: Arc<dyn ModelProvider>,
        profile: PersonaProfile,
        config: VoiceConfig,
    ) -> Arc<Self> {
        let gate = VoiceGate {
            min_bytes: config.min_capture_bytes,
            rms_threshold: config.rms_threshold,
        };
        let sessions = SessionRegistry::new(Duration::from_millis(config.silence_ms));
        Arc::new_cyclic(|this| Self {
            gateway,
            synthesizer,
            provider,
            profile,
            config,
            gate,
            sessions,
            this: this.clone(),
        })
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn is_connected(&self, guild: &GuildId) -> bool {
        self.sessions.contains(guild)
    }

    /// The voice channel the agent is connected to in `guild`.
    pub fn channel_of(&self, guild: &GuildId) -> Option<ChannelId> {
        self.sessions.channel_of(guild)
    }

    pub fn state(&self, guild: &GuildId) -> Option<SessionState> {
        self.sessions.state(guild)
    }

    /// Connects to `channel`, then speaks `greeting` (or the configured default).
    ///
    /// The connection must become ready within the connect timeout. A failed
    /// or timed-out first connect leaves no session behind; a failed move
    /// leaves the existing session in place.
    pub async fn join(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        greeting: Option<&str>,
    ) -> Result<(), PersonaError> {
        if self.sessions.channel_of(guild).as_ref() == Some(channel) {
            debug!(guild_id = %guild, channel_id = %channel, "already in this voice channel");
            return Ok(());
        }

        let had_session = self.sessions.contains(guild);
        let events: Arc<dyn VoiceEvents> = Arc::new(SessionEvents {
            manager: self.this.clone(),
        });
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let joined = tokio::time::timeout(timeout, self.gateway.join(guild, channel, events)).await;

        let failure = match joined {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(PersonaError::Timeout { duration: timeout }),
        };
        if let Some(e) = failure {
            // A failed move keeps the session it was moving away from.
            if had_session {
                warn!(guild_id = %guild, channel_id = %channel, error = %e, "voice move failed, staying put");
                return Err(e);
            }
            if let Err(cleanup) = self.gateway.leave(guild).await {
                debug!(guild_id = %guild, error = %cleanup, "cleanup after failed join");
            }
            return Err(e);
        }

        // Moving between channels replaces the old session.
        self.sessions.destroy(guild);
        self.sessions.create(guild, channel);
        info!(guild_id = %guild, channel_id = %channel, "joined voice channel");

        let greeting = greeting
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(self.config.greeting.as_str());
        if let Err(e) = self.speak(guild, greeting).await {
            warn!(guild_id = %guild, error = %e, "failed to speak greeting");
        }
        Ok(())
    }

    /// Speaks the farewell line, then disconnects. A no-op when not connected.
    pub async fn leave(&self, guild: &GuildId) -> Result<(), PersonaError> {
        if !self.sessions.contains(guild) {
            return Ok(());
        }
        if let Err(e) = self.speak(guild, &self.config.farewell).await {
            warn!(guild_id = %guild, error = %e, "failed to speak farewell");
        }
        if let Err(e) = self.gateway.stop(guild).await {
            debug!(guild_id = %guild, error = %e, "stopping playback before leave");
        }
        self.sessions.destroy(guild);
        self.gateway.leave(guild).await?;
        info!(guild_id = %guild, "left voice channel");
        Ok(())
    }

    /// Synthesizes `text` and plays it in `guild`, waiting for playback to end.
    ///
    /// Calls for the same guild take turns, so at most one line plays at a
    /// time. Does nothing when there is no session or nothing speakable in
    /// `text`.
    pub async fn speak(&self, guild: &GuildId, text: &str) -> Result<(), PersonaError> {
        let Some(playback) = self.sessions.playback_lock(guild) else {
            debug!(guild_id = %guild, "not connected, skipping speech");
            return Ok(());
        };
        let text = sanitize_for_speech(text);
        if text.is_empty() {
            return Ok(());
        }

        let _turn = playback.lock().await;
        if !self.sessions.contains(guild) {
            debug!(guild_id = %guild, "left while waiting to speak");
            return Ok(());
        }

        let audio = self
            .synthesizer
            .synthesize(&text, &self.config.tts_language)
            .await?;

        let timeout = Duration::from_secs(self.config.playback_timeout_secs);
        self.sessions.set_speaking(guild, true);
        let played = tokio::time::timeout(timeout, self.gateway.play(guild, audio)).await;
        self.sessions.set_speaking(guild, false);

        match played {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = self.gateway.stop(guild).await {
                    debug!(guild_id = %guild, error = %e, "stopping playback after timeout");
                }
                Err(PersonaError::Timeout { duration: timeout })
            }
        }
    }

    /// Gates, transcribes, answers, and speaks one finished capture.
    pub async fn handle_utterance(
        &self,
        guild: &GuildId,
        capture: SpeechCapture,
    ) -> UtteranceOutcome {
        let speaker = &capture.speaker;
        let verdict = self.gate.check(&capture.pcm);
        if !verdict.is_speech() {
            debug!(user_id = %speaker.id, ?verdict, "capture below threshold, ignoring");
            return UtteranceOutcome::Discarded(verdict);
        }

        let wav = match encode_wav(&capture.pcm) {
            Ok(wav) => wav,
            Err(e) => {
                error!(user_id = %speaker.id, error = %e, "could not frame capture");
                return UtteranceOutcome::Failed;
            }
        };
        debug!(user_id = %speaker.id, bytes = wav.len(), ?verdict, "sending capture for transcription");

        let audio = InlineMedia::from_bytes("audio/wav", &wav);
        let Some(transcript) = self.provider.invoke(TRANSCRIBE_PROMPT, &[audio]).await else {
            debug!(user_id = %speaker.id, "transcription failed or empty");
            return UtteranceOutcome::NoTranscript;
        };
        info!(user_id = %speaker.id, transcript = %transcript, "heard speech");

        let prompt = voice_reply_prompt(&self.profile, &speaker.name, &transcript);
        let Some(reply) = self.provider.invoke(&prompt, &[]).await else {
            debug!(user_id = %speaker.id, "no voice reply generated");
            return UtteranceOutcome::NoReply;
        };

        if let Err(e) = self.speak(guild, &reply).await {
            warn!(guild_id = %guild, error = %e, "failed to speak voice reply");
        }
        UtteranceOutcome::Spoken { transcript, reply }
    }

    fn ingest(&self, guild: &GuildId, frames: Vec<SpeakerFrame>) -> Vec<SpeechCapture> {
        self.sessions.ingest(guild, frames)
    }

    async fn disconnected(&self, guild: &GuildId) {
        if let Err(e) = self.gateway.stop(guild).await {
            debug!(guild_id = %guild, error = %e, "stopping playback after disconnect");
        }
        if self.sessions.destroy(guild) {
            info!(guild_id = %guild, "voice connection lost, session cleared");
        }
    }
}

/// Event sink handed to the transport; holds the manager weakly so a
/// lingering transport callback cannot keep it alive.
struct SessionEvents {
    manager: Weak<VoiceManager>,
}

#[async_trait]
impl VoiceEvents for SessionEvents {
    async fn on_voice_tick(&self, guild: &GuildId, frames: Vec<SpeakerFrame>) {
        let Some(manager) = self.manager.upgrade() else {
            return;
        };
        for capture in manager.ingest(guild, frames) {
            let manager = Arc::clone(&manager);
            let guild = guild.clone();
            tokio::spawn(async move {
                manager.handle_utterance(&guild, capture).await;
            });
        }
    }

    async fn on_disconnect(&self, guild: &GuildId) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnected(guild).await;
        }
    }
}

/// Single-stage conversational prompt for a transcribed utterance.
pub fn voice_reply_prompt(profile: &PersonaProfile, speaker: &str, transcript: &str) -> String {
    format!(
        "{rule}\n\n[Your internal monologue]\nI'm in a voice chat with \"{speaker}\". They just said: \"{transcript}\". I will now respond to them in a natural, conversational way, continuing the persona. My response MUST be in {language}.\n\nMy response:",
        rule = profile.system_rule,
        language = profile.language,
    )
}
