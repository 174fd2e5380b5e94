// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice transport traits.
//!
//! The [`VoiceGateway`] is the outbound half (join, leave, play). Inbound
//! decoded audio arrives through a [`VoiceEvents`] sink registered at join
//! time.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::types::{Author, ChannelId, GuildId};

/// One speaker's decoded audio for a single receive tick.
#[derive(Debug, Clone)]
pub struct SpeakerFrame {
    pub speaker: Author,
    /// Interleaved 48 kHz stereo signed 16-bit samples.
    pub pcm: Vec<i16>,
}

/// Callbacks the voice transport invokes for a joined guild.
#[async_trait]
pub trait VoiceEvents: Send + Sync + 'static {
    /// Called once per receive tick (20 ms) with every speaker that produced audio.
    ///
    /// An empty `frames` vector means nobody spoke during the tick.
    async fn on_voice_tick(&self, guild: &GuildId, frames: Vec<SpeakerFrame>);

    /// Called when the transport lost the connection for `guild`.
    async fn on_disconnect(&self, guild: &GuildId);
}

/// Outbound voice transport.
#[async_trait]
pub trait VoiceGateway: Send + Sync + 'static {
    /// Connects to `channel` in `guild` and starts delivering audio to `events`.
    ///
    /// Resolves once the connection is ready.
    async fn join(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        events: Arc<dyn VoiceEvents>,
    ) -> Result<(), PersonaError>;

    /// Disconnects from `guild`. Leaving a guild that is not joined is a no-op.
    async fn leave(&self, guild: &GuildId) -> Result<(), PersonaError>;

    /// Plays encoded audio in `guild` and resolves when playback ends.
    async fn play(&self, guild: &GuildId, audio: Vec<u8>) -> Result<(), PersonaError>;

    /// Stops any ongoing playback in `guild`.
    async fn stop(&self, guild: &GuildId) -> Result<(), PersonaError>;
}
