// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat platform trait: everything the pipeline needs from the chat service.

use async_trait::async_trait;

use crate::error::PersonaError;
use crate::types::{
    Author, ChannelId, GuildId, HistoryMessage, MessageId, Presence, UserId,
};

/// Operations the turn pipeline performs against the chat platform.
///
/// Implementations translate these into platform API calls. The pipeline
/// never talks to the platform SDK directly.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Returns the agent's own identity on the platform.
    fn current_user(&self) -> Author;

    /// Shows a typing indicator in the channel.
    async fn send_typing(&self, channel: &ChannelId) -> Result<(), PersonaError>;

    /// Sends a text message, optionally as a reply to `reply_to`.
    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, PersonaError>;

    /// Adds an emoji reaction to a message.
    ///
    /// `emoji` is either a unicode emoji or a custom `<:name:id>` form.
    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PersonaError>;

    /// Fetches up to `limit` recent messages in the channel, newest first.
    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: u8,
    ) -> Result<Vec<HistoryMessage>, PersonaError>;

    /// Updates the agent's presence.
    async fn set_presence(&self, presence: &Presence) -> Result<(), PersonaError>;

    /// Returns the voice channel `user` is currently in within `guild`, if any.
    async fn voice_channel_of(
        &self,
        guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<ChannelId>, PersonaError>;

    /// Resolves a user id to a display name.
    async fn user_name(&self, user: &UserId) -> Result<String, PersonaError>;
}
