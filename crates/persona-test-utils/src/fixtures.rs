// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for common test inputs.

use persona_core::{
    Author, ChannelId, GuildId, HistoryMessage, InboundMessage, Mentions, MessageId,
};

/// Guild every fixture message belongs to.
pub const GUILD: &str = "guild-1";
/// Channel every fixture message is posted in.
pub const CHANNEL: &str = "chan-1";

/// A plain guild text message from `author_id`.
pub fn message(id: &str, author_id: &str, author_name: &str, content: &str) -> InboundMessage {
    InboundMessage {
        id: MessageId::from(id),
        channel_id: ChannelId::from(CHANNEL),
        channel_name: "general".to_string(),
        guild_id: Some(GuildId::from(GUILD)),
        author: Author::new(author_id, author_name),
        content: content.to_string(),
        attachments: Vec::new(),
        mentions: Mentions::default(),
    }
}

/// A history entry mirroring an inbound message.
pub fn history_of(msg: &InboundMessage) -> HistoryMessage {
    HistoryMessage {
        id: msg.id.clone(),
        author: msg.author.clone(),
        content: msg.content.clone(),
        mentions: msg.mentions.clone(),
    }
}

/// A history entry.
pub fn history(id: &str, author_id: &str, author_name: &str, content: &str) -> HistoryMessage {
    HistoryMessage {
        id: MessageId::from(id),
        author: Author::new(author_id, author_name),
        content: content.to_string(),
        mentions: Mentions::default(),
    }
}
