// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Persona agent.
//!
//! This crate provides the trait seams between the turn pipeline and the
//! outside world (chat platform, language model, speech synthesis, voice
//! transport), the shared error type, and the plain data types that flow
//! across those seams. Adapter crates implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::PersonaError;
pub use types::{
    ActivityKind, AdapterType, Attachment, Author, ChannelId, GuildId, HealthStatus,
    HistoryMessage, InboundMessage, InlineMedia, Mentions, MessageId, NamedRef, OnlineStatus,
    PersonaProfile, Presence, ReactionEvent, UserId,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ChatPlatform, ModelProvider, PluginAdapter, SpeakerFrame, SpeechSynthesizer, VoiceEvents,
    VoiceGateway,
};
