// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the platform adapter, the model client, and the pipeline.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(
    /// Platform-assigned user identifier.
    UserId
);
opaque_id!(
    /// Platform-assigned text or voice channel identifier.
    ChannelId
);
opaque_id!(
    /// Platform-assigned guild (server) identifier.
    GuildId
);
opaque_id!(
    /// Platform-assigned message identifier.
    MessageId
);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Platform,
    Provider,
    Synthesizer,
    Voice,
}

/// The author of a message or reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    pub bot: bool,
}

impl Author {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }
}

/// An identifier paired with the human-readable name it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

impl NamedRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// User, role, and channel references found in a message, already resolved by the adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mentions {
    pub users: Vec<NamedRef>,
    pub roles: Vec<NamedRef>,
    pub channels: Vec<NamedRef>,
}

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub url: String,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// A message received from the chat platform that may start a turn.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub channel_name: String,
    pub guild_id: Option<GuildId>,
    pub author: Author,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub mentions: Mentions,
}

/// A message fetched from channel history.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub author: Author,
    pub content: String,
    pub mentions: Mentions,
}

/// A user reacting to a message.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    pub user: Author,
    pub emoji: String,
    pub channel_id: ChannelId,
    pub message: HistoryMessage,
}

/// Inline media attached to a model request (base64 payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: String,
}

impl InlineMedia {
    /// Encodes raw bytes as standard base64 for inline submission.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }
}

/// Online status shown next to the agent's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum OnlineStatus {
    #[strum(serialize = "online")]
    Online,
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "dnd")]
    DoNotDisturb,
}

/// The kind of activity displayed in the agent's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ActivityKind {
    Playing,
    Listening,
    Watching,
    Competing,
    Custom,
}

/// A presence update decided by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub status: OnlineStatus,
    pub kind: ActivityKind,
    pub name: String,
    pub emoji: Option<String>,
}

/// The persona the agent plays in every prompt.
#[derive(Debug, Clone)]
pub struct PersonaProfile {
    /// Fallback display name when the platform identity is unknown.
    pub name: String,
    /// Core rule prepended to every persona prompt.
    pub system_rule: String,
    /// Language every reply must be written in.
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn image_attachment_detection() {
        let image = Attachment {
            url: "https://cdn.example/a.png".into(),
            content_type: Some("image/png".into()),
        };
        let text = Attachment {
            url: "https://cdn.example/a.txt".into(),
            content_type: Some("text/plain".into()),
        };
        let unknown = Attachment {
            url: "https://cdn.example/a".into(),
            content_type: None,
        };
        assert!(image.is_image());
        assert!(!text.is_image());
        assert!(!unknown.is_image());
    }

    #[test]
    fn inline_media_is_base64() {
        let media = InlineMedia::from_bytes("audio/wav", b"RIFF");
        assert_eq!(media.data, "UklGRg==");
        assert!(media.is_audio());
    }

    #[test]
    fn online_status_parses_model_vocabulary() {
        assert_eq!(OnlineStatus::from_str("online").unwrap(), OnlineStatus::Online);
        assert_eq!(OnlineStatus::from_str("IDLE").unwrap(), OnlineStatus::Idle);
        assert_eq!(
            OnlineStatus::from_str("dnd").unwrap(),
            OnlineStatus::DoNotDisturb
        );
        assert!(OnlineStatus::from_str("invisible").is_err());
    }

    #[test]
    fn activity_kind_is_case_insensitive() {
        assert_eq!(ActivityKind::from_str("playing").unwrap(), ActivityKind::Playing);
        assert_eq!(ActivityKind::from_str("WATCHING").unwrap(), ActivityKind::Watching);
        assert!(ActivityKind::from_str("Streaming").is_err());
    }

    #[test]
    fn ids_display_as_raw_strings() {
        let id = UserId::from("12345");
        assert_eq!(id.to_string(), "12345");
        assert_eq!(id.as_str(), "12345");
    }
}
