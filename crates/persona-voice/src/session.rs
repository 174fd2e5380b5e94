// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry of live voice sessions, at most one per guild.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

use persona_core::{ChannelId, GuildId, SpeakerFrame};

use crate::capture::{CaptureSet, SpeechCapture};

/// Activity of a live session. A guild without a session is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Listening,
    Speaking,
}

/// One live voice connection.
#[derive(Debug)]
pub struct VoiceSession {
    pub channel_id: ChannelId,
    state: SessionState,
    captures: CaptureSet,
    playback: Arc<Mutex<()>>,
}

/// Guild-keyed session map with idempotent create and destroy.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, VoiceSession>,
    silence: Duration,
}

impl SessionRegistry {
    pub fn new(silence: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            silence,
        }
    }

    /// Registers a session for `guild`. Returns false if one already exists.
    pub fn create(&self, guild: &GuildId, channel: &ChannelId) -> bool {
        match self.sessions.entry(guild.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(VoiceSession {
                    channel_id: channel.clone(),
                    state: SessionState::Connected,
                    captures: CaptureSet::new(self.silence),
                    playback: Arc::new(Mutex::new(())),
                });
                true
            }
        }
    }

    /// Removes the session for `guild`. Removing an absent session is a no-op.
    pub fn destroy(&self, guild: &GuildId) -> bool {
        self.sessions.remove(guild).is_some()
    }

    pub fn contains(&self, guild: &GuildId) -> bool {
        self.sessions.contains_key(guild)
    }

    pub fn channel_of(&self, guild: &GuildId) -> Option<ChannelId> {
        self.sessions.get(guild).map(|s| s.channel_id.clone())
    }

    pub fn state(&self, guild: &GuildId) -> Option<SessionState> {
        self.sessions.get(guild).map(|s| s.state)
    }

    /// The lock a speaker holds for the whole of one synthesize-and-play turn.
    pub fn playback_lock(&self, guild: &GuildId) -> Option<Arc<Mutex<()>>> {
        self.sessions.get(guild).map(|s| Arc::clone(&s.playback))
    }

    /// Marks playback as started or finished.
    pub fn set_speaking(&self, guild: &GuildId, speaking: bool) {
        if let Some(mut session) = self.sessions.get_mut(guild) {
            session.state = if speaking {
                SessionState::Speaking
            } else if session.captures.is_listening() {
                SessionState::Listening
            } else {
                SessionState::Connected
            };
        }
    }

    /// Feeds a receive tick into the guild's captures and returns finished utterances.
    ///
    /// Ticks for guilds without a session are dropped.
    pub fn ingest(&self, guild: &GuildId, frames: Vec<SpeakerFrame>) -> Vec<SpeechCapture> {
        let Some(mut session) = self.sessions.get_mut(guild) else {
            return Vec::new();
        };
        let finished = session.captures.tick(frames);
        if session.state != SessionState::Speaking {
            session.state = if session.captures.is_listening() {
                SessionState::Listening
            } else {
                SessionState::Connected
            };
        }
        finished
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::Author;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Duration::from_millis(20))
    }

    #[test]
    fn one_session_per_guild() {
        let reg = registry();
        let guild = GuildId::from("g");
        assert!(reg.create(&guild, &ChannelId::from("a")));
        assert!(!reg.create(&guild, &ChannelId::from("b")));
        assert_eq!(reg.channel_of(&guild), Some(ChannelId::from("a")));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn destroy_is_idempotent() {
        let reg = registry();
        let guild = GuildId::from("g");
        reg.create(&guild, &ChannelId::from("a"));
        assert!(reg.destroy(&guild));
        assert!(!reg.destroy(&guild));
        assert!(reg.is_empty());
        assert_eq!(reg.state(&guild), None);
    }

    #[test]
    fn state_follows_capture_and_playback() {
        let reg = registry();
        let guild = GuildId::from("g");
        reg.create(&guild, &ChannelId::from("a"));
        assert_eq!(reg.state(&guild), Some(SessionState::Connected));

        let frame = SpeakerFrame {
            speaker: Author::new("1", "alice"),
            pcm: vec![1; 10],
        };
        reg.ingest(&guild, vec![frame]);
        assert_eq!(reg.state(&guild), Some(SessionState::Listening));

        reg.set_speaking(&guild, true);
        assert_eq!(reg.state(&guild), Some(SessionState::Speaking));

        let done = reg.ingest(&guild, Vec::new());
        assert_eq!(done.len(), 1);
        assert_eq!(reg.state(&guild), Some(SessionState::Speaking));

        reg.set_speaking(&guild, false);
        assert_eq!(reg.state(&guild), Some(SessionState::Connected));
    }

    #[test]
    fn playback_lock_is_shared_within_a_session() {
        let reg = registry();
        let guild = GuildId::from("g");
        assert!(reg.playback_lock(&guild).is_none());

        reg.create(&guild, &ChannelId::from("a"));
        let first = reg.playback_lock(&guild).unwrap();
        let second = reg.playback_lock(&guild).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let _held = first.try_lock().unwrap();
        assert!(second.try_lock().is_err());
    }

    #[test]
    fn ticks_without_session_are_dropped() {
        let reg = registry();
        let frame = SpeakerFrame {
            speaker: Author::new("1", "alice"),
            pcm: vec![1; 10],
        };
        assert!(reg.ingest(&GuildId::from("none"), vec![frame]).is_empty());
    }
}
