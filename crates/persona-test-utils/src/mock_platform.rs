// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat platform for deterministic testing.
//!
//! `MockPlatform` implements `ChatPlatform`, serves canned history and voice
//! state, and records every outbound call for assertion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use persona_core::{
    Author, ChannelId, ChatPlatform, GuildId, HistoryMessage, MessageId, PersonaError, Presence,
    UserId,
};

/// One outbound call made against the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Typing(ChannelId),
    Send {
        channel: ChannelId,
        text: String,
        reply_to: Option<MessageId>,
    },
    React {
        channel: ChannelId,
        message: MessageId,
        emoji: String,
    },
    Presence(Presence),
}

/// A chat platform that records calls instead of making them.
pub struct MockPlatform {
    me: Author,
    calls: Mutex<Vec<(Instant, PlatformCall)>>,
    history: Mutex<HashMap<ChannelId, Vec<HistoryMessage>>>,
    voice: Mutex<HashMap<(GuildId, UserId), ChannelId>>,
    names: Mutex<HashMap<UserId, String>>,
    next_id: AtomicU64,
    fail_reactions: AtomicBool,
    fail_sends: AtomicBool,
    fail_history: AtomicBool,
}

impl MockPlatform {
    /// A platform where the agent is `bot-1` named "Mika".
    pub fn new() -> Self {
        let mut me = Author::new("bot-1", "Mika");
        me.bot = true;
        Self {
            me,
            calls: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            voice: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1000),
            fail_reactions: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            fail_history: AtomicBool::new(false),
        }
    }

    /// Sets the history served for `channel`, newest first.
    pub async fn set_history(&self, channel: &ChannelId, newest_first: Vec<HistoryMessage>) {
        self.history
            .lock()
            .await
            .insert(channel.clone(), newest_first);
    }

    /// Places `user` in a voice channel of `guild`.
    pub async fn put_in_voice(&self, guild: &GuildId, user: &UserId, channel: &ChannelId) {
        self.voice
            .lock()
            .await
            .insert((guild.clone(), user.clone()), channel.clone());
    }

    pub async fn set_user_name(&self, user: &UserId, name: &str) {
        self.names
            .lock()
            .await
            .insert(user.clone(), name.to_string());
    }

    pub fn fail_reactions(&self, fail: bool) {
        self.fail_reactions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    /// Every recorded call, in order.
    pub async fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().await.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Every recorded call with the tokio instant it was made at.
    pub async fn timed_calls(&self) -> Vec<(Instant, PlatformCall)> {
        self.calls.lock().await.clone()
    }

    /// Texts of every message sent, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, c)| c)
            .filter_map(|c| match c {
                PlatformCall::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every message send with its reply target.
    pub async fn sends(&self) -> Vec<(String, Option<MessageId>)> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, c)| c)
            .filter_map(|c| match c {
                PlatformCall::Send { text, reply_to, .. } => Some((text.clone(), reply_to.clone())),
                _ => None,
            })
            .collect()
    }

    pub async fn reactions(&self) -> Vec<String> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, c)| c)
            .filter_map(|c| match c {
                PlatformCall::React { emoji, .. } => Some(emoji.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn typing_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, c)| c)
            .filter(|c| matches!(c, PlatformCall::Typing(_)))
            .count()
    }

    pub async fn presences(&self) -> Vec<Presence> {
        self.calls
            .lock()
            .await
            .iter()
            .map(|(_, c)| c)
            .filter_map(|c| match c {
                PlatformCall::Presence(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    async fn record(&self, call: PlatformCall) {
        self.calls.lock().await.push((Instant::now(), call));
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn rejected(what: &str) -> PersonaError {
    PersonaError::Platform {
        message: format!("mock {what} rejected"),
        source: None,
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    fn current_user(&self) -> Author {
        self.me.clone()
    }

    async fn send_typing(&self, channel: &ChannelId) -> Result<(), PersonaError> {
        self.record(PlatformCall::Typing(channel.clone())).await;
        Ok(())
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, PersonaError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(rejected("send"));
        }
        self.record(PlatformCall::Send {
            channel: channel.clone(),
            text: text.to_string(),
            reply_to: reply_to.cloned(),
        })
        .await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MessageId(id.to_string()))
    }

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PersonaError> {
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Err(rejected("reaction"));
        }
        self.record(PlatformCall::React {
            channel: channel.clone(),
            message: message.clone(),
            emoji: emoji.to_string(),
        })
        .await;
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: u8,
    ) -> Result<Vec<HistoryMessage>, PersonaError> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(rejected("history fetch"));
        }
        Ok(self
            .history
            .lock()
            .await
            .get(channel)
            .map(|h| h.iter().take(usize::from(limit)).cloned().collect())
            .unwrap_or_default())
    }

    async fn set_presence(&self, presence: &Presence) -> Result<(), PersonaError> {
        self.record(PlatformCall::Presence(presence.clone())).await;
        Ok(())
    }

    async fn voice_channel_of(
        &self,
        guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<ChannelId>, PersonaError> {
        Ok(self
            .voice
            .lock()
            .await
            .get(&(guild.clone(), user.clone()))
            .cloned())
    }

    async fn user_name(&self, user: &UserId) -> Result<String, PersonaError> {
        self.names
            .lock()
            .await
            .get(user)
            .cloned()
            .ok_or_else(|| rejected("user lookup"))
    }
}
