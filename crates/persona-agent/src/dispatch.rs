// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Executes a parsed [`ActionDecision`] against the platform and voice subsystem.
//!
//! Each effect is independent: a rejected reaction does not stop the text
//! send, and a failed send does not stop a voice action.

use std::sync::Arc;

use tracing::{debug, info, warn};

use persona_core::{ChannelId, ChatPlatform, GuildId, InboundMessage, MessageId};
use persona_voice::VoiceManager;

use crate::pacing::{Pacer, strip_directives};
use crate::protocol::{ActionDecision, VoiceAction};

/// Voice state observed when the turn started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceView {
    pub guild: Option<GuildId>,
    /// Where the agent is connected.
    pub agent_channel: Option<ChannelId>,
    /// Where the message author is.
    pub author_channel: Option<ChannelId>,
}

impl VoiceView {
    /// The agent shares a voice channel with the author.
    pub fn together(&self) -> bool {
        self.agent_channel.is_some() && self.agent_channel == self.author_channel
    }
}

/// What a dispatch actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub messages_sent: usize,
    pub reacted: bool,
    pub spoke: bool,
    pub voice: Option<VoiceAction>,
}

pub struct ActionDispatcher {
    platform: Arc<dyn ChatPlatform>,
    voice: Option<Arc<VoiceManager>>,
    pacer: Pacer,
    reply_probability: f64,
}

impl ActionDispatcher {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        voice: Option<Arc<VoiceManager>>,
        pacer: Pacer,
        reply_probability: f64,
    ) -> Self {
        Self {
            platform,
            voice,
            pacer,
            reply_probability,
        }
    }

    pub fn voice(&self) -> Option<&Arc<VoiceManager>> {
        self.voice.as_ref()
    }

    pub async fn execute(
        &self,
        msg: &InboundMessage,
        decision: &ActionDecision,
        view: &VoiceView,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        if decision.is_silent() {
            debug!(channel_id = %msg.channel_id, message_id = %msg.id, "decision has nothing to dispatch");
            return summary;
        }

        if let Some(emoji) = &decision.reaction {
            match self.platform.add_reaction(&msg.channel_id, &msg.id, emoji).await {
                Ok(()) => {
                    info!(channel_id = %msg.channel_id, emoji = %emoji, "reacted");
                    summary.reacted = true;
                }
                Err(e) => warn!(channel_id = %msg.channel_id, error = %e, "failed to react"),
            }
        }

        if self.voice_action(msg, decision, view, &mut summary).await {
            return summary;
        }

        let Some(response) = &decision.response else {
            debug!(channel_id = %msg.channel_id, "no text response");
            return summary;
        };

        if let (Some(voice), Some(guild), true) = (&self.voice, &view.guild, view.together()) {
            match voice.speak(guild, &strip_directives(response)).await {
                Ok(()) => summary.spoke = true,
                Err(e) => warn!(guild_id = %guild, error = %e, "failed to speak response"),
            }
            return summary;
        }

        let reply_to = self.thread_first().then_some(&msg.id);
        summary.messages_sent += self.send(&msg.channel_id, response, reply_to).await;
        summary
    }

    /// Runs the requested voice action when it is performable.
    ///
    /// Returns false when there is nothing to do, so the text response falls
    /// through to normal delivery.
    async fn voice_action(
        &self,
        msg: &InboundMessage,
        decision: &ActionDecision,
        view: &VoiceView,
        summary: &mut DispatchSummary,
    ) -> bool {
        let (Some(voice), Some(action), Some(guild)) = (&self.voice, decision.voice, &view.guild)
        else {
            return false;
        };

        match action {
            VoiceAction::Leave => {
                if view.agent_channel.is_none() {
                    debug!(guild_id = %guild, "asked to leave voice while not connected");
                    return false;
                }
                if let Some(response) = &decision.response {
                    summary.messages_sent += self.send(&msg.channel_id, response, Some(&msg.id)).await;
                }
                match voice.leave(guild).await {
                    Ok(()) => summary.voice = Some(VoiceAction::Leave),
                    Err(e) => warn!(guild_id = %guild, error = %e, "failed to leave voice"),
                }
                true
            }
            VoiceAction::Join => {
                let Some(target) = &view.author_channel else {
                    debug!(guild_id = %guild, "asked to join voice but author is not in one");
                    return false;
                };
                if let Some(response) = &decision.response {
                    summary.messages_sent += self.send(&msg.channel_id, response, Some(&msg.id)).await;
                }
                match voice.join(guild, target, decision.voice_response.as_deref()).await {
                    Ok(()) => summary.voice = Some(VoiceAction::Join),
                    Err(e) => {
                        warn!(guild_id = %guild, channel_id = %target, error = %e, "failed to join voice");
                        let line = voice.config().join_failure.clone();
                        summary.messages_sent += self.send(&msg.channel_id, &line, Some(&msg.id)).await;
                    }
                }
                true
            }
        }
    }

    fn thread_first(&self) -> bool {
        rand::random::<f64>() < self.reply_probability
    }

    async fn send(&self, channel: &ChannelId, text: &str, reply_to: Option<&MessageId>) -> usize {
        match self.pacer.send(self.platform.as_ref(), channel, text, reply_to).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(channel_id = %channel, error = %e, "failed to deliver response");
                0
            }
        }
    }
}
