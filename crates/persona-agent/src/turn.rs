// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The turn pipeline: one inbound event in, platform side effects out.

use std::sync::Arc;

use tracing::{debug, error, info};

use persona_config::model::PersonaConfig;
use persona_core::{
    ChatPlatform, InboundMessage, ModelProvider, PersonaError, PersonaProfile, ReactionEvent,
    UserId,
};
use persona_relationship::RelationshipStore;
use persona_voice::VoiceManager;

use crate::admin::AdminCommands;
use crate::context::{ContextAssembler, WebFetcher};
use crate::dispatch::{ActionDispatcher, DispatchSummary, VoiceView};
use crate::pacing::Pacer;
use crate::prompts::{self, VoiceOption};
use crate::protocol::{self, ActionDecision, ReactionDecision};

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Bot author, or a reaction that does not concern the agent.
    Ignored,
    /// Routed to admin commands.
    Admin,
    /// The rejection gate said no.
    Rejected,
    /// The model produced nothing usable.
    NoReply,
    /// The reply broke the JSON contract; nothing was changed.
    ContractViolation,
    Dispatched(DispatchSummary),
}

/// Settings the pipeline reads on every turn.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub profile: PersonaProfile,
    pub rejection_gate: bool,
    pub reply_probability: f64,
    pub history_limit: u8,
    pub owner: Option<UserId>,
}

impl TurnSettings {
    pub fn from_config(config: &PersonaConfig) -> Self {
        Self {
            profile: config.agent.profile(),
            rejection_gate: config.agent.rejection_gate,
            reply_probability: config.agent.reply_probability,
            history_limit: config.agent.history_limit,
            owner: config.discord.owner_id.as_deref().map(UserId::from),
        }
    }
}

pub struct TurnPipeline {
    platform: Arc<dyn ChatPlatform>,
    provider: Arc<dyn ModelProvider>,
    store: Arc<RelationshipStore>,
    assembler: ContextAssembler,
    dispatcher: ActionDispatcher,
    admin: AdminCommands,
    settings: TurnSettings,
}

impl TurnPipeline {
    /// Wires a pipeline. `voice` is `None` when voice is disabled.
    pub fn new(
        settings: TurnSettings,
        platform: Arc<dyn ChatPlatform>,
        provider: Arc<dyn ModelProvider>,
        store: Arc<RelationshipStore>,
        voice: Option<Arc<VoiceManager>>,
        fetcher: WebFetcher,
        pacer: Pacer,
    ) -> Self {
        let assembler = ContextAssembler::new(platform.clone(), fetcher, settings.history_limit);
        let dispatcher =
            ActionDispatcher::new(platform.clone(), voice, pacer, settings.reply_probability);
        let admin = AdminCommands::new(platform.clone(), store.clone(), settings.owner.clone());
        Self {
            platform,
            provider,
            store,
            assembler,
            dispatcher,
            admin,
            settings,
        }
    }

    /// Runs one message turn. Never fails; every error is logged here.
    pub async fn handle_message(&self, msg: InboundMessage) -> TurnOutcome {
        if msg.author.bot {
            return TurnOutcome::Ignored;
        }
        if msg.content.starts_with('!') {
            self.admin.handle(&msg).await;
            return TurnOutcome::Admin;
        }

        let me = self.platform.current_user();
        let relationship = self.store.snapshot(&msg.author.id).await;
        let ctx = self.assembler.assemble(&msg, &relationship).await;
        let view = self.voice_view(&msg).await;

        if self.settings.rejection_gate {
            let prompt = prompts::gate_prompt(&me.name, &msg.author.name, &ctx);
            let reply = self.provider.invoke(&prompt, &ctx.media).await;
            if !protocol::parse_gate(reply.as_deref()) {
                info!(user_id = %msg.author.id, channel = %msg.channel_name, "decided to ignore message");
                return TurnOutcome::Rejected;
            }
        }

        if let Err(e) = self.platform.send_typing(&msg.channel_id).await {
            debug!(channel_id = %msg.channel_id, error = %e, "typing indicator failed");
        }

        let base = prompts::base_prompt(
            &self.settings.profile,
            &me.name,
            &msg.channel_name,
            &msg.author.name,
            &ctx,
        );
        let option = self.voice_option(&view);
        let prompt = prompts::action_prompt(&base, &self.settings.profile.language, option);

        let Some(raw) = self.provider.invoke(&prompt, &ctx.media).await else {
            return TurnOutcome::NoReply;
        };
        let decision = match ActionDecision::parse(&raw) {
            Ok(decision) => decision,
            Err(e) => {
                log_contract_violation(&e);
                return TurnOutcome::ContractViolation;
            }
        };

        if let Some(delta) = decision.favorability_change {
            let score = self.store.update(&msg.author.id, delta).await;
            debug!(user_id = %msg.author.id, delta, score, "favorability updated");
        }
        if let Some(memory) = &decision.new_memory {
            self.store.add_memory(&msg.author.id, memory).await;
        }

        let summary = self.dispatcher.execute(&msg, &decision, &view).await;
        info!(
            user_id = %msg.author.id,
            channel = %msg.channel_name,
            sent = summary.messages_sent,
            reacted = summary.reacted,
            spoke = summary.spoke,
            voice = ?summary.voice,
            "turn complete"
        );
        TurnOutcome::Dispatched(summary)
    }

    /// Runs one reaction turn for a reaction on one of the agent's messages.
    pub async fn handle_reaction(&self, event: ReactionEvent) -> TurnOutcome {
        let me = self.platform.current_user();
        if event.user.bot || event.message.author.id != me.id {
            return TurnOutcome::Ignored;
        }
        info!(user_id = %event.user.id, emoji = %event.emoji, "reaction on my message");

        let favorability = self.store.favorability(&event.user.id).await;
        let prompt = prompts::reaction_prompt(
            &self.settings.profile,
            &me.name,
            &event.user.name,
            favorability,
            &event.message.content,
            &event.emoji,
        );
        let Some(raw) = self.provider.invoke(&prompt, &[]).await else {
            return TurnOutcome::NoReply;
        };
        let decision = match ReactionDecision::parse(&raw) {
            Ok(decision) => decision,
            Err(e) => {
                log_contract_violation(&e);
                return TurnOutcome::ContractViolation;
            }
        };

        if let Some(delta) = decision.favorability_change {
            self.store.update(&event.user.id, delta).await;
        }

        let mut summary = DispatchSummary::default();
        match decision.reply() {
            Some(reply) => {
                let text = format!("<@{}> {}", event.user.id, reply);
                match self.platform.send_message(&event.channel_id, &text, None).await {
                    Ok(_) => summary.messages_sent = 1,
                    Err(e) => error!(channel_id = %event.channel_id, error = %e, "failed to answer reaction"),
                }
            }
            None => debug!(user_id = %event.user.id, "decided not to answer reaction"),
        }
        TurnOutcome::Dispatched(summary)
    }

    async fn voice_view(&self, msg: &InboundMessage) -> VoiceView {
        let (Some(voice), Some(guild)) = (self.dispatcher.voice(), &msg.guild_id) else {
            return VoiceView {
                guild: msg.guild_id.clone(),
                ..VoiceView::default()
            };
        };
        let author_channel = match self.platform.voice_channel_of(guild, &msg.author.id).await {
            Ok(channel) => channel,
            Err(e) => {
                debug!(guild_id = %guild, error = %e, "voice state lookup failed");
                None
            }
        };
        VoiceView {
            guild: Some(guild.clone()),
            agent_channel: voice.channel_of(guild),
            author_channel,
        }
    }

    fn voice_option(&self, view: &VoiceView) -> VoiceOption {
        if self.dispatcher.voice().is_none() {
            VoiceOption::None
        } else if view.agent_channel.is_some() {
            VoiceOption::Leave
        } else if view.author_channel.is_some() {
            VoiceOption::Join
        } else {
            VoiceOption::None
        }
    }
}

fn log_contract_violation(e: &PersonaError) {
    match e {
        PersonaError::ContractViolation { message, raw } => {
            error!(reason = %message, raw = %raw, "model reply broke the JSON contract");
        }
        other => error!(error = %other, "failed to parse model reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[traced_test]
    #[test]
    fn contract_violations_log_the_raw_reply() {
        log_contract_violation(&PersonaError::contract("missing favorabilityChange", "{\"mood\": 1}"));
        assert!(logs_contain("model reply broke the JSON contract"));
        assert!(logs_contain("missing favorabilityChange"));
        assert!(logs_contain("mood"));
    }

    #[traced_test]
    #[test]
    fn other_parse_errors_are_logged_plainly() {
        log_contract_violation(&PersonaError::Internal("boom".into()));
        assert!(logs_contain("failed to parse model reply"));
        assert!(!logs_contain("broke the JSON contract"));
    }
}
