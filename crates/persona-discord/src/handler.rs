// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway event handler feeding the turn pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::{Message, Reaction};
use serenity::model::gateway::Ready;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use persona_agent::{ProactiveScheduler, TurnPipeline};

use crate::platform::DiscordPlatform;

/// Serenity dispatches each event on its own task, so turns run concurrently.
pub struct DiscordHandler {
    platform: Arc<DiscordPlatform>,
    pipeline: Arc<TurnPipeline>,
    proactive: Option<Arc<ProactiveScheduler>>,
    cancel: CancellationToken,
}

impl DiscordHandler {
    pub fn new(
        platform: Arc<DiscordPlatform>,
        pipeline: Arc<TurnPipeline>,
        proactive: Option<Arc<ProactiveScheduler>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            platform,
            pipeline,
            proactive,
            cancel,
        }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.platform.attach(&ctx, &ready);
        info!(guilds = ready.guilds.len(), "Discord gateway ready");
        // Ready fires again after a resume failure; start() replaces the old timer.
        if let Some(scheduler) = &self.proactive {
            scheduler.start(self.cancel.clone());
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = self.platform.to_inbound(&msg);
        self.pipeline.handle_message(inbound).await;
    }

    async fn reaction_add(&self, _ctx: Context, reaction: Reaction) {
        match self.platform.reaction_event(&reaction).await {
            Ok(Some(event)) => {
                self.pipeline.handle_reaction(event).await;
            }
            Ok(None) => {}
            Err(e) => warn!(channel_id = %reaction.channel_id, error = %e, "could not resolve reaction"),
        }
    }
}
