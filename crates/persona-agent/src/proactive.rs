// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timer-driven unsolicited behavior: a channel message or a presence change.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use persona_core::{ChannelId, ChatPlatform, ModelProvider, PersonaProfile, Presence};

use crate::prompts;
use crate::protocol;

/// Which unsolicited action to attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProactiveBranch {
    Message,
    Presence,
}

impl ProactiveBranch {
    /// A fair coin.
    pub fn pick() -> Self {
        if rand::random::<bool>() {
            Self::Message
        } else {
            Self::Presence
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProactiveOutcome {
    Sent(String),
    PresenceChanged(Presence),
    /// The model declined or the reply was unusable.
    Nothing,
}

/// Single-instance proactive timer. Starting it again replaces the running timer.
pub struct ProactiveScheduler {
    platform: Arc<dyn ChatPlatform>,
    provider: Arc<dyn ModelProvider>,
    profile: PersonaProfile,
    channel: ChannelId,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ProactiveScheduler {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        provider: Arc<dyn ModelProvider>,
        profile: PersonaProfile,
        channel: ChannelId,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            platform,
            provider,
            profile,
            channel,
            interval,
            timer: Mutex::new(None),
        })
    }

    /// Arms the timer. The first action runs immediately, then once per interval.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.abort();
            info!("replacing running proactive timer");
        }
        info!(channel_id = %self.channel, interval_secs = self.interval.as_secs(), "proactive mode enabled");

        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        this.tick().await;
                    }
                }
            }
            info!("proactive timer stopped");
        }));
    }

    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Performs one proactive action on a coin flip.
    pub async fn tick(&self) -> ProactiveOutcome {
        self.run_branch(ProactiveBranch::pick()).await
    }

    pub async fn run_branch(&self, branch: ProactiveBranch) -> ProactiveOutcome {
        let me = self.platform.current_user();
        match branch {
            ProactiveBranch::Message => {
                let prompt = prompts::proactive_message_prompt(&self.profile, &me.name);
                let Some(raw) = self.provider.invoke(&prompt, &[]).await else {
                    return ProactiveOutcome::Nothing;
                };
                let text = match protocol::parse_proactive_message(&raw) {
                    Ok(Some(text)) => text,
                    Ok(None) => return ProactiveOutcome::Nothing,
                    Err(e) => {
                        error!(error = %e, raw = %raw, "unusable proactive message reply");
                        return ProactiveOutcome::Nothing;
                    }
                };
                match self.platform.send_message(&self.channel, &text, None).await {
                    Ok(_) => {
                        info!(channel_id = %self.channel, "sent proactive message");
                        ProactiveOutcome::Sent(text)
                    }
                    Err(e) => {
                        warn!(channel_id = %self.channel, error = %e, "failed to send proactive message");
                        ProactiveOutcome::Nothing
                    }
                }
            }
            ProactiveBranch::Presence => {
                let prompt = prompts::presence_prompt(&self.profile, &me.name);
                let Some(raw) = self.provider.invoke(&prompt, &[]).await else {
                    return ProactiveOutcome::Nothing;
                };
                let presence = match protocol::parse_presence(&raw) {
                    Ok(Some(presence)) => presence,
                    Ok(None) => return ProactiveOutcome::Nothing,
                    Err(e) => {
                        error!(error = %e, raw = %raw, "unusable presence reply");
                        return ProactiveOutcome::Nothing;
                    }
                };
                match self.platform.set_presence(&presence).await {
                    Ok(()) => {
                        info!(status = %presence.status, kind = %presence.kind, name = %presence.name, "changed presence");
                        ProactiveOutcome::PresenceChanged(presence)
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to change presence");
                        ProactiveOutcome::Nothing
                    }
                }
            }
        }
    }
}
