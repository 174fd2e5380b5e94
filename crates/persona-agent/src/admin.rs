// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Owner-only `!` commands for resetting or overriding relationship state.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use persona_core::{ChatPlatform, InboundMessage, UserId};
use persona_relationship::RelationshipStore;

pub const NOT_OWNER: &str = "You do not have permission to use this command.";

static USER_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^<@!?(\d+)>$").unwrap());
static USER_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// A well-formed admin command.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    ResetFavorability,
    ResetAll,
    SetFavor { user: UserId, score: f64 },
}

/// A malformed admin command. The display text is the reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Invalid reset target. Use `!reset favorability` or `!reset all`.")]
    ResetTarget,
    #[error("Usage: `!setfavor <@user|userID> <score>`")]
    SetFavor,
    #[error("The score must be a number.")]
    Score,
    #[error("Invalid user. Please provide a user mention or a user ID.")]
    User,
}

impl AdminCommand {
    /// Parses a `!`-prefixed message. Unknown commands yield `Ok(None)`.
    pub fn parse(content: &str) -> Result<Option<Self>, UsageError> {
        let body = content.strip_prefix('!').unwrap_or(content);
        let mut words = body.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        match command {
            "reset" => match words.next() {
                Some("favorability") => Ok(Some(Self::ResetFavorability)),
                Some("all") => Ok(Some(Self::ResetAll)),
                _ => Err(UsageError::ResetTarget),
            },
            "setfavor" => {
                let (Some(user), Some(score)) = (words.next(), words.next()) else {
                    return Err(UsageError::SetFavor);
                };
                let score = score
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite())
                    .ok_or(UsageError::Score)?;
                Ok(Some(Self::SetFavor {
                    user: parse_user(user)?,
                    score,
                }))
            }
            _ => Ok(None),
        }
    }
}

fn parse_user(arg: &str) -> Result<UserId, UsageError> {
    if let Some(id) = USER_MENTION.captures(arg).and_then(|c| c.get(1)) {
        return Ok(UserId::from(id.as_str()));
    }
    if USER_ID.is_match(arg) {
        return Ok(UserId::from(arg));
    }
    Err(UsageError::User)
}

/// Executes admin commands on behalf of the configured owner.
pub struct AdminCommands {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<RelationshipStore>,
    owner: Option<UserId>,
}

impl AdminCommands {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<RelationshipStore>,
        owner: Option<UserId>,
    ) -> Self {
        Self {
            platform,
            store,
            owner,
        }
    }

    /// Handles a `!` message and returns the reply that was sent, if any.
    pub async fn handle(&self, msg: &InboundMessage) -> Option<String> {
        let reply = self.reply_for(msg).await?;
        if let Err(e) = self
            .platform
            .send_message(&msg.channel_id, &reply, Some(&msg.id))
            .await
        {
            warn!(channel_id = %msg.channel_id, error = %e, "failed to send admin reply");
        }
        Some(reply)
    }

    async fn reply_for(&self, msg: &InboundMessage) -> Option<String> {
        if self.owner.as_ref() != Some(&msg.author.id) {
            return Some(NOT_OWNER.to_string());
        }
        let command = match AdminCommand::parse(&msg.content) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(usage) => return Some(usage.to_string()),
        };
        let owner = &msg.author.name;
        match command {
            AdminCommand::ResetFavorability => {
                self.store.reset_favorability().await;
                info!(owner = %owner, "favorability reset by owner");
                Some("Long-term memory (favorability) has been cleared.".to_string())
            }
            AdminCommand::ResetAll => {
                self.store.reset().await;
                info!(owner = %owner, "all relationship state reset by owner");
                Some("All long-term memory (favorability and shared experiences) has been cleared. My personality will be a blank slate on my next interaction with each user.".to_string())
            }
            AdminCommand::SetFavor { user, score } => {
                let name = match self.platform.user_name(&user).await {
                    Ok(name) => name,
                    Err(e) => {
                        warn!(user_id = %user, error = %e, "setfavor target lookup failed");
                        return Some("Could not find that user.".to_string());
                    }
                };
                self.store.set(&user, score).await;
                info!(owner = %owner, user_id = %user, score, "favorability overridden by owner");
                Some(format!("Favorability for {name} has been set to {score}."))
            }
        }
    }
}
