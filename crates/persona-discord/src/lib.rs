// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord adapter for the Persona agent.
//!
//! [`DiscordPlatform`] implements the chat platform over serenity,
//! [`SongbirdGateway`] the voice transport over songbird, and
//! [`DiscordHandler`] routes gateway events into the turn pipeline.

pub mod handler;
pub mod platform;
pub mod voice;

use std::sync::Arc;

use serenity::Client;
use serenity::model::gateway::GatewayIntents;
use songbird::{SerenityInit, Songbird};
use tokio_util::sync::CancellationToken;
use tracing::info;

use persona_core::PersonaError;

pub use handler::DiscordHandler;
pub use platform::DiscordPlatform;
pub use voice::{SongbirdGateway, new_songbird, songbird_config};

/// Gateway intents the agent needs: messages with content, reactions, and voice states.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::GUILD_VOICE_STATES
}

/// Connects to the gateway and runs until `cancel` fires or the connection fails.
pub async fn run(
    token: &str,
    handler: DiscordHandler,
    songbird: Option<Arc<Songbird>>,
    cancel: CancellationToken,
) -> Result<(), PersonaError> {
    let mut builder = Client::builder(token, intents()).event_handler(handler);
    if let Some(songbird) = songbird {
        builder = builder.register_songbird_with(songbird);
    }
    let mut client = builder
        .await
        .map_err(|e| PersonaError::platform("failed to build Discord client", e))?;

    let shards = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        cancel.cancelled().await;
        info!("shutting down Discord gateway");
        shards.shutdown_all().await;
    });

    client
        .start()
        .await
        .map_err(|e| PersonaError::platform("Discord gateway stopped", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_include_privileged_message_content() {
        let intents = intents();
        assert!(intents.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents.contains(GatewayIntents::GUILD_VOICE_STATES));
        assert!(!intents.contains(GatewayIntents::GUILD_PRESENCES));
    }
}
