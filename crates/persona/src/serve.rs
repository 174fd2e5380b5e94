// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `persona serve` command implementation.
//!
//! Wires the relationship store, the Gemini provider, the optional voice
//! subsystem, the turn pipeline, and the proactive scheduler onto the Discord
//! gateway, then runs until SIGINT or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use persona_agent::{
    Pacer, ProactiveScheduler, TurnPipeline, TurnSettings, WebFetcher, shutdown,
};
use persona_config::PersonaConfig;
use persona_core::{ChannelId, ModelProvider, PersonaError};
use persona_discord::{DiscordHandler, DiscordPlatform, SongbirdGateway};
use persona_gemini::{GeminiProvider, GoogleTranslateTts};
use persona_relationship::RelationshipStore;
use persona_voice::VoiceManager;

/// Timeout for link previews, image downloads, and speech synthesis.
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn run_serve(config: PersonaConfig) -> Result<(), PersonaError> {
    init_tracing(&config.agent.log_level);

    info!("starting persona serve");

    let token = config
        .discord
        .bot_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            PersonaError::Config(
                "Discord bot token not found. Set discord.bot_token in config or DISCORD_BOT_TOKEN environment variable.".into(),
            )
        })?;
    if config.discord.owner_id.is_none() {
        warn!("no owner configured, admin commands will be refused");
    }

    let store = Arc::new(RelationshipStore::from_config(&config.storage).await);
    let provider: Arc<dyn ModelProvider> = Arc::new(GeminiProvider::new(&config.gemini)?);
    let platform = Arc::new(DiscordPlatform::from_token(&token, &config.agent.name));
    let settings = TurnSettings::from_config(&config);

    let (voice, songbird) = if config.voice.enabled {
        let songbird = persona_discord::new_songbird();
        let gateway = Arc::new(SongbirdGateway::new(Arc::clone(&songbird), Arc::clone(&platform)));
        let tts = Arc::new(GoogleTranslateTts::new(FETCH_TIMEOUT)?);
        let manager = VoiceManager::new(
            gateway,
            tts,
            Arc::clone(&provider),
            settings.profile.clone(),
            config.voice.clone(),
        );
        info!(tts_language = %config.voice.tts_language, "voice interaction enabled");
        (Some(manager), Some(songbird))
    } else {
        info!("voice interaction disabled");
        (None, None)
    };

    let pipeline = Arc::new(TurnPipeline::new(
        settings.clone(),
        platform.clone(),
        Arc::clone(&provider),
        store,
        voice,
        WebFetcher::new(FETCH_TIMEOUT)?,
        Pacer::default(),
    ));

    let proactive = match config.proactive.channel_id.as_deref() {
        Some(channel) => Some(ProactiveScheduler::new(
            platform.clone(),
            Arc::clone(&provider),
            settings.profile.clone(),
            ChannelId::from(channel),
            Duration::from_secs(config.proactive.interval_secs),
        )),
        None => {
            info!("proactive mode disabled");
            None
        }
    };

    let cancel = shutdown::install_signal_handler();
    let handler = DiscordHandler::new(
        Arc::clone(&platform),
        pipeline,
        proactive.clone(),
        cancel.clone(),
    );

    let result = persona_discord::run(&token, handler, songbird, cancel).await;
    if let Some(scheduler) = proactive {
        scheduler.stop();
    }
    result?;

    info!("persona serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("persona={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
