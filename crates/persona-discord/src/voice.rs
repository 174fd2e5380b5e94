// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`VoiceGateway`] over songbird.
//!
//! Songbird decodes every speaker to 48 kHz stereo PCM and reports it once
//! per 20 ms tick keyed by SSRC. Speaking-state updates map SSRCs to users.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId as DiscordChannelId, GuildId as DiscordGuildId};
use songbird::driver::DecodeMode;
use songbird::events::{
    CoreEvent, Event, EventContext, EventHandler as SongbirdEventHandler, TrackEvent,
};
use songbird::input::Input;
use songbird::model::payload::Speaking;
use songbird::tracks::PlayMode;
use songbird::{Config as SongbirdConfig, Songbird};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use persona_core::{
    Author, ChannelId, GuildId, PersonaError, SpeakerFrame, VoiceEvents, VoiceGateway,
};

use crate::platform::{DiscordPlatform, snowflake};

/// Songbird configuration with inbound audio decoding switched on.
pub fn songbird_config() -> SongbirdConfig {
    SongbirdConfig::default().decode_mode(DecodeMode::Decode)
}

/// A songbird instance to register with the gateway client.
pub fn new_songbird() -> Arc<Songbird> {
    Songbird::serenity_from_config(songbird_config())
}

fn voice_err(context: &str, e: impl std::fmt::Display) -> PersonaError {
    PersonaError::Voice {
        message: format!("{context}: {e}"),
    }
}

pub struct SongbirdGateway {
    songbird: Arc<Songbird>,
    platform: Arc<DiscordPlatform>,
}

impl SongbirdGateway {
    pub fn new(songbird: Arc<Songbird>, platform: Arc<DiscordPlatform>) -> Self {
        Self { songbird, platform }
    }
}

#[async_trait]
impl VoiceGateway for SongbirdGateway {
    async fn join(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
        events: Arc<dyn VoiceEvents>,
    ) -> Result<(), PersonaError> {
        let guild_id: DiscordGuildId = snowflake(guild.as_str())?;
        let channel_id: DiscordChannelId = snowflake(channel.as_str())?;
        let call = self
            .songbird
            .join(guild_id, channel_id)
            .await
            .map_err(|e| voice_err("failed to join voice channel", e))?;

        let receiver = Receiver {
            inner: Arc::new(ReceiverState {
                guild: guild.clone(),
                events,
                platform: Arc::clone(&self.platform),
                speakers: DashMap::new(),
            }),
        };
        let mut call = call.lock().await;
        call.remove_all_global_events();
        call.add_global_event(CoreEvent::SpeakingStateUpdate.into(), receiver.clone());
        call.add_global_event(CoreEvent::VoiceTick.into(), receiver.clone());
        call.add_global_event(CoreEvent::DriverDisconnect.into(), receiver);
        info!(guild_id = %guild, channel_id = %channel, "voice receiver registered");
        Ok(())
    }

    async fn leave(&self, guild: &GuildId) -> Result<(), PersonaError> {
        let guild_id: DiscordGuildId = snowflake(guild.as_str())?;
        if self.songbird.get(guild_id).is_none() {
            return Ok(());
        }
        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| voice_err("failed to leave voice channel", e))
    }

    async fn play(&self, guild: &GuildId, audio: Vec<u8>) -> Result<(), PersonaError> {
        let guild_id: DiscordGuildId = snowflake(guild.as_str())?;
        let call = self.songbird.get(guild_id).ok_or_else(|| PersonaError::Voice {
            message: format!("not connected to voice in guild {guild}"),
        })?;

        // Replaces whatever is playing so only one track is ever active.
        let track = call.lock().await.play_only_input(Input::from(audio));
        let (tx, rx) = oneshot::channel();
        let notifier = PlaybackEnd {
            done: Arc::new(Mutex::new(Some(tx))),
        };
        track
            .add_event(Event::Track(TrackEvent::End), notifier.clone())
            .map_err(|e| voice_err("failed to watch playback", e))?;
        track
            .add_event(Event::Track(TrackEvent::Error), notifier)
            .map_err(|e| voice_err("failed to watch playback", e))?;

        match rx.await {
            Ok(true) => Ok(()),
            Ok(false) => Err(PersonaError::Voice {
                message: "audio playback errored".into(),
            }),
            Err(_) => Err(PersonaError::Voice {
                message: "playback ended without notice".into(),
            }),
        }
    }

    async fn stop(&self, guild: &GuildId) -> Result<(), PersonaError> {
        let guild_id: DiscordGuildId = snowflake(guild.as_str())?;
        if let Some(call) = self.songbird.get(guild_id) {
            call.lock().await.stop();
        }
        Ok(())
    }
}

struct ReceiverState {
    guild: GuildId,
    events: Arc<dyn VoiceEvents>,
    platform: Arc<DiscordPlatform>,
    speakers: DashMap<u32, Author>,
}

#[derive(Clone)]
struct Receiver {
    inner: Arc<ReceiverState>,
}

impl Receiver {
    fn speaker(&self, user: u64) -> Author {
        self.inner
            .platform
            .cached_author(user)
            .unwrap_or_else(|| Author::new(user.to_string(), user.to_string()))
    }

    fn frames(&self, tick: &songbird::events::context_data::VoiceTick) -> Vec<SpeakerFrame> {
        tick.speaking
            .iter()
            .filter_map(|(ssrc, data)| {
                let speaker = self.inner.speakers.get(ssrc)?.value().clone();
                if speaker.bot {
                    return None;
                }
                let pcm = data.decoded_voice.as_ref()?.clone();
                Some(SpeakerFrame { speaker, pcm })
            })
            .collect()
    }
}

#[async_trait]
impl SongbirdEventHandler for Receiver {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::SpeakingStateUpdate(Speaking {
                ssrc,
                user_id: Some(user),
                ..
            }) => {
                let author = self.speaker(user.0);
                debug!(guild_id = %self.inner.guild, ssrc, user_id = %author.id, "speaker mapped");
                self.inner.speakers.insert(*ssrc, author);
            }
            EventContext::VoiceTick(tick) => {
                let frames = self.frames(tick);
                self.inner.events.on_voice_tick(&self.inner.guild, frames).await;
            }
            EventContext::DriverDisconnect(_) => {
                warn!(guild_id = %self.inner.guild, "voice driver disconnected");
                self.inner.events.on_disconnect(&self.inner.guild).await;
            }
            _ => {}
        }
        None
    }
}

/// Resolves once the track ends; `false` when it ended in error.
#[derive(Clone)]
struct PlaybackEnd {
    done: Arc<Mutex<Option<oneshot::Sender<bool>>>>,
}

#[async_trait]
impl SongbirdEventHandler for PlaybackEnd {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            let ok = !tracks
                .iter()
                .any(|(state, _)| matches!(state.playing, PlayMode::Errored(_)));
            let sender = self.done.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(sender) = sender {
                let _ = sender.send(ok);
            }
        }
        Some(Event::Cancel)
    }
}
