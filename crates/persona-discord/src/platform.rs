// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ChatPlatform`] over serenity's HTTP client and gateway cache.

use std::num::NonZeroU64;
use std::sync::{Arc, LazyLock};

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use serenity::builder::{CreateMessage, GetMessages};
use serenity::cache::Cache;
use serenity::client::Context;
use serenity::gateway::ActivityData;
use serenity::http::Http;
use serenity::model::channel::{Message, Reaction, ReactionType};
use serenity::model::gateway::Ready;
use serenity::model::id::{
    ChannelId as DiscordChannelId, EmojiId, GuildId as DiscordGuildId,
    MessageId as DiscordMessageId, UserId as DiscordUserId,
};
use serenity::model::user::{OnlineStatus as DiscordStatus, User};
use tracing::{debug, info};

use persona_core::{
    ActivityKind, AdapterType, Attachment, Author, ChannelId, ChatPlatform, GuildId,
    HealthStatus, HistoryMessage, InboundMessage, Mentions, MessageId, NamedRef, OnlineStatus,
    PersonaError, PluginAdapter, Presence, ReactionEvent, UserId,
};

/// Discord's maximum message content length.
const MAX_DISCORD_LEN: usize = 2000;

static CHANNEL_MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<#(\d+)>").unwrap());

/// Parses a decimal snowflake into a serenity id type.
pub(crate) fn snowflake<T: From<NonZeroU64>>(raw: &str) -> Result<T, PersonaError> {
    raw.parse::<NonZeroU64>()
        .map(T::from)
        .map_err(|_| PersonaError::Platform {
            message: format!("invalid Discord id: {raw:?}"),
            source: None,
        })
}

/// Cuts `text` to Discord's length limit on a char boundary.
pub fn truncate(text: &str) -> &str {
    if text.len() <= MAX_DISCORD_LEN {
        return text;
    }
    let mut end = MAX_DISCORD_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Parses a unicode emoji or a custom `<:name:id>` / `<a:name:id>` emoji.
pub fn parse_reaction_type(emoji: &str) -> ReactionType {
    let inner = emoji.trim().trim_start_matches('<').trim_end_matches('>');
    let parts: Vec<&str> = inner.split(':').collect();
    match parts.as_slice() {
        [flag, name, id] => match id.parse::<NonZeroU64>() {
            Ok(id) => ReactionType::Custom {
                animated: *flag == "a",
                id: EmojiId::from(id),
                name: Some((*name).to_string()),
            },
            Err(_) => ReactionType::Unicode(emoji.to_string()),
        },
        _ => ReactionType::Unicode(emoji.to_string()),
    }
}

pub fn display_name(user: &User) -> String {
    user.global_name.clone().unwrap_or_else(|| user.name.clone())
}

fn author_of(user: &User) -> Author {
    Author {
        id: UserId::from(user.id.to_string()),
        name: display_name(user),
        bot: user.bot,
    }
}

pub fn online_status(status: OnlineStatus) -> DiscordStatus {
    match status {
        OnlineStatus::Online => DiscordStatus::Online,
        OnlineStatus::Idle => DiscordStatus::Idle,
        OnlineStatus::DoNotDisturb => DiscordStatus::DoNotDisturb,
    }
}

/// Builds the gateway activity. Custom statuses carry the emoji inline.
pub fn activity_data(presence: &Presence) -> ActivityData {
    let name = presence.name.clone();
    match presence.kind {
        ActivityKind::Playing => ActivityData::playing(name),
        ActivityKind::Listening => ActivityData::listening(name),
        ActivityKind::Watching => ActivityData::watching(name),
        ActivityKind::Competing => ActivityData::competing(name),
        ActivityKind::Custom => match &presence.emoji {
            Some(emoji) => ActivityData::custom(format!("{emoji} {name}")),
            None => ActivityData::custom(name),
        },
    }
}

fn platform_err(message: &str) -> impl FnOnce(serenity::Error) -> PersonaError + '_ {
    move |e| PersonaError::platform(message, e)
}

/// Discord adapter. Usable for REST calls immediately; cache-backed lookups
/// and presence updates need the gateway context attached on ready.
pub struct DiscordPlatform {
    http: Arc<Http>,
    me: ArcSwap<Author>,
    context: ArcSwapOption<Context>,
    /// Guild of every channel a message was seen in; fetched history carries no guild id.
    channel_guilds: DashMap<DiscordChannelId, DiscordGuildId>,
}

impl DiscordPlatform {
    /// `fallback_name` is the identity reported until the gateway is ready.
    pub fn new(http: Arc<Http>, fallback_name: &str) -> Self {
        Self {
            http,
            me: ArcSwap::from_pointee(Author {
                id: UserId::from(""),
                name: fallback_name.to_string(),
                bot: true,
            }),
            context: ArcSwapOption::empty(),
            channel_guilds: DashMap::new(),
        }
    }

    /// An adapter with its own REST client for `token`.
    pub fn from_token(token: &str, fallback_name: &str) -> Self {
        Self::new(Arc::new(Http::new(token)), fallback_name)
    }

    /// Records the gateway context and the agent's identity.
    pub fn attach(&self, ctx: &Context, ready: &Ready) {
        self.me.store(Arc::new(Author {
            id: UserId::from(ready.user.id.to_string()),
            name: display_name(&ready.user),
            bot: true,
        }));
        self.context.store(Some(Arc::new(ctx.clone())));
        info!(user_id = %ready.user.id, name = %ready.user.name, "Discord identity attached");
    }

    fn context(&self) -> Result<Arc<Context>, PersonaError> {
        self.context.load_full().ok_or_else(|| PersonaError::Platform {
            message: "Discord gateway is not ready".into(),
            source: None,
        })
    }

    fn cache(&self) -> Option<Arc<Cache>> {
        self.context.load().as_ref().map(|ctx| Arc::clone(&ctx.cache))
    }

    /// A cached user, if the gateway has seen them.
    pub fn cached_author(&self, user: u64) -> Option<Author> {
        let id = DiscordUserId::from(NonZeroU64::new(user)?);
        let cache = self.cache()?;
        let user = cache.user(id)?;
        Some(author_of(&user))
    }

    fn channel_name(&self, guild: Option<DiscordGuildId>, channel: DiscordChannelId) -> String {
        let named = guild
            .zip(self.cache())
            .and_then(|(guild, cache)| {
                let guild = cache.guild(guild)?;
                guild
                    .channels
                    .get(&channel)
                    .map(|c| c.name.clone())
                    .or_else(|| guild.threads.iter().find(|t| t.id == channel).map(|t| t.name.clone()))
            });
        named.unwrap_or_else(|| "direct message".to_string())
    }

    fn mentions(&self, guild: Option<DiscordGuildId>, msg: &Message) -> Mentions {
        let users = msg
            .mentions
            .iter()
            .map(|u| NamedRef::new(u.id.to_string(), display_name(u)))
            .collect();
        let mut mentions = Mentions {
            users,
            ..Mentions::default()
        };
        let Some(cache) = self.cache() else {
            return mentions;
        };
        let Some(guild) = guild.and_then(|g| cache.guild(g)) else {
            return mentions;
        };
        mentions.roles = msg
            .mention_roles
            .iter()
            .filter_map(|id| guild.roles.get(id).map(|r| NamedRef::new(id.to_string(), r.name.clone())))
            .collect();
        mentions.channels = CHANNEL_MENTION
            .captures_iter(&msg.content)
            .filter_map(|caps| {
                let id: DiscordChannelId = snowflake(&caps[1]).ok()?;
                guild
                    .channels
                    .get(&id)
                    .map(|c| NamedRef::new(id.to_string(), c.name.clone()))
            })
            .collect();
        mentions
    }

    /// Converts a gateway message into a turn input.
    pub fn to_inbound(&self, msg: &Message) -> InboundMessage {
        if let Some(guild) = msg.guild_id {
            self.channel_guilds.insert(msg.channel_id, guild);
        }
        let name = msg
            .member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .unwrap_or_else(|| display_name(&msg.author));
        InboundMessage {
            id: MessageId::from(msg.id.to_string()),
            channel_id: ChannelId::from(msg.channel_id.to_string()),
            channel_name: self.channel_name(msg.guild_id, msg.channel_id),
            guild_id: msg.guild_id.map(|g| GuildId::from(g.to_string())),
            author: Author {
                name,
                ..author_of(&msg.author)
            },
            content: msg.content.clone(),
            attachments: msg
                .attachments
                .iter()
                .map(|a| Attachment {
                    url: a.url.clone(),
                    content_type: a.content_type.clone(),
                })
                .collect(),
            mentions: self.mentions(msg.guild_id, msg),
        }
    }

    pub fn to_history(&self, msg: &Message) -> HistoryMessage {
        let guild = msg
            .guild_id
            .or_else(|| self.channel_guilds.get(&msg.channel_id).map(|g| *g.value()));
        HistoryMessage {
            id: MessageId::from(msg.id.to_string()),
            author: author_of(&msg.author),
            content: msg.content.clone(),
            mentions: self.mentions(guild, msg),
        }
    }

    /// Resolves a gateway reaction into a reaction turn input.
    ///
    /// Reactions without a known reacting user yield `Ok(None)`.
    pub async fn reaction_event(
        &self,
        reaction: &Reaction,
    ) -> Result<Option<ReactionEvent>, PersonaError> {
        let Some(user_id) = reaction.user_id else {
            return Ok(None);
        };
        let user = match &reaction.member {
            Some(member) => member.user.clone(),
            None => self
                .http
                .get_user(user_id)
                .await
                .map_err(platform_err("failed to resolve reacting user"))?,
        };
        let message = reaction
            .message(&*self.http)
            .await
            .map_err(platform_err("failed to fetch reacted message"))?;
        if let Some(guild) = reaction.guild_id {
            self.channel_guilds.insert(reaction.channel_id, guild);
        }
        Ok(Some(ReactionEvent {
            user: author_of(&user),
            emoji: reaction.emoji.to_string(),
            channel_id: ChannelId::from(reaction.channel_id.to_string()),
            message: self.to_history(&message),
        }))
    }
}

#[async_trait]
impl PluginAdapter for DiscordPlatform {
    fn name(&self) -> &str {
        "discord"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Platform
    }

    async fn health_check(&self) -> Result<HealthStatus, PersonaError> {
        if self.context.load().is_some() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded("gateway not ready".into()))
        }
    }

    async fn shutdown(&self) -> Result<(), PersonaError> {
        self.context.store(None);
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn current_user(&self) -> Author {
        self.me.load().as_ref().clone()
    }

    async fn send_typing(&self, channel: &ChannelId) -> Result<(), PersonaError> {
        let channel: DiscordChannelId = snowflake(channel.as_str())?;
        self.http
            .broadcast_typing(channel)
            .await
            .map_err(platform_err("failed to broadcast typing"))
    }

    async fn send_message(
        &self,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<MessageId, PersonaError> {
        let channel_id: DiscordChannelId = snowflake(channel.as_str())?;
        let mut builder = CreateMessage::new().content(truncate(text));
        if let Some(reply) = reply_to {
            let reply: DiscordMessageId = snowflake(reply.as_str())?;
            builder = builder.reference_message((channel_id, reply));
        }
        let sent = channel_id
            .send_message(&*self.http, builder)
            .await
            .map_err(platform_err("failed to send message"))?;
        debug!(channel_id = %channel, message_id = %sent.id, "message sent");
        Ok(MessageId::from(sent.id.to_string()))
    }

    async fn add_reaction(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emoji: &str,
    ) -> Result<(), PersonaError> {
        let channel: DiscordChannelId = snowflake(channel.as_str())?;
        let message: DiscordMessageId = snowflake(message.as_str())?;
        self.http
            .create_reaction(channel, message, &parse_reaction_type(emoji))
            .await
            .map_err(platform_err("failed to add reaction"))
    }

    async fn recent_messages(
        &self,
        channel: &ChannelId,
        limit: u8,
    ) -> Result<Vec<HistoryMessage>, PersonaError> {
        let channel: DiscordChannelId = snowflake(channel.as_str())?;
        let messages = channel
            .messages(&*self.http, GetMessages::new().limit(limit.clamp(1, 100)))
            .await
            .map_err(platform_err("failed to fetch channel history"))?;
        Ok(messages.iter().map(|m| self.to_history(m)).collect())
    }

    async fn set_presence(&self, presence: &Presence) -> Result<(), PersonaError> {
        let ctx = self.context()?;
        ctx.set_presence(Some(activity_data(presence)), online_status(presence.status));
        Ok(())
    }

    async fn voice_channel_of(
        &self,
        guild: &GuildId,
        user: &UserId,
    ) -> Result<Option<ChannelId>, PersonaError> {
        let guild: DiscordGuildId = snowflake(guild.as_str())?;
        let user: DiscordUserId = snowflake(user.as_str())?;
        let ctx = self.context()?;
        let channel = ctx
            .cache
            .guild(guild)
            .and_then(|g| g.voice_states.get(&user).and_then(|state| state.channel_id));
        Ok(channel.map(|c| ChannelId::from(c.to_string())))
    }

    async fn user_name(&self, user: &UserId) -> Result<String, PersonaError> {
        let user: DiscordUserId = snowflake(user.as_str())?;
        let user = self
            .http
            .get_user(user)
            .await
            .map_err(platform_err("failed to fetch user"))?;
        Ok(display_name(&user))
    }
}
