// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn context assembly.
//!
//! Turns a raw inbound message into the text the model sees: mentions are
//! expanded to display names, images are fetched for multimodal submission,
//! the first link is summarized by its page title, and recent channel
//! history is collected up to the author's last `!reset`.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use persona_core::{
    ChatPlatform, HistoryMessage, InboundMessage, InlineMedia, Mentions, PersonaError,
};
use persona_relationship::Relationship;

/// Prefix of the message that truncates an author's history window.
pub const RESET_MARKER: &str = "!reset";

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://[^\s]+").unwrap());

/// Qualitative description of a favorability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavorabilityBand {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl FavorabilityBand {
    /// Bands are `> 10`, `> 0`, `< -10`, `< 0`, and neutral otherwise.
    pub fn from_score(score: f64) -> Self {
        if score > 10.0 {
            Self::VeryPositive
        } else if score > 0.0 {
            Self::Positive
        } else if score < -10.0 {
            Self::VeryNegative
        } else if score < 0.0 {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    /// The sentence quoted verbatim in prompts.
    pub fn description(self) -> &'static str {
        match self {
            Self::VeryPositive => "My relationship with them is very positive (close friend).",
            Self::Positive => "My relationship with them is positive.",
            Self::Neutral => "My relationship with them is neutral.",
            Self::Negative => "My relationship with them is negative.",
            Self::VeryNegative => "My relationship with them is very negative (annoyed).",
        }
    }
}

/// Rewrites platform mention tokens into readable `@name` / `#name` form.
///
/// References that `mentions` does not resolve are left verbatim.
pub fn resolve_mentions(text: &str, mentions: &Mentions) -> String {
    let mut resolved = text.to_string();
    for user in &mentions.users {
        let readable = format!("@{}", user.name);
        resolved = resolved
            .replace(&format!("<@{}>", user.id), &readable)
            .replace(&format!("<@!{}>", user.id), &readable);
    }
    for role in &mentions.roles {
        resolved = resolved.replace(&format!("<@&{}>", role.id), &format!("@{}", role.name));
    }
    for channel in &mentions.channels {
        resolved = resolved.replace(&format!("<#{}>", channel.id), &format!("#{}", channel.name));
    }
    resolved
}

/// The first `http(s)` URL in `text`.
pub fn first_url(text: &str) -> Option<&str> {
    URL.find(text).map(|m| m.as_str())
}

/// What became of an image attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageNote {
    None,
    Attached,
    Unavailable,
}

/// What became of the first link in the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkNote {
    None,
    Titled(String),
    Unavailable,
}

/// Replaces message content with the placeholder the model should see.
///
/// An image note takes precedence over a link note.
pub fn describe_message(content: &str, image: &ImageNote, link: &LinkNote) -> String {
    match image {
        ImageNote::Attached if content.trim().is_empty() => {
            return "[The user sent an image.]".to_string();
        }
        ImageNote::Attached => {
            return format!("[The user sent an image and also said: \"{content}\"]");
        }
        ImageNote::Unavailable => {
            return "[The user sent an image, but I couldn't load it.]".to_string();
        }
        ImageNote::None => {}
    }
    match link {
        LinkNote::Titled(title) => format!("[The user sent a link with the title: \"{title}\"]"),
        LinkNote::Unavailable => "[The user sent a link, but I couldn't fetch its details.]".to_string(),
        LinkNote::None => content.to_string(),
    }
}

/// Builds the chronological `name: content` history lines.
///
/// `newest_first` is the fetched window. Accumulation stops at the first
/// message from `current`'s author that starts with [`RESET_MARKER`]. The
/// current message itself is shown as `current_text`.
pub fn history_lines(
    newest_first: &[HistoryMessage],
    current: &InboundMessage,
    current_text: &str,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(newest_first.len());
    for m in newest_first {
        if m.author.id == current.author.id && m.content.starts_with(RESET_MARKER) {
            break;
        }
        let content = if m.id == current.id {
            current_text
        } else {
            m.content.as_str()
        };
        let content = resolve_mentions(content, &m.mentions);
        lines.push(format!("{}: {}", m.author.name, content));
    }
    lines.reverse();
    lines
}

/// Everything the prompts need about one inbound message.
#[derive(Debug, Clone)]
pub struct TurnContext {
    /// Message text after placeholders and mention resolution.
    pub text: String,
    pub media: Vec<InlineMedia>,
    /// Chronological `name: content` lines, oldest first.
    pub history: Vec<String>,
    pub favorability: f64,
    pub band: FavorabilityBand,
    pub memories: Vec<String>,
}

/// HTTP fetches for attachments and link metadata.
pub struct WebFetcher {
    client: reqwest::Client,
}

impl WebFetcher {
    pub fn new(timeout: Duration) -> Result<Self, PersonaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("persona/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PersonaError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, PersonaError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PersonaError::platform(format!("fetching {url} failed"), e))
    }

    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, PersonaError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| PersonaError::platform("reading attachment body failed", e))?;
        Ok(bytes.to_vec())
    }

    /// Fetches `url` and returns its `og:title`, falling back to `<title>`.
    pub async fn fetch_title(&self, url: &str) -> Result<String, PersonaError> {
        let html = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|e| PersonaError::platform("reading page body failed", e))?;
        extract_title(&html).ok_or_else(|| PersonaError::Platform {
            message: format!("no title found at {url}"),
            source: None,
        })
    }
}

/// Page title from Open Graph metadata or the `<title>` element.
pub fn extract_title(html: &str) -> Option<String> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let og = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    let from_og = document
        .select(&og)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    from_og.or_else(|| {
        let title = Selector::parse("title").ok()?;
        document
            .select(&title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Builds a [`TurnContext`] for each inbound message.
pub struct ContextAssembler {
    platform: Arc<dyn ChatPlatform>,
    fetcher: WebFetcher,
    history_limit: u8,
}

impl ContextAssembler {
    pub fn new(platform: Arc<dyn ChatPlatform>, fetcher: WebFetcher, history_limit: u8) -> Self {
        Self {
            platform,
            fetcher,
            history_limit,
        }
    }

    /// Assembles the context for `msg`. Fetch failures degrade to placeholders.
    pub async fn assemble(&self, msg: &InboundMessage, relationship: &Relationship) -> TurnContext {
        let mut media = Vec::new();
        let image = match msg.attachments.iter().find(|a| a.is_image()) {
            None => ImageNote::None,
            Some(attachment) => match self.fetcher.fetch_image(&attachment.url).await {
                Ok(bytes) => {
                    let mime = attachment.content_type.as_deref().unwrap_or("image/png");
                    media.push(InlineMedia::from_bytes(mime, &bytes));
                    ImageNote::Attached
                }
                Err(e) => {
                    warn!(message_id = %msg.id, error = %e, "failed to load image attachment");
                    ImageNote::Unavailable
                }
            },
        };

        let link = match (&image, first_url(&msg.content)) {
            (ImageNote::None, Some(url)) => match self.fetcher.fetch_title(url).await {
                Ok(title) => LinkNote::Titled(title),
                Err(e) => {
                    debug!(url, error = %e, "link metadata unavailable");
                    LinkNote::Unavailable
                }
            },
            _ => LinkNote::None,
        };

        let text = resolve_mentions(&describe_message(&msg.content, &image, &link), &msg.mentions);

        let history = match self
            .platform
            .recent_messages(&msg.channel_id, self.history_limit)
            .await
        {
            Ok(window) => history_lines(&window, msg, &text),
            Err(e) => {
                warn!(channel_id = %msg.channel_id, error = %e, "history fetch failed, using current message only");
                vec![format!("{}: {}", msg.author.name, text)]
            }
        };

        TurnContext {
            text,
            media,
            history,
            favorability: relationship.favorability,
            band: FavorabilityBand::from_score(relationship.favorability),
            memories: relationship.memories.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{Author, ChannelId, MessageId, NamedRef};

    fn inbound(id: &str, author: &str, content: &str) -> InboundMessage {
        InboundMessage {
            id: MessageId::from(id),
            channel_id: ChannelId::from("c"),
            channel_name: "general".into(),
            guild_id: None,
            author: Author::new(author, author.to_uppercase()),
            content: content.into(),
            attachments: Vec::new(),
            mentions: Mentions::default(),
        }
    }

    fn past(id: &str, author: &str, content: &str) -> HistoryMessage {
        HistoryMessage {
            id: MessageId::from(id),
            author: Author::new(author, author.to_uppercase()),
            content: content.into(),
            mentions: Mentions::default(),
        }
    }

    #[test]
    fn bands_follow_thresholds() {
        let bands: Vec<_> = [-11.0, -5.0, 0.0, 5.0, 11.0]
            .into_iter()
            .map(FavorabilityBand::from_score)
            .collect();
        assert_eq!(
            bands,
            vec![
                FavorabilityBand::VeryNegative,
                FavorabilityBand::Negative,
                FavorabilityBand::Neutral,
                FavorabilityBand::Positive,
                FavorabilityBand::VeryPositive,
            ]
        );
        assert_eq!(FavorabilityBand::from_score(10.0), FavorabilityBand::Positive);
        assert_eq!(FavorabilityBand::from_score(-10.0), FavorabilityBand::Negative);
    }

    #[test]
    fn mentions_resolve_and_unknowns_stay() {
        let mentions = Mentions {
            users: vec![NamedRef::new("42", "alice")],
            roles: vec![NamedRef::new("7", "mods")],
            channels: vec![NamedRef::new("9", "memes")],
        };
        let text = "<@42> and <@!42> ping <@&7> in <#9>, not <@99>";
        assert_eq!(
            resolve_mentions(text, &mentions),
            "@alice and @alice ping @mods in #memes, not <@99>"
        );
    }

    #[test]
    fn first_url_only() {
        assert_eq!(
            first_url("see https://a.example/x and http://b.example"),
            Some("https://a.example/x")
        );
        assert_eq!(first_url("no links here"), None);
    }

    #[test]
    fn image_placeholder_wins_over_link() {
        let link = LinkNote::Titled("Cats".into());
        assert_eq!(
            describe_message("", &ImageNote::Attached, &link),
            "[The user sent an image.]"
        );
        assert_eq!(
            describe_message("look", &ImageNote::Attached, &LinkNote::None),
            "[The user sent an image and also said: \"look\"]"
        );
        assert_eq!(
            describe_message("https://x", &ImageNote::None, &link),
            "[The user sent a link with the title: \"Cats\"]"
        );
        assert_eq!(
            describe_message("https://x", &ImageNote::None, &LinkNote::Unavailable),
            "[The user sent a link, but I couldn't fetch its details.]"
        );
        assert_eq!(describe_message("hi", &ImageNote::None, &LinkNote::None), "hi");
    }

    #[test]
    fn history_stops_at_authors_reset() {
        let current = inbound("m3", "u1", "hello again");
        let window = vec![
            past("m3", "u1", "hello again"),
            past("m2", "u2", "welcome"),
            past("m1", "u1", "!reset all"),
            past("m0", "u2", "ancient"),
        ];
        let lines = history_lines(&window, &current, "hello again");
        assert_eq!(lines, vec!["U2: welcome", "U1: hello again"]);
    }

    #[test]
    fn reset_by_someone_else_does_not_truncate() {
        let current = inbound("m2", "u1", "hi");
        let window = vec![past("m2", "u1", "hi"), past("m1", "u2", "!reset all"), past("m0", "u2", "old")];
        let lines = history_lines(&window, &current, "hi");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "U2: old");
    }

    #[test]
    fn current_message_uses_resolved_text() {
        let current = inbound("m1", "u1", "https://x.example");
        let window = vec![past("m1", "u1", "https://x.example")];
        let lines = history_lines(&window, &current, "[The user sent a link with the title: \"X\"]");
        assert_eq!(lines, vec!["U1: [The user sent a link with the title: \"X\"]"]);
    }

    #[test]
    fn title_prefers_open_graph() {
        let html = r#"<html><head><title>Plain</title><meta property="og:title" content=" Rich "></head></html>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Rich"));
        let html = "<html><head><title> Plain </title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Plain"));
        assert_eq!(extract_title("<html></html>"), None);
    }
}
