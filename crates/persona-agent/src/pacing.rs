// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paced multi-part message delivery.
//!
//! Model replies may embed `[PAUSE]` (random delay) or `[PAUSE=ms]`
//! (explicit delay) between parts. The text is tokenized once into
//! [`Segment`]s and then replayed against the platform with a typing
//! indicator after every pause.

use std::ops::RangeInclusive;
use std::sync::LazyLock;
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use tracing::debug;

use persona_core::{ChannelId, ChatPlatform, MessageId, PersonaError};

static PAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[PAUSE(?:=(\d+))?\]").unwrap());

/// One delivery instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Trimmed, never empty.
    Text(String),
    /// `None` means a random natural delay.
    Pause(Option<Duration>),
}

/// Splits `text` into text segments and pauses, dropping blank text.
pub fn tokenize(text: &str) -> Vec<Segment> {
    fn push_text(part: &str, segments: &mut Vec<Segment>) {
        let part = part.trim();
        if !part.is_empty() {
            segments.push(Segment::Text(part.to_string()));
        }
    }

    let mut segments = Vec::new();
    let mut last = 0;
    for caps in PAUSE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&text[last..whole.start()], &mut segments);
        let explicit = caps
            .get(1)
            .and_then(|ms| ms.as_str().parse::<u64>().ok())
            .map(Duration::from_millis);
        segments.push(Segment::Pause(explicit));
        last = whole.end();
    }
    push_text(&text[last..], &mut segments);
    segments
}

/// The text parts of `text` joined by spaces, for speech.
pub fn strip_directives(text: &str) -> String {
    tokenize(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Text(part) => Some(part),
            Segment::Pause(_) => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sends tokenized replies with human-like pauses.
#[derive(Debug, Clone)]
pub struct Pacer {
    random_pause_ms: RangeInclusive<u64>,
}

impl Default for Pacer {
    fn default() -> Self {
        Self {
            random_pause_ms: 500..=2000,
        }
    }
}

impl Pacer {
    /// A pacer whose bare `[PAUSE]` waits a random duration within `range_ms`.
    pub fn with_random_pause(range_ms: RangeInclusive<u64>) -> Self {
        Self {
            random_pause_ms: range_ms,
        }
    }

    fn pause_for(&self, explicit: Option<Duration>) -> Duration {
        explicit.unwrap_or_else(|| {
            let ms = rand::thread_rng().gen_range(self.random_pause_ms.clone());
            Duration::from_millis(ms)
        })
    }

    /// Delivers `text` to `channel` and returns how many messages were sent.
    ///
    /// The first sent part is threaded to `reply_to` when given. Typing
    /// indicator failures are ignored; a failed send stops delivery.
    pub async fn send(
        &self,
        platform: &dyn ChatPlatform,
        channel: &ChannelId,
        text: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<usize, PersonaError> {
        typing(platform, channel).await;

        let mut sent = 0;
        for segment in tokenize(text) {
            match segment {
                Segment::Pause(explicit) => {
                    let delay = self.pause_for(explicit);
                    debug!(channel_id = %channel, delay_ms = delay.as_millis() as u64, "pausing");
                    tokio::time::sleep(delay).await;
                    typing(platform, channel).await;
                }
                Segment::Text(part) => {
                    let thread = if sent == 0 { reply_to } else { None };
                    platform.send_message(channel, &part, thread).await?;
                    sent += 1;
                }
            }
        }
        Ok(sent)
    }
}

async fn typing(platform: &dyn ChatPlatform, channel: &ChannelId) {
    if let Err(e) = platform.send_typing(channel).await {
        debug!(channel_id = %channel, error = %e, "typing indicator failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_test_utils::{MockPlatform, PlatformCall};

    #[test]
    fn tokenizes_explicit_and_random_pauses() {
        assert_eq!(
            tokenize("A[PAUSE=100]B[PAUSE] C "),
            vec![
                Segment::Text("A".into()),
                Segment::Pause(Some(Duration::from_millis(100))),
                Segment::Text("B".into()),
                Segment::Pause(None),
                Segment::Text("C".into()),
            ]
        );
    }

    #[test]
    fn blank_parts_are_dropped() {
        assert_eq!(tokenize("   [PAUSE]   "), vec![Segment::Pause(None)]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn malformed_directives_stay_as_text() {
        assert_eq!(
            tokenize("wait [PAUSE=abc] ok"),
            vec![Segment::Text("wait [PAUSE=abc] ok".into())]
        );
    }

    #[test]
    fn oversized_duration_falls_back_to_random() {
        assert_eq!(
            tokenize("[PAUSE=99999999999999999999999]"),
            vec![Segment::Pause(None)]
        );
    }

    #[test]
    fn directives_are_removed_for_speech() {
        assert_eq!(strip_directives("hey[PAUSE=300]you there?"), "hey you there?");
        assert_eq!(strip_directives("[PAUSE]"), "");
    }

    #[test]
    fn random_pause_stays_in_range() {
        let pacer = Pacer::with_random_pause(5..=10);
        for _ in 0..50 {
            let d = pacer.pause_for(None);
            assert!(d >= Duration::from_millis(5) && d <= Duration::from_millis(10));
        }
        assert_eq!(
            pacer.pause_for(Some(Duration::from_millis(42))),
            Duration::from_millis(42)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_pause_delays_the_next_part() {
        let platform = MockPlatform::new();
        let channel = ChannelId::from("c1");
        let start = tokio::time::Instant::now();

        let sent = Pacer::default()
            .send(&platform, &channel, "A[PAUSE=100]B", Some(&MessageId::from("m1")))
            .await
            .unwrap();
        assert_eq!(sent, 2);

        let calls = platform.timed_calls().await;
        let order: Vec<&str> = calls
            .iter()
            .map(|(_, call)| match call {
                PlatformCall::Typing(_) => "typing",
                PlatformCall::Send { text, .. } => text.as_str(),
                _ => "other",
            })
            .collect();
        assert_eq!(order, vec!["typing", "A", "typing", "B"]);

        let (sent_a, sent_b) = (calls[1].0, calls[3].0);
        assert!(sent_b - sent_a >= Duration::from_millis(100));
        // The explicit delay wins over the 500..=2000 ms random range.
        assert!(sent_b - start < Duration::from_millis(500));
    }
}
