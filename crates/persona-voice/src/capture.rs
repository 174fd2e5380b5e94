// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-speaker speech capture driven by 20 ms receive ticks.
//!
//! A capture opens on the first tick a speaker produces audio and closes
//! once the speaker has been silent for the configured duration.

use std::collections::HashMap;
use std::time::Duration;

use persona_core::{Author, SpeakerFrame, UserId};

/// Interval between receive ticks.
pub const TICK: Duration = Duration::from_millis(20);

/// A finished utterance from one speaker.
#[derive(Debug, Clone)]
pub struct SpeechCapture {
    pub speaker: Author,
    /// Interleaved 48 kHz stereo samples.
    pub pcm: Vec<i16>,
}

#[derive(Debug)]
struct OpenCapture {
    speaker: Author,
    pcm: Vec<i16>,
    silent_ticks: u32,
}

/// All open captures within one voice session.
#[derive(Debug)]
pub struct CaptureSet {
    open: HashMap<UserId, OpenCapture>,
    silence_ticks: u32,
}

impl CaptureSet {
    pub fn new(silence: Duration) -> Self {
        let ticks = silence.as_millis().div_ceil(TICK.as_millis()).max(1);
        Self {
            open: HashMap::new(),
            silence_ticks: u32::try_from(ticks).unwrap_or(u32::MAX),
        }
    }

    pub fn is_listening(&self) -> bool {
        !self.open.is_empty()
    }

    /// Feeds one tick of audio and returns the captures that just ended.
    ///
    /// Frames from bots and empty frames never open a capture.
    pub fn tick(&mut self, frames: Vec<SpeakerFrame>) -> Vec<SpeechCapture> {
        let mut heard = Vec::with_capacity(frames.len());
        for frame in frames {
            if frame.speaker.bot || frame.pcm.is_empty() {
                continue;
            }
            let id = frame.speaker.id.clone();
            let capture = self.open.entry(id.clone()).or_insert_with(|| {
                tracing::debug!(user_id = %frame.speaker.id, "speech capture opened");
                OpenCapture {
                    speaker: frame.speaker.clone(),
                    pcm: Vec::new(),
                    silent_ticks: 0,
                }
            });
            capture.pcm.extend_from_slice(&frame.pcm);
            capture.silent_ticks = 0;
            heard.push(id);
        }

        let mut finished = Vec::new();
        let limit = self.silence_ticks;
        self.open.retain(|id, capture| {
            if heard.contains(id) {
                return true;
            }
            capture.silent_ticks += 1;
            if capture.silent_ticks < limit {
                return true;
            }
            finished.push(SpeechCapture {
                speaker: capture.speaker.clone(),
                pcm: std::mem::take(&mut capture.pcm),
            });
            false
        });
        finished
    }

    /// Drops every open capture without emitting it.
    pub fn clear(&mut self) {
        self.open.clear();
    }
}
