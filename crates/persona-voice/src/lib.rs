// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice channel interaction for the Persona agent.
//!
//! Decoded 48 kHz stereo PCM arrives from the transport in 20 ms ticks and is
//! grouped into per-speaker captures that close after a stretch of silence.
//! A capture that is long and loud enough is framed as WAV, transcribed,
//! answered in one model call, synthesized, and played back into the
//! channel. Everything else is dropped before any backend call.

pub mod capture;
pub mod manager;
pub mod pcm;
pub mod session;
pub mod speech;
pub mod wav;

pub use capture::{CaptureSet, SpeechCapture};
pub use manager::{UtteranceOutcome, VoiceManager};
pub use pcm::{GateVerdict, VoiceGate, rms};
pub use session::{SessionRegistry, SessionState};
pub use speech::sanitize_for_speech;
pub use wav::encode_wav;
