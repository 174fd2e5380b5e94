// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Energy estimation and the voice-activity gate for decoded PCM.

/// Sample rate of decoded voice audio.
pub const SAMPLE_RATE: u32 = 48_000;

/// Interleaved channels of decoded voice audio.
pub const CHANNELS: u16 = 2;

/// Bytes per sample (signed 16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Root-mean-square energy of signed 16-bit samples, normalized to `[0, 1]`.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples
        .iter()
        .map(|&s| {
            let x = f64::from(s) / 32768.0;
            x * x
        })
        .sum();
    (sum / samples.len() as f64).sqrt()
}

/// Outcome of running a capture through the gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateVerdict {
    /// Long and loud enough to transcribe.
    Speech { rms: f64 },
    TooShort { bytes: usize },
    TooQuiet { rms: f64 },
}

impl GateVerdict {
    pub fn is_speech(&self) -> bool {
        matches!(self, Self::Speech { .. })
    }
}

/// Drops captures that are too short or too quiet to be worth transcribing.
#[derive(Debug, Clone, Copy)]
pub struct VoiceGate {
    /// Captures must be strictly longer than this many PCM bytes.
    pub min_bytes: usize,
    /// Captures must have strictly greater RMS than this.
    pub rms_threshold: f64,
}

impl VoiceGate {
    pub fn check(&self, samples: &[i16]) -> GateVerdict {
        let bytes = samples.len() * BYTES_PER_SAMPLE;
        if bytes <= self.min_bytes {
            return GateVerdict::TooShort { bytes };
        }
        let energy = rms(samples);
        if energy <= self.rms_threshold {
            return GateVerdict::TooQuiet { rms: energy };
        }
        GateVerdict::Speech { rms: energy }
    }
}
