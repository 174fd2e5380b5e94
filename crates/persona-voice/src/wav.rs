// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WAV framing for captured PCM.

use std::io::Cursor;

use persona_core::PersonaError;

use crate::pcm::{CHANNELS, SAMPLE_RATE};

/// Wraps interleaved 48 kHz stereo 16-bit samples in a canonical 44-byte-header WAV container.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>, PersonaError> {
    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(cursor.into_inner())
}

fn wav_error(e: hound::Error) -> PersonaError {
    PersonaError::Voice {
        message: format!("failed to encode WAV: {e}"),
    }
}
