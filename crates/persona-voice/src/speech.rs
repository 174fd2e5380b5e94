// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text cleanup before synthesis.

use std::sync::LazyLock;

use regex::Regex;

/// Punctuation the synthesizer would otherwise pronounce.
static UNSPOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.,?!;:"()\[\]{}<>]"#).unwrap());

/// Replaces punctuation the synthesizer would read aloud with spaces.
///
/// Returns an empty string when nothing speakable remains.
pub fn sanitize_for_speech(text: &str) -> String {
    UNSPOKEN.replace_all(text, " ").trim().to_string()
}
