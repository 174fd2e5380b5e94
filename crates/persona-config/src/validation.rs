// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks ranges and non-empty values that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::PersonaConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Err(Vec<ConfigError>)` with every failed check (does not fail fast).
pub fn validate_config(config: &PersonaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, message: String| {
        if !ok {
            errors.push(ConfigError::Validation { message });
        }
    };

    let agent = &config.agent;
    check(
        (0.0..=1.0).contains(&agent.reply_probability),
        format!(
            "agent.reply_probability must be within [0, 1], got {}",
            agent.reply_probability
        ),
    );
    check(
        agent.history_limit >= 1,
        "agent.history_limit must be at least 1".to_string(),
    );
    check(
        !agent.system_rule.trim().is_empty(),
        "agent.system_rule must not be empty".to_string(),
    );
    check(
        !agent.language.trim().is_empty(),
        "agent.language must not be empty".to_string(),
    );

    let gemini = &config.gemini;
    check(
        gemini.max_attempts >= 1,
        format!("gemini.max_attempts must be at least 1, got {}", gemini.max_attempts),
    );
    check(
        !gemini.text_model.trim().is_empty() && !gemini.multimodal_model.trim().is_empty(),
        "gemini.text_model and gemini.multimodal_model must not be empty".to_string(),
    );
    check(
        gemini.base_url.starts_with("http://") || gemini.base_url.starts_with("https://"),
        format!("gemini.base_url `{}` must be an http(s) URL", gemini.base_url),
    );

    let voice = &config.voice;
    check(
        voice.rms_threshold.is_finite() && (0.0..=1.0).contains(&voice.rms_threshold),
        format!(
            "voice.rms_threshold must be within [0, 1], got {}",
            voice.rms_threshold
        ),
    );
    check(
        voice.silence_ms > 0,
        "voice.silence_ms must be greater than 0".to_string(),
    );
    check(
        voice.connect_timeout_secs > 0 && voice.playback_timeout_secs > 0,
        "voice timeouts must be greater than 0".to_string(),
    );

    check(
        config.proactive.interval_secs > 0,
        "proactive.interval_secs must be greater than 0".to_string(),
    );
    if let Some(channel) = &config.proactive.channel_id {
        check(
            !channel.trim().is_empty(),
            "proactive.channel_id must not be empty when set".to_string(),
        );
    }

    check(
        !config.storage.favorability_path.trim().is_empty(),
        "storage.favorability_path must not be empty".to_string(),
    );
    check(
        !config.storage.memories_path.trim().is_empty(),
        "storage.memories_path must not be empty".to_string(),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks that the credentials needed to connect are present.
///
/// Kept apart from [`validate_config`] so `check-config` can validate a file
/// that leaves secrets to the environment.
pub fn validate_credentials(config: &PersonaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    if config.discord.bot_token.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "discord.bot_token".to_string(),
        });
    }
    if config.gemini.api_key.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "gemini.api_key".to_string(),
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
