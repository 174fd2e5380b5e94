// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Persona configuration system.

use persona_config::diagnostic::ConfigError;
use persona_config::{load_and_validate_str, load_config, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[agent]
name = "mika"
log_level = "debug"
language = "English"
system_rule = "You are Mika."
rejection_gate = true
reply_probability = 0.25
history_limit = 5

[discord]
bot_token = "token"
owner_id = "42"

[gemini]
api_key = "key"
text_model = "gemini-x"
max_attempts = 4

[voice]
enabled = true
rms_threshold = 0.05
tts_language = "en"

[proactive]
channel_id = "123"
interval_secs = 60

[storage]
favorability_path = "/tmp/f.json"
memories_path = "/tmp/m.json"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "mika");
    assert!(config.agent.rejection_gate);
    assert_eq!(config.agent.reply_probability, 0.25);
    assert_eq!(config.agent.history_limit, 5);
    assert_eq!(config.discord.owner_id.as_deref(), Some("42"));
    assert_eq!(config.gemini.text_model, "gemini-x");
    assert_eq!(config.gemini.multimodal_model, "gemini-2.5-flash");
    assert_eq!(config.gemini.max_attempts, 4);
    assert!(config.voice.enabled);
    assert_eq!(config.voice.tts_language, "en");
    assert_eq!(config.voice.silence_ms, 1000);
    assert_eq!(config.proactive.channel_id.as_deref(), Some("123"));
    assert_eq!(config.storage.memories_path, "/tmp/m.json");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert!(!config.agent.rejection_gate);
    assert_eq!(config.agent.reply_probability, 0.5);
    assert_eq!(config.agent.history_limit, 10);
    assert_eq!(config.agent.language, "Traditional Chinese (Taiwan)");
    assert_eq!(config.gemini.max_attempts, 3);
    assert_eq!(config.gemini.retry_base_delay_ms, 1000);
    assert!(!config.voice.enabled);
    assert_eq!(config.voice.rms_threshold, 0.02);
    assert_eq!(config.voice.min_capture_bytes, 24_000);
    assert_eq!(config.voice.connect_timeout_secs, 30);
    assert_eq!(config.voice.playback_timeout_secs, 60);
    assert!(config.proactive.channel_id.is_none());
    assert_eq!(config.proactive.interval_secs, 600);
    assert_eq!(config.storage.favorability_path, "favorability.json");
}

#[test]
fn unknown_key_gets_suggestion() {
    let toml = "[voice]\nenabld = true\n";
    let errors = load_and_validate_str(toml).expect_err("should reject unknown key");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "enabld");
            assert_eq!(suggestion.as_deref(), Some("enabled"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_is_reported() {
    let toml = "[agent]\nhistory_limit = \"ten\"\n";
    let errors = load_and_validate_str(toml).expect_err("should reject bad type");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn out_of_range_values_fail_validation() {
    let toml = "[agent]\nreply_probability = 2.0\n\n[gemini]\nmax_attempts = 0\n";
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn prefixed_env_overrides_files() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("persona.toml", "[agent]\nname = \"from-file\"\n")?;
        jail.set_env("PERSONA_AGENT_NAME", "from-env");
        jail.set_env("PERSONA_VOICE_SILENCE_MS", "1500");
        jail.set_env("PERSONA_DISCORD_BOT_TOKEN", "prefixed-token");

        let config = load_config()?;
        assert_eq!(config.agent.name, "from-env");
        assert_eq!(config.voice.silence_ms, 1500);
        assert_eq!(config.discord.bot_token.as_deref(), Some("prefixed-token"));
        Ok(())
    });
}

#[test]
fn bare_credential_variables_are_fallbacks() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("DISCORD_BOT_TOKEN", "bare-token");
        jail.set_env("OWNER_ID", "7");
        jail.set_env("GEMINI_API_KEY", "bare-key");
        jail.set_env("PERSONA_GEMINI_API_KEY", "prefixed-key");

        let config = load_config()?;
        assert_eq!(config.discord.bot_token.as_deref(), Some("bare-token"));
        assert_eq!(config.discord.owner_id.as_deref(), Some("7"));
        assert_eq!(config.gemini.api_key.as_deref(), Some("prefixed-key"));
        Ok(())
    });
}
