// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./persona.toml` > `~/.config/persona/persona.toml` > `/etc/persona/persona.toml`
//! with environment variable overrides via `PERSONA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PersonaConfig;

/// Top-level sections that `PERSONA_<SECTION>_<KEY>` variables map into.
const SECTIONS: &[&str] = &[
    "agent",
    "discord",
    "gemini",
    "voice",
    "proactive",
    "storage",
];

/// Paths searched for `persona.toml`, lowest precedence first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/persona/persona.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("persona/persona.toml"));
    }
    paths.push(PathBuf::from("persona.toml"));
    paths
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/persona/persona.toml`
/// 3. `~/.config/persona/persona.toml`
/// 4. `./persona.toml`
/// 5. `PERSONA_*` environment variables
///
/// Unset credentials then fall back to the bare `DISCORD_BOT_TOKEN`,
/// `OWNER_ID`, and `GEMINI_API_KEY` variables.
pub fn load_config() -> Result<PersonaConfig, figment::Error> {
    let mut config: PersonaConfig = build_figment().extract()?;
    apply_env_fallbacks(&mut config);
    tracing::debug!(
        voice = config.voice.enabled,
        proactive = config.proactive.channel_id.is_some(),
        "configuration loaded"
    );
    Ok(config)
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and `check-config`.
pub fn load_config_from_str(toml_content: &str) -> Result<PersonaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PersonaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PersonaConfig, figment::Error> {
    let mut config: PersonaConfig = Figment::new()
        .merge(Serialized::defaults(PersonaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    apply_env_fallbacks(&mut config);
    Ok(config)
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    config_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(PersonaConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Create the environment variable provider.
///
/// Maps by known section prefix instead of splitting on `_`, since key names
/// contain underscores: `PERSONA_DISCORD_BOT_TOKEN` must become
/// `discord.bot_token`, not `discord.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("PERSONA_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped variable name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Fill unset credentials from the conventional unprefixed variables.
fn apply_env_fallbacks(config: &mut PersonaConfig) {
    fallback(&mut config.discord.bot_token, "DISCORD_BOT_TOKEN");
    fallback(&mut config.discord.owner_id, "OWNER_ID");
    fallback(&mut config.gemini.api_key, "GEMINI_API_KEY");
}

fn fallback(slot: &mut Option<String>, var: &str) {
    if slot.is_none()
        && let Ok(value) = std::env::var(var)
        && !value.trim().is_empty()
    {
        *slot = Some(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_on_section_boundary() {
        assert_eq!(map_env_key("discord_bot_token"), "discord.bot_token");
        assert_eq!(map_env_key("gemini_retry_base_delay_ms"), "gemini.retry_base_delay_ms");
        assert_eq!(map_env_key("agent_rejection_gate"), "agent.rejection_gate");
        assert_eq!(map_env_key("storage_memories_path"), "storage.memories_path");
    }

    #[test]
    fn unknown_env_keys_pass_through() {
        assert_eq!(map_env_key("bogus"), "bogus");
    }

    #[test]
    fn config_paths_end_with_local_file() {
        let paths = config_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("/etc/persona/persona.toml")));
        assert_eq!(paths.last(), Some(&PathBuf::from("persona.toml")));
    }
}
