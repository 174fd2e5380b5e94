// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the JSON contracts the model is asked to answer with.
//!
//! Every reply passes through [`parse_object`], the single boundary that
//! turns malformed model output into [`PersonaError::ContractViolation`].
//! Keys are then checked one by one; nothing is assumed present.

use std::str::FromStr;

use serde_json::{Map, Value};
use strum::{Display, EnumString};

use persona_core::{ActivityKind, OnlineStatus, PersonaError, Presence};

/// Removes the markdown code fence models like to wrap JSON in.
pub fn strip_code_fence(raw: &str) -> String {
    raw.replace("```json\n", "").replace("```", "").trim().to_string()
}

/// Parses a (possibly fenced) reply into a JSON object.
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, PersonaError> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(PersonaError::contract(
            format!("expected a JSON object, got {}", json_kind(&other)),
            raw,
        )),
        Err(e) => Err(PersonaError::contract(format!("invalid JSON: {e}"), raw)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A non-empty string value.
fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn number(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

/// Reads the rejection gate reply. Anything but `{"shouldRespond": true}` is a no.
pub fn parse_gate(raw: Option<&str>) -> bool {
    let Some(raw) = raw else {
        return false;
    };
    match parse_object(raw) {
        Ok(map) => map.get("shouldRespond").and_then(Value::as_bool) == Some(true),
        Err(e) => {
            tracing::warn!(error = %e, raw, "unparseable gate reply, staying silent");
            false
        }
    }
}

/// Voice channel action requested by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum VoiceAction {
    #[strum(serialize = "JOIN_VC")]
    Join,
    #[strum(serialize = "LEAVE_VC")]
    Leave,
}

/// The parsed action contract for a message turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionDecision {
    /// Applied whenever it is a number.
    pub favorability_change: Option<f64>,
    /// May contain pacing directives.
    pub response: Option<String>,
    pub reaction: Option<String>,
    pub new_memory: Option<String>,
    pub voice: Option<VoiceAction>,
    /// Greeting to speak on join.
    pub voice_response: Option<String>,
}

impl ActionDecision {
    pub fn parse(raw: &str) -> Result<Self, PersonaError> {
        let map = parse_object(raw)?;
        let voice = match map.get("action").and_then(Value::as_str) {
            Some(tag) => match VoiceAction::from_str(tag) {
                Ok(action) => Some(action),
                Err(_) => {
                    tracing::debug!(action = tag, "ignoring unknown action tag");
                    None
                }
            },
            None => None,
        };
        Ok(Self {
            favorability_change: number(&map, "favorabilityChange"),
            response: text(&map, "response"),
            reaction: text(&map, "reaction"),
            new_memory: text(&map, "newMemory"),
            voice,
            voice_response: text(&map, "voiceResponse"),
        })
    }

    /// True when nothing would be dispatched.
    pub fn is_silent(&self) -> bool {
        self.response.is_none() && self.reaction.is_none() && self.voice.is_none()
    }
}

/// The parsed contract for a reaction turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionDecision {
    pub should_respond: bool,
    pub response: Option<String>,
    pub favorability_change: Option<f64>,
}

impl ReactionDecision {
    pub fn parse(raw: &str) -> Result<Self, PersonaError> {
        let map = parse_object(raw)?;
        Ok(Self {
            should_respond: map.get("shouldRespond").and_then(Value::as_bool) == Some(true),
            response: text(&map, "response"),
            favorability_change: number(&map, "favorabilityChange"),
        })
    }

    /// The text to send, if the model both wants to and said something.
    pub fn reply(&self) -> Option<&str> {
        if self.should_respond {
            self.response.as_deref()
        } else {
            None
        }
    }
}

/// Unsolicited channel message.
pub fn parse_proactive_message(raw: &str) -> Result<Option<String>, PersonaError> {
    let map = parse_object(raw)?;
    Ok(text(&map, "response"))
}

/// Slices from the first `{` to the last `}`.
fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parses a presence decision.
///
/// Returns `Ok(None)` when any of the three required keys is missing, and a
/// contract violation when a status or activity type is outside the allowed
/// vocabulary.
pub fn parse_presence(raw: &str) -> Result<Option<Presence>, PersonaError> {
    let object = embedded_object(raw)
        .ok_or_else(|| PersonaError::contract("no JSON object in presence reply", raw))?;
    let map = parse_object(object)?;

    let (Some(status), Some(kind), Some(name)) = (
        text(&map, "onlineStatus"),
        text(&map, "activityType"),
        text(&map, "activityName"),
    ) else {
        return Ok(None);
    };

    let status = OnlineStatus::from_str(status.trim())
        .map_err(|_| PersonaError::contract(format!("invalid onlineStatus: {status}"), raw))?;
    let kind = ActivityKind::from_str(kind.trim())
        .map_err(|_| PersonaError::contract(format!("invalid activityType: {kind}"), raw))?;

    Ok(Some(Presence {
        status,
        kind,
        name,
        emoji: text(&map, "emoji"),
    }))
}
