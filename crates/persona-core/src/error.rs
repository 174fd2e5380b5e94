// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Persona agent.

use thiserror::Error;

/// The primary error type used across all Persona adapters and pipeline stages.
///
/// Nothing in the turn pipeline is fatal to the process: every variant is
/// contained to the turn that produced it and logged at the turn boundary.
#[derive(Debug, Error)]
pub enum PersonaError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relationship state persistence errors (file read/write, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat platform errors (send, reaction, history fetch, presence rejected).
    #[error("platform error: {message}")]
    Platform {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model backend errors that are not worth retrying (auth, bad request, 5xx, network).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The model backend kept signalling rate limiting after all attempts.
    #[error("rate limited by backend (status {status}): {body}")]
    RateLimited { status: u16, body: String },

    /// The model reply did not honour the JSON contract it was asked for.
    #[error("contract violation: {message}")]
    ContractViolation { message: String, raw: String },

    /// Voice connection, capture, or playback failures.
    #[error("voice error: {message}")]
    Voice { message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PersonaError {
    /// Builds a [`PersonaError::Platform`] from any platform client error.
    pub fn platform<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Platform {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Builds a [`PersonaError::ContractViolation`] carrying the raw model reply.
    pub fn contract(message: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::ContractViolation {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Returns true for rate-limit failures, the only class the model client retries.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
