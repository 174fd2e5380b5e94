// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Persona integration tests.
//!
//! Provides mock adapters for fast, deterministic tests without Discord or
//! any HTTP backend.
//!
//! # Components
//!
//! - [`MockPlatform`] - Chat platform that records every outbound call
//! - [`MockProvider`] - Model provider with queued replies and recorded prompts
//! - [`MockSynthesizer`] - Speech synthesizer echoing text as bytes
//! - [`MockVoiceGateway`] - Voice transport that records joins and playback
//! - [`fixtures`] - Builders for inbound messages and history

pub mod fixtures;
pub mod mock_platform;
pub mod mock_provider;
pub mod mock_voice;

pub use mock_platform::{MockPlatform, PlatformCall};
pub use mock_provider::{MockProvider, ProviderCall};
pub use mock_voice::{MockSynthesizer, MockVoiceGateway, VoiceCall};
