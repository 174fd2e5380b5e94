// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod platform;
pub mod provider;
pub mod speech;
pub mod voice;

pub use adapter::PluginAdapter;
pub use platform::ChatPlatform;
pub use provider::ModelProvider;
pub use speech::SpeechSynthesizer;
pub use voice::{SpeakerFrame, VoiceEvents, VoiceGateway};
