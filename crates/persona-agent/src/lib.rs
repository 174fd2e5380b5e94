// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn pipeline for the Persona agent.
//!
//! For every inbound message the [`TurnPipeline`]:
//! - assembles context (mentions, images, link titles, history, relationship)
//! - optionally asks the rejection gate whether to engage at all
//! - asks for an action decision and applies its relationship changes
//! - dispatches paced text, a reaction, speech, or a voice join/leave
//!
//! Reactions on the agent's own messages get a lighter single-prompt turn,
//! `!` messages go to the owner's admin commands, and the
//! [`ProactiveScheduler`] speaks up unprompted on a timer.

pub mod admin;
pub mod context;
pub mod dispatch;
pub mod pacing;
pub mod proactive;
pub mod prompts;
pub mod protocol;
pub mod shutdown;
pub mod turn;

pub use context::{ContextAssembler, FavorabilityBand, TurnContext, WebFetcher};
pub use dispatch::{ActionDispatcher, DispatchSummary, VoiceView};
pub use pacing::{Pacer, Segment};
pub use proactive::{ProactiveBranch, ProactiveOutcome, ProactiveScheduler};
pub use protocol::{ActionDecision, ReactionDecision, VoiceAction};
pub use turn::{TurnOutcome, TurnPipeline, TurnSettings};
