// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable per-user relationship state: a favorability score and a short
//! memory log for every user the persona has talked to.
//!
//! State lives in two pretty-printed JSON documents that are rewritten
//! wholesale after every mutation.

pub mod store;

pub use store::{MAX_MEMORIES, Relationship, RelationshipStore};
