// SPDX-FileCopyrightText: 2026 Persona Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The relationship store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use persona_config::model::StorageConfig;
use persona_core::{PersonaError, UserId};

/// Memories kept per user; the oldest is evicted on overflow.
pub const MAX_MEMORIES: usize = 10;

/// A read-only view of one user's relationship state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationship {
    pub favorability: f64,
    /// Oldest first.
    pub memories: Vec<String>,
}

/// Owns the favorability and memory maps and keeps them written through to disk.
///
/// Each map sits behind its own lock, held across the file write, so a
/// read-modify-write on favorability is never interleaved with another and the
/// file always reflects a state the map actually held. Persist failures are
/// logged and leave memory ahead of disk.
pub struct RelationshipStore {
    favorability_path: PathBuf,
    memories_path: PathBuf,
    favorability: Mutex<BTreeMap<String, f64>>,
    memories: Mutex<BTreeMap<String, Vec<String>>>,
}

impl RelationshipStore {
    /// Loads both documents. Missing or unreadable files start empty.
    pub async fn load(
        favorability_path: impl Into<PathBuf>,
        memories_path: impl Into<PathBuf>,
    ) -> Self {
        let favorability_path = favorability_path.into();
        let memories_path = memories_path.into();
        let favorability: BTreeMap<String, f64> = read_document(&favorability_path).await;
        let memories: BTreeMap<String, Vec<String>> = read_document(&memories_path).await;
        debug!(
            users = favorability.len(),
            remembered = memories.len(),
            "relationship state loaded"
        );
        Self {
            favorability_path,
            memories_path,
            favorability: Mutex::new(favorability),
            memories: Mutex::new(memories),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Self {
        Self::load(&config.favorability_path, &config.memories_path).await
    }

    /// Current score, 0 for unseen users.
    pub async fn favorability(&self, user: &UserId) -> f64 {
        self.favorability
            .lock()
            .await
            .get(user.as_str())
            .copied()
            .unwrap_or(0.0)
    }

    /// Adds `delta` to the user's score and persists. Returns the new score.
    ///
    /// A non-finite delta is ignored.
    pub async fn update(&self, user: &UserId, delta: f64) -> f64 {
        let mut map = self.favorability.lock().await;
        if !delta.is_finite() {
            warn!(user_id = %user, delta, "ignoring non-finite favorability delta");
            return map.get(user.as_str()).copied().unwrap_or(0.0);
        }
        let score = map.entry(user.0.clone()).or_insert(0.0);
        *score += delta;
        let score = *score;
        debug!(user_id = %user, delta, score, "favorability updated");
        persist(&self.favorability_path, &*map).await;
        score
    }

    /// Overwrites the user's score and persists.
    pub async fn set(&self, user: &UserId, value: f64) {
        let mut map = self.favorability.lock().await;
        map.insert(user.0.clone(), value);
        debug!(user_id = %user, value, "favorability set");
        persist(&self.favorability_path, &*map).await;
    }

    /// The user's memories, oldest first.
    pub async fn memories(&self, user: &UserId) -> Vec<String> {
        self.memories
            .lock()
            .await
            .get(user.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Appends a memory, keeps the last [`MAX_MEMORIES`], and persists.
    pub async fn add_memory(&self, user: &UserId, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let mut map = self.memories.lock().await;
        let list = map.entry(user.0.clone()).or_default();
        list.push(text.to_string());
        if list.len() > MAX_MEMORIES {
            let excess = list.len() - MAX_MEMORIES;
            list.drain(..excess);
        }
        debug!(user_id = %user, count = list.len(), "memory added");
        persist(&self.memories_path, &*map).await;
    }

    /// Both halves of a user's state.
    pub async fn snapshot(&self, user: &UserId) -> Relationship {
        Relationship {
            favorability: self.favorability(user).await,
            memories: self.memories(user).await,
        }
    }

    /// Clears every favorability score.
    pub async fn reset_favorability(&self) {
        let mut map = self.favorability.lock().await;
        map.clear();
        persist(&self.favorability_path, &*map).await;
    }

    /// Clears every memory log.
    pub async fn reset_memories(&self) {
        let mut map = self.memories.lock().await;
        map.clear();
        persist(&self.memories_path, &*map).await;
    }

    /// Clears all relationship state.
    pub async fn reset(&self) {
        self.reset_favorability().await;
        self.reset_memories().await;
    }
}

async fn read_document<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read state file, starting empty");
            return T::default();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "state file is corrupt, starting empty");
        T::default()
    })
}

async fn persist<T: Serialize>(path: &Path, value: &T) {
    if let Err(e) = write_document(path, value).await {
        error!(path = %path.display(), error = %e, "failed to persist relationship state");
    }
}

async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<(), PersonaError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| PersonaError::Storage {
        source: Box::new(e),
    })?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| PersonaError::Storage {
            source: Box::new(e),
        })
}
