// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device storage: a key/value blob store and the offline cache on top of it.
//!
//! The cache is a single JSON object. Writes merge shallowly into whatever is
//! already there (last write wins per key), and a missing or corrupt blob
//! reads as an empty object.

use crate::error::{AppError, Result};
use crate::models::{lenient, Drop, UserProfile};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key holding the offline cache.
pub const CACHE_KEY: &str = "streethunt_cache_v1";
/// Key holding the auth session.
pub const SESSION_KEY: &str = "sb_session";

/// Blob store with one file per key.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to create store dir {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Read a blob. Unreadable blobs are treated as missing.
    pub fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Some(raw),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read local blob");
                None
            }
        }
    }

    /// Replace a blob. Written to a temp file first, then renamed over.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write {}: {}", key, e)))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "Failed to remove {}: {}",
                key,
                e
            ))),
        }
    }
}

/// Typed view of the offline cache. Each field is read on its own, so one
/// value of the wrong shape doesn't cost the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    #[serde(
        rename = "userId",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_score: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub finds: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub discovered: Vec<String>,
    #[serde(rename = "ownDrops", default, deserialize_with = "lenient")]
    pub own_drops: Vec<Drop>,
}

impl CachedState {
    /// Snapshot of a profile plus its own drops.
    pub fn from_profile(profile: &UserProfile, own_drops: Vec<Drop>) -> Self {
        Self {
            user_id: Some(profile.user_id.clone()),
            username: Some(profile.username.clone()),
            avatar_id: Some(profile.avatar_id.clone()),
            total_score: profile.total_score,
            finds: profile.finds,
            discovered: profile.discovered.clone(),
            own_drops,
        }
    }

    /// Profile held in the cache, if it has both a user id and a username.
    pub fn profile(&self) -> Option<UserProfile> {
        let user_id = self.user_id.clone()?;
        let username = self.username.clone()?;
        Some(UserProfile {
            user_id,
            username,
            avatar_id: self.avatar_id.clone().unwrap_or_default(),
            total_score: self.total_score,
            finds: self.finds,
            discovered: self.discovered.clone(),
        })
    }
}

/// Offline buffer: always read first, refreshed from the store when online.
#[derive(Debug, Clone)]
pub struct OfflineCache {
    store: LocalStore,
}

impl OfflineCache {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Raw cache object. Never fails.
    pub fn read(&self) -> Map<String, Value> {
        let Some(raw) = self.store.get(CACHE_KEY) else {
            return Map::new();
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!("Offline cache is corrupt, ignoring it");
                Map::new()
            }
        }
    }

    /// Typed view of the cache; a field of the wrong shape reads as its
    /// default and the other fields are kept.
    pub fn read_state(&self) -> CachedState {
        serde_json::from_value(Value::Object(self.read())).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Offline cache has unexpected shape");
            CachedState::default()
        })
    }

    /// Merge `patch` into the cache. Failures are logged, never returned.
    pub fn write<T: Serialize>(&self, patch: &T) {
        let patch = match serde_json::to_value(patch) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                tracing::warn!("Ignoring non-object cache patch");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize cache patch");
                return;
            }
        };

        let mut merged = self.read();
        merged.extend(patch);

        let encoded = match serde_json::to_string(&Value::Object(merged)) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode offline cache");
                return;
            }
        };
        if let Err(e) = self.store.set(CACHE_KEY, &encoded) {
            tracing::warn!(error = %e, "Failed to persist offline cache");
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(CACHE_KEY)
    }
}
