// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile model for storage and cache.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::null_as_default;

/// Longest username the setup screen accepts.
pub const MAX_USERNAME_LEN: usize = 20;

/// Profile row stored in the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Set once at first-time setup, never changed afterwards
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    /// Serialized [`Avatar`] (see [`Avatar::parse`])
    #[serde(default, deserialize_with = "null_as_default")]
    pub avatar_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_score: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub finds: u32,
    /// Sticker ids found at least once, without duplicates
    #[serde(default, deserialize_with = "null_as_default")]
    pub discovered: Vec<String>,
}

impl UserProfile {
    /// Fresh profile for a user completing setup.
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, avatar: &Avatar) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            avatar_id: avatar.to_avatar_id(),
            total_score: 0,
            finds: 0,
            discovered: Vec::new(),
        }
    }

    /// Record a sticker as discovered. Returns `false` if it already was.
    pub fn discover(&mut self, sticker_id: &str) -> bool {
        if self.discovered.iter().any(|id| id == sticker_id) {
            return false;
        }
        self.discovered.push(sticker_id.to_string());
        true
    }

    pub fn has_discovered(&self, sticker_id: &str) -> bool {
        self.discovered.iter().any(|id| id == sticker_id)
    }

    pub fn avatar(&self) -> Avatar {
        Avatar::parse(&self.avatar_id)
    }
}

/// Avatar descriptor. Every profile carries exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Avatar {
    Emoji(String),
    /// Public URL of an uploaded image (or an inline data URL)
    Upload(String),
    /// Bare sticker id from before avatars were tagged
    Legacy(String),
}

#[derive(Serialize, Deserialize)]
struct TaggedAvatar {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

impl Avatar {
    /// Parse a stored `avatar_id`. Anything that isn't a tagged JSON
    /// descriptor is a legacy sticker id.
    pub fn parse(avatar_id: &str) -> Self {
        match serde_json::from_str::<TaggedAvatar>(avatar_id) {
            Ok(tagged) => match (tagged.kind.as_str(), tagged.value, tagged.preview) {
                ("emoji", Some(value), _) => Avatar::Emoji(value),
                ("upload", Some(value), _) | ("upload", None, Some(value)) => Avatar::Upload(value),
                _ => Avatar::Legacy(avatar_id.to_string()),
            },
            Err(_) => Avatar::Legacy(avatar_id.to_string()),
        }
    }

    /// Serialize for the `avatar_id` column.
    pub fn to_avatar_id(&self) -> String {
        let (kind, value) = match self {
            Avatar::Emoji(v) => ("emoji", v),
            Avatar::Upload(v) => ("upload", v),
            Avatar::Legacy(id) => return id.clone(),
        };
        let tagged = TaggedAvatar {
            kind: kind.to_string(),
            value: Some(value.clone()),
            preview: None,
        };
        serde_json::to_string(&tagged).unwrap_or_else(|_| value.clone())
    }
}

/// Avatar picked during first-time setup.
#[derive(Debug, Clone)]
pub enum AvatarChoice {
    Emoji(String),
    Image {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// First-time profile setup input.
#[derive(Debug, Clone, Validate)]
pub struct ProfileSetup {
    #[validate(length(min = 3, max = 20, message = "username needs at least 3 characters"))]
    pub username: String,
    pub avatar: AvatarChoice,
}

impl ProfileSetup {
    /// Build a setup request, normalizing the raw username input.
    pub fn new(raw_username: &str, avatar: AvatarChoice) -> Self {
        Self {
            username: normalize_username(raw_username),
            avatar,
        }
    }
}

/// Strip all whitespace, lowercase, and cap the length.
pub fn normalize_username(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .take(MAX_USERNAME_LEN)
        .collect()
}
