// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Drop model: one recorded find at a location.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::null_as_default;

/// Time label shown for drops loaded from the store.
pub const SYNCED_LABEL: &str = "synced";
/// Time label shown for a drop logged during this session.
pub const JUST_NOW_LABEL: &str = "just now";

/// Drop as held in memory and in the offline cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drop {
    pub id: String,
    pub sticker_id: String,
    pub lat: f64,
    pub lng: f64,
    /// Username of the finder
    pub owner: String,
    pub city: String,
    /// Display label ("just now", "synced")
    pub time: String,
    pub pts: u32,
    pub pioneer: bool,
    #[serde(default)]
    pub is_own: bool,
}

/// Row in the `drops` table as returned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct DropRow {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub sticker_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pts: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pioneer: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl DropRow {
    fn into_drop(self, default_owner: &str, is_own: bool) -> Drop {
        let id = match self.id {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Drop {
            id,
            sticker_id: self.sticker_id,
            lat: self.lat,
            lng: self.lng,
            owner: self.username.unwrap_or_else(|| default_owner.to_string()),
            city: self.city.unwrap_or_default(),
            time: SYNCED_LABEL.to_string(),
            pts: self.pts,
            pioneer: self.pioneer,
            is_own,
        }
    }

    /// Another player's drop, for the shared map.
    pub fn into_shared(self) -> Drop {
        self.into_drop("hunter", false)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

impl From<DropRow> for Drop {
    fn from(row: DropRow) -> Self {
        row.into_drop("you", true)
    }
}

/// Insert payload for the `drops` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewDropRow<'a> {
    pub user_id: &'a str,
    pub sticker_id: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub city: &'a str,
    pub pts: u32,
    pub pioneer: bool,
}

impl<'a> NewDropRow<'a> {
    pub fn new(user_id: &'a str, drop: &'a Drop) -> Self {
        Self {
            user_id,
            sticker_id: &drop.sticker_id,
            lat: drop.lat,
            lng: drop.lng,
            city: &drop.city,
            pts: drop.pts,
            pioneer: drop.pioneer,
        }
    }
}
