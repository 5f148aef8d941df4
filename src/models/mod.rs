// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod drop;
pub mod leaderboard;
pub mod session;
pub mod sticker;
pub mod user;
pub mod validation;

pub use drop::{Drop, DropRow, NewDropRow};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use session::{Session, SessionUser, TokenClaims};
pub use sticker::{default_catalog, Rarity, Sticker};
pub use user::{normalize_username, Avatar, AvatarChoice, ProfileSetup, UserProfile};
pub use validation::{ValidateRequest, Verdict};

use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

/// Read a column that may hold `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Read a value of the wrong shape as the type's default.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}
