// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sticker catalog entries.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Rarity tier of a sticker. Drives the flat rarity bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Bonus points on top of the sticker's base value.
    pub fn bonus(self) -> u32 {
        match self {
            Rarity::Common => 0,
            Rarity::Rare => 5,
            Rarity::Epic => 15,
            Rarity::Legendary => 30,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }
}

// Unknown tiers coming from the store score like Common.
impl From<String> for Rarity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Rare" => Rarity::Rare,
            "Epic" => Rarity::Epic,
            "Legendary" => Rarity::Legendary,
            _ => Rarity::Common,
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sticker in circulation, as stored in the `stickers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Sticker {
    pub id: String,
    pub name: String,
    pub rarity: Rarity,
    /// Base points for a find
    pub pts: u32,
    #[serde(default)]
    pub hint: String,
    /// Display color (CSS hex)
    #[serde(default = "default_color")]
    pub color: String,
    /// Artwork shown in the catalog grid
    #[serde(default)]
    pub art_url: Option<String>,
    /// Reference image used for visual comparison
    #[serde(default)]
    pub reference_url: Option<String>,
}

fn default_color() -> String {
    "#C6FF00".to_string()
}

impl Sticker {
    fn builtin(id: &str, name: &str, rarity: Rarity, pts: u32, hint: &str, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            rarity,
            pts,
            hint: hint.to_string(),
            color: color.to_string(),
            art_url: None,
            reference_url: None,
        }
    }

    /// Path of the bundled reference image, e.g. `/stickers/dead-eye.jpg`.
    pub fn reference_path(&self) -> String {
        let slug: String = self
            .name
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        format!("/stickers/{}.jpg", slug)
    }
}

/// Stickers shown before the store responds, and whenever it can't.
pub fn default_catalog() -> Vec<Sticker> {
    vec![
        Sticker::builtin("s1", "Dead Eye", Rarity::Common, 10, "Near a red wall", "#FF4444"),
        Sticker::builtin("s2", "Neon Reaper", Rarity::Rare, 20, "Dark alley wall", "#C6FF00"),
        Sticker::builtin("s3", "Grin", Rarity::Common, 10, "Bus stop or bench", "#ffffff"),
        Sticker::builtin("s4", "Void King", Rarity::Epic, 35, "Underground spot", "#8B5CF6"),
        Sticker::builtin("s5", "Rust Face", Rarity::Rare, 20, "Industrial area", "#FF8C00"),
        Sticker::builtin("s6", "Ghost Tag", Rarity::Common, 10, "Stairwell or corner", "#88ccff"),
        Sticker::builtin(
            "s7",
            "Gold Tooth",
            Rarity::Legendary,
            50,
            "Only 3 exist in Jakarta",
            "#FFD700",
        ),
        Sticker::builtin("s8", "Static", Rarity::Epic, 35, "Near electronics shops", "#00FFCC"),
    ]
}
