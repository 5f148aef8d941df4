// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Points awarded for a find.

use crate::models::Sticker;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Bonus for the player's very first find.
pub const FIRST_FIND_BONUS: u32 = 50;
/// Bonus for the first drop of a sticker in the local view.
pub const PIONEER_BONUS: u32 = 15;

/// One line of the score breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScoreLine {
    pub label: String,
    pub pts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Score {
    pub total: u32,
    pub breakdown: Vec<ScoreLine>,
}

/// Score a find: base + first-find + pioneer + rarity bonus.
pub fn calc_score(sticker: &Sticker, is_first: bool, is_pioneer: bool) -> Score {
    let mut breakdown = vec![ScoreLine {
        label: "Base find".to_string(),
        pts: sticker.pts,
    }];

    if is_first {
        breakdown.push(ScoreLine {
            label: "First find ever".to_string(),
            pts: FIRST_FIND_BONUS,
        });
    }
    if is_pioneer {
        breakdown.push(ScoreLine {
            label: "Pioneer drop".to_string(),
            pts: PIONEER_BONUS,
        });
    }
    let rarity_bonus = sticker.rarity.bonus();
    if rarity_bonus > 0 {
        breakdown.push(ScoreLine {
            label: sticker.rarity.to_string(),
            pts: rarity_bonus,
        });
    }

    Score {
        total: breakdown
            .iter()
            .fold(0u32, |total, line| total.saturating_add(line.pts)),
        breakdown,
    }
}
