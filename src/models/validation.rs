// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Photo validation request and verdict.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Reason reported whenever the validation service can't produce a verdict.
pub const SERVER_ERROR_REASON: &str = "Server error. Please try again.";

/// Body of `POST /api/validate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ValidateRequest {
    /// JPEG photo, base64 without the data URL prefix
    #[serde(default)]
    pub user_photo_base64: String,
    #[serde(default)]
    pub reference_id: String,
    #[serde(default)]
    pub sticker_name: String,
}

/// Whether a photo shows the target sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Verdict {
    pub valid: bool,
    /// 0-100
    pub confidence: u8,
    pub reason: String,
}

impl Verdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            confidence: 0,
            reason: reason.into(),
        }
    }

    pub fn server_error() -> Self {
        Self::rejected(SERVER_ERROR_REASON)
    }
}
