// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client side of photo validation.
//!
//! Posts the captured photo to the validation service, which holds the model
//! key. Any failure turns into a rejected verdict so the caller always has
//! something to show. In demo mode verdicts are simulated locally.

use crate::config::Config;
use crate::models::{Sticker, ValidateRequest, Verdict};
use rand::Rng;
use std::time::Duration;

#[derive(Clone)]
enum Mode {
    Remote {
        http: reqwest::Client,
        endpoint: String,
    },
    Demo {
        latency: Duration,
    },
}

/// Sends photos for a verdict.
#[derive(Clone)]
pub struct ValidationClient {
    mode: Mode,
}

impl ValidationClient {
    /// Client posting to the validation service at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            mode: Mode::Remote {
                http: reqwest::Client::new(),
                endpoint: endpoint.into(),
            },
        }
    }

    /// Client that simulates verdicts after `latency`.
    pub fn demo(latency: Duration) -> Self {
        Self {
            mode: Mode::Demo { latency },
        }
    }

    pub fn from_config(config: &Config) -> Self {
        if config.is_demo() {
            Self::demo(Duration::from_millis(config.demo_latency_ms))
        } else {
            Self::new(config.validate_url.clone())
        }
    }

    /// Ask whether `photo_base64` shows `sticker`.
    pub async fn validate(&self, photo_base64: &str, sticker: &Sticker) -> Verdict {
        match &self.mode {
            Mode::Demo { latency } => {
                tokio::time::sleep(*latency).await;
                simulate(sticker)
            }
            Mode::Remote { http, endpoint } => {
                let request = ValidateRequest {
                    user_photo_base64: photo_base64.to_string(),
                    reference_id: sticker.id.clone(),
                    sticker_name: sticker.name.clone(),
                };

                let response = match http.post(endpoint).json(&request).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, sticker = %sticker.id, "Validation request failed");
                        return Verdict::server_error();
                    }
                };

                if !response.status().is_success() {
                    tracing::warn!(
                        status = %response.status(),
                        sticker = %sticker.id,
                        "Validation service returned an error"
                    );
                    return Verdict::server_error();
                }

                response.json::<Verdict>().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Unreadable verdict");
                    Verdict::server_error()
                })
            }
        }
    }
}

/// Demo verdict: valid 70% of the time.
fn simulate(sticker: &Sticker) -> Verdict {
    let mut rng = rand::thread_rng();
    if rng.gen_bool(0.7) {
        Verdict {
            valid: true,
            confidence: rng.gen_range(75..100),
            reason: format!("{} confirmed.", sticker.name),
        }
    } else {
        Verdict {
            valid: false,
            confidence: rng.gen_range(20..60),
            reason: "Photo doesn't match the sticker.".to_string(),
        }
    }
}
