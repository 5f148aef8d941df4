// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side verdicts from a multimodal model.
//!
//! Handles:
//! - Reference image lookup and fetch (cached per sticker once fetched)
//! - Prompt construction, with or without a reference image
//! - Verdict extraction from free-form model text

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ValidateRequest, Verdict};
use crate::services::Catalog;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

const MAX_TOKENS: u32 = 200;
const API_VERSION: &str = "2023-06-01";

const VERDICT_FORMAT: &str = r#"Respond with JSON only, no other text:
{
  "valid": true or false,
  "confidence": 0-100,
  "reason": "one sentence explanation"
}"#;

/// A fetched reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub media_type: String,
    pub data_base64: String,
}

/// Multimodal model client.
#[derive(Clone)]
pub struct VisionService {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    app_url: String,
    /// Sticker id -> reference image path (or absolute URL)
    references: HashMap<String, String>,
    cache: Arc<DashMap<String, ReferenceImage>>,
}

impl VisionService {
    /// Service knowing the built-in stickers.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.vision_api_url.clone(),
            api_key: config.anthropic_api_key.clone(),
            model: config.vision_model.clone(),
            app_url: config.app_url.trim_end_matches('/').to_string(),
            references: HashMap::new(),
            cache: Arc::new(DashMap::new()),
        }
        .with_catalog(&Catalog::default())
    }

    /// Validate against `catalog` instead. Store-provided reference URLs
    /// win over bundled paths; previously fetched images are dropped.
    pub fn with_catalog(mut self, catalog: &Catalog) -> Self {
        self.references = catalog
            .stickers()
            .iter()
            .filter_map(|s| catalog.reference_for(&s.id).map(|r| (s.id.clone(), r)))
            .collect();
        self.cache.clear();
        self
    }

    pub fn knows_reference(&self, sticker_id: &str) -> bool {
        self.references.contains_key(sticker_id)
    }

    fn reference_url(&self, sticker_id: &str) -> Option<String> {
        let path = self.references.get(sticker_id)?;
        if path.starts_with("http://") || path.starts_with("https://") {
            Some(path.clone())
        } else {
            Some(format!("{}{}", self.app_url, path))
        }
    }

    /// Fetch a sticker's reference image. `None` when it isn't available;
    /// the caller then falls back to a description-only check.
    pub async fn fetch_reference(&self, sticker_id: &str) -> Option<ReferenceImage> {
        if let Some(cached) = self.cache.get(sticker_id) {
            return Some(cached.clone());
        }

        let url = self.reference_url(sticker_id)?;
        let response = match self.http.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(sticker_id, status = %r.status(), "Reference image unavailable");
                return None;
            }
            Err(e) => {
                tracing::warn!(sticker_id, error = %e, "Reference image fetch failed");
                return None;
            }
        };

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(sticker_id, error = %e, "Failed to read reference image");
                return None;
            }
        };

        let image = ReferenceImage {
            media_type,
            data_base64: STANDARD.encode(&bytes),
        };
        self.cache.insert(sticker_id.to_string(), image.clone());
        tracing::debug!(sticker_id, size = bytes.len(), "Reference image cached");
        Some(image)
    }

    /// Ask the model whether the photo matches the requested sticker.
    pub async fn judge(&self, request: &ValidateRequest) -> Result<Verdict, AppError> {
        let reference = self.fetch_reference(&request.reference_id).await;
        let messages = build_messages(
            &request.user_photo_base64,
            &request.sticker_name,
            reference.as_ref(),
        );

        tracing::info!(
            sticker_id = %request.reference_id,
            with_reference = reference.is_some(),
            "Requesting verdict"
        );

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "messages": messages,
            }))
            .send()
            .await
            .map_err(|e| AppError::ModelApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelApi(format!("HTTP {}: {}", status, body)));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::ModelApi(format!("Failed to parse response: {}", e)))?;

        let text = body
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();

        let verdict = parse_verdict(&text)?;
        tracing::info!(
            sticker_id = %request.reference_id,
            valid = verdict.valid,
            confidence = verdict.confidence,
            "Verdict received"
        );
        Ok(verdict)
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

fn image_block(media_type: &str, data: &str) -> Value {
    json!({
        "type": "image",
        "source": { "type": "base64", "media_type": media_type, "data": data }
    })
}

fn text_block(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

/// Single user turn: a side-by-side comparison when the reference image is
/// known, otherwise a "does this look like a real sticker" check.
pub fn build_messages(
    photo_base64: &str,
    sticker_name: &str,
    reference: Option<&ReferenceImage>,
) -> Value {
    let content = match reference {
        Some(reference) => vec![
            text_block(
                "You are validating a street art sticker hunt.\n\n\
                 Reference sticker image (what the sticker looks like):",
            ),
            image_block(&reference.media_type, &reference.data_base64),
            text_block("User's photo (what they photographed in the real world):"),
            image_block("image/jpeg", photo_base64),
            text_block(&format!(
                "Does the user's photo show the same sticker as the reference image?\n\n\
                 Rules:\n\
                 - The sticker may appear at different angles, sizes, or lighting conditions\n\
                 - It may be partially obscured or weathered, that's fine\n\
                 - The key artwork and shapes should match\n\
                 - Ignore background differences (wall color, surroundings)\n\
                 - A clear, deliberate photo of the same sticker design = valid\n\n{}",
                VERDICT_FORMAT
            )),
        ],
        None => vec![
            text_block(&format!(
                "You are validating a street art sticker hunt for a sticker called \"{}\".\n\n\
                 The user claims to have found and photographed this sticker in the real world.",
                sticker_name
            )),
            image_block("image/jpeg", photo_base64),
            text_block(&format!(
                "Does this photo clearly show a street art sticker or graffiti tag?\n\n\
                 Rules:\n\
                 - Must be a real photo (not a screenshot of the app)\n\
                 - Must show some kind of sticker, tag, or street art\n\
                 - Must be in focus enough to identify it\n\
                 - Selfies or unrelated photos = invalid\n\n{}",
                VERDICT_FORMAT
            )),
        ],
    };

    json!([{ "role": "user", "content": content }])
}

/// Pull a verdict out of model text.
///
/// Takes the span from the first `{` to the last `}`. No span means the
/// photo couldn't be analyzed; a span that isn't JSON is an error.
pub fn parse_verdict(text: &str) -> Result<Verdict, AppError> {
    let span = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => return Ok(Verdict::rejected("Could not analyze photo.")),
    };

    let raw: Value = serde_json::from_str(span)
        .map_err(|e| AppError::ModelApi(format!("Malformed verdict JSON: {}", e)))?;

    Ok(Verdict {
        valid: truthy(raw.get("valid")),
        confidence: confidence(raw.get("confidence")),
        reason: match raw.get("reason") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
    })
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn confidence(value: Option<&Value>) -> u8 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if n.is_nan() {
        return 0;
    }
    n.clamp(0.0, 100.0).round() as u8
}
