// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Photo validation endpoint. The model key never leaves the server.

use crate::error::{AppError, Result};
use crate::models::{ValidateRequest, Verdict};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Base64 photos are large; allow up to 10 MB bodies.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const MISSING_FIELDS: &str = "Missing userPhotoBase64 or referenceId";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/validate",
        post(validate)
            .fallback(method_not_allowed)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
    )
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Bodies that aren't a JSON object read as missing fields.
fn reject_body(rejection: JsonRejection) -> AppError {
    tracing::debug!(error = %rejection, "Unreadable validate body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(MISSING_FIELDS.to_string())
    }
}

/// Judge whether a photo shows the requested sticker.
async fn validate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<Verdict>> {
    let Json(request) = payload.map_err(reject_body)?;
    if request.user_photo_base64.is_empty() || request.reference_id.is_empty() {
        return Err(AppError::BadRequest(MISSING_FIELDS.to_string()));
    }

    if !state.vision.knows_reference(&request.reference_id) {
        return Err(AppError::BadRequest("Unknown sticker reference".to_string()));
    }

    tracing::debug!(
        sticker_id = %request.reference_id,
        photo_len = request.user_photo_base64.len(),
        "Validating photo"
    );

    let verdict = state.vision.judge(&request).await?;
    Ok(Json(verdict))
}
