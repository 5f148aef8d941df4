// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Photo validation endpoint tests against a stubbed model API.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use street_hunt::config::Config;
use street_hunt::models::default_catalog;
use street_hunt::routes::create_router;
use street_hunt::routes::validate::MAX_BODY_BYTES;
use street_hunt::services::{Catalog, VisionService};
use street_hunt::AppState;
use tower::ServiceExt;

mod common;

type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

struct ModelStub {
    url: String,
    calls: Captured,
    /// GETs of the s1 reference image
    reference_hits: Arc<AtomicUsize>,
}

/// Model API stub answering every call with `reply` as the text block.
async fn model_stub(reply: &'static str, status: StatusCode) -> ModelStub {
    let calls: Captured = Arc::new(Mutex::new(Vec::new()));
    let reference_hits = Arc::new(AtomicUsize::new(0));
    let sink = calls.clone();
    let hits = reference_hits.clone();

    let router = Router::new()
        .route(
            "/v1/messages",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push((headers, body));
                    (
                        status,
                        Json(json!({ "content": [{ "type": "text", "text": reply }] })),
                    )
                }
            }),
        )
        .route(
            "/stickers/dead-eye.jpg",
            get(move || {
                hits.fetch_add(1, Ordering::SeqCst);
                async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, 0x50, 0x4e]) }
            }),
        );

    ModelStub {
        url: common::spawn_stub(router).await,
        calls,
        reference_hits,
    }
}

fn config_for(stub: &str) -> Config {
    let mut config = Config::test_default();
    config.vision_api_url = format!("{}/v1/messages", stub);
    config.app_url = stub.to_string();
    config
}

fn validate_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/validate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn test_missing_fields() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(validate_request(json!({ "referenceId": "s1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["details"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn test_unknown_reference() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "AAAA",
            "referenceId": "s99",
            "stickerName": "Nobody"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["details"], "Unknown sticker reference");
}

#[tokio::test]
async fn test_verdict_with_reference_image() {
    let stub = model_stub(
        "Sure! {\"valid\": true, \"confidence\": 91, \"reason\": \"Same red eye.\"} Done.",
        StatusCode::OK,
    )
    .await;
    let (app, _) = common::create_test_app_with(config_for(&stub.url));

    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "valid": true, "confidence": 91, "reason": "Same red eye." })
    );

    let calls = stub.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (headers, request) = &calls[0];
    assert_eq!(headers["x-api-key"], "test_model_key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(request["max_tokens"], 200);

    // Reference image first, then the user's photo
    let content = request["messages"][0]["content"].as_array().unwrap();
    let images: Vec<&Value> = content.iter().filter(|b| b["type"] == "image").collect();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["source"]["media_type"], "image/png");
    assert_eq!(images[0]["source"]["data"], "iVBO");
    assert_eq!(images[1]["source"]["data"], "UEhPVE8=");
}

#[tokio::test]
async fn test_missing_reference_falls_back_to_description() {
    let stub = model_stub(
        "{\"valid\": false, \"confidence\": 12, \"reason\": \"That's a selfie.\"}",
        StatusCode::OK,
    )
    .await;
    let (app, _) = common::create_test_app_with(config_for(&stub.url));

    // The stub only serves the s1 reference image
    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s3",
            "stickerName": "Grin"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["confidence"], 12);

    let calls = stub.calls.lock().unwrap();
    let content = calls[0].1["messages"][0]["content"].as_array().unwrap();
    let images = content.iter().filter(|b| b["type"] == "image").count();
    assert_eq!(images, 1);
    assert!(content[0]["text"].as_str().unwrap().contains("\"Grin\""));
}

#[tokio::test]
async fn test_model_reply_without_json() {
    let stub = model_stub("I can't tell.", StatusCode::OK).await;
    let (app, _) = common::create_test_app_with(config_for(&stub.url));

    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "valid": false, "confidence": 0, "reason": "Could not analyze photo." })
    );
}

#[tokio::test]
async fn test_model_failure_is_server_error() {
    let stub = model_stub("overloaded", StatusCode::SERVICE_UNAVAILABLE).await;
    let (app, _) = common::create_test_app_with(config_for(&stub.url));

    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_failed");
    assert_eq!(body["reason"], "Server error. Please try again.");
}

#[tokio::test]
async fn test_unreachable_model_is_server_error() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_cors_preflight_from_frontend() {
    let (app, state) = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/validate")
                .header(header::ORIGIN, state.config.frontend_url.as_str())
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        state.config.frontend_url.as_str()
    );
}

#[tokio::test]
async fn test_cors_rejects_foreign_origin() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/validate")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/validate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"userPhotoBase64\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["details"], "Missing userPhotoBase64 or referenceId");
}

#[tokio::test]
async fn test_body_without_content_type_is_bad_request() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/validate")
                .body(Body::from(
                    json!({ "userPhotoBase64": "AAAA", "referenceId": "s1" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_wrong_field_type_is_bad_request() {
    let (app, _) = common::create_test_app();
    let response = app
        .oneshot(validate_request(json!({ "userPhotoBase64": 42, "referenceId": "s1" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn test_oversize_body_is_rejected() {
    let (app, _) = common::create_test_app();
    let photo = "A".repeat(MAX_BODY_BYTES + 1);
    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": photo,
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["error"], "payload_too_large");
}

#[tokio::test]
async fn test_reference_image_fetched_once() {
    let stub = model_stub(
        "{\"valid\": true, \"confidence\": 80, \"reason\": \"Match.\"}",
        StatusCode::OK,
    )
    .await;
    let (app, _) = common::create_test_app_with(config_for(&stub.url));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(validate_request(json!({
                "userPhotoBase64": "UEhPVE8=",
                "referenceId": "s1",
                "stickerName": "Dead Eye"
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(stub.calls.lock().unwrap().len(), 2);
    assert_eq!(stub.reference_hits.load(Ordering::SeqCst), 1);

    // The cached copy still goes out with the second call
    let calls = stub.calls.lock().unwrap();
    let content = calls[1].1["messages"][0]["content"].as_array().unwrap();
    assert_eq!(content[1]["source"]["data"], "iVBO");
}

#[tokio::test]
async fn test_store_catalog_drives_references() {
    let stub = model_stub(
        "{\"valid\": true, \"confidence\": 70, \"reason\": \"Looks right.\"}",
        StatusCode::OK,
    )
    .await;

    // Only a store-provided sticker whose reference lives at an absolute URL
    let mut moon_cat = default_catalog().remove(1);
    moon_cat.id = "x1".to_string();
    moon_cat.name = "Moon Cat".to_string();
    moon_cat.reference_url = Some(format!("{}/stickers/dead-eye.jpg", stub.url));
    let catalog = Catalog::new(vec![moon_cat]);

    let mut config = config_for(&stub.url);
    config.app_url = "http://127.0.0.1:9".to_string();
    let vision = VisionService::new(&config).with_catalog(&catalog);
    let app = create_router(Arc::new(AppState { config, vision }));

    let response = app
        .clone()
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "x1",
            "stickerName": "Moon Cat"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.reference_hits.load(Ordering::SeqCst), 1);

    // Built-in ids are unknown once the store catalog is in place
    let response = app
        .oneshot(validate_request(json!({
            "userPhotoBase64": "UEhPVE8=",
            "referenceId": "s1",
            "stickerName": "Dead Eye"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
