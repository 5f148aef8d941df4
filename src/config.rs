// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Without a row store URL and anon key the client runs in demo mode:
//! everything stays local and verdicts are simulated.

use std::env;
use std::path::PathBuf;

/// Default model used for visual comparison.
pub const DEFAULT_VISION_MODEL: &str = "claude-sonnet-4-5";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Row store ---
    /// Base URL of the row store (empty in demo mode)
    pub supabase_url: String,
    /// Public anon key sent as `apikey` (empty in demo mode)
    pub supabase_anon_key: String,

    // --- Validation service ---
    /// Model API key, only read by the server
    pub anthropic_api_key: String,
    /// Messages endpoint of the model API
    pub vision_api_url: String,
    pub vision_model: String,
    /// Public origin serving the reference images
    pub app_url: String,
    /// Endpoint the game client posts photos to
    pub validate_url: String,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Client ---
    /// Directory backing local storage (session + offline cache)
    pub data_dir: PathBuf,
    /// Simulated validation delay in demo mode
    pub demo_latency_ms: u64,
    /// City label attached to new drops
    pub home_city: String,
    /// Center new drops are placed around (lat, lng)
    pub home_center: (f64, f64),
}

impl Config {
    /// Config for tests: demo mode, no delays, data in the temp dir.
    pub fn test_default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            anthropic_api_key: "test_model_key".to_string(),
            vision_api_url: "http://127.0.0.1:9/v1/messages".to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            app_url: "http://127.0.0.1:9".to_string(),
            validate_url: "http://127.0.0.1:9/api/validate".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            data_dir: env::temp_dir().join("street-hunt-test"),
            demo_latency_ms: 0,
            home_city: "Jakarta, ID".to_string(),
            home_center: (-6.2088, 106.8456),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let app_url = env::var("APP_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_APP_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let validate_url =
            env::var("VALIDATE_URL").unwrap_or_else(|_| format!("{}/api/validate", app_url));

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),
            supabase_anon_key: env::var("SUPABASE_ANON")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ANTHROPIC_API_KEY"))?,
            vision_api_url: env::var("VISION_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            vision_model: env::var("VISION_MODEL")
                .unwrap_or_else(|_| DEFAULT_VISION_MODEL.to_string()),
            app_url,
            validate_url,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".street-hunt")),
            demo_latency_ms: env::var("DEMO_LATENCY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2200),
            home_city: env::var("HOME_CITY").unwrap_or_else(|_| "Jakarta, ID".to_string()),
            home_center: parse_center(env::var("HOME_CENTER").ok().as_deref())?
                .unwrap_or((-6.2088, 106.8456)),
        })
    }

    /// Demo mode: no row store configured.
    pub fn is_demo(&self) -> bool {
        self.supabase_url.is_empty() || self.supabase_anon_key.is_empty()
    }
}

/// Parse `"lat,lng"`.
fn parse_center(raw: Option<&str>) -> Result<Option<(f64, f64)>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let invalid = || ConfigError::Invalid("HOME_CENTER", raw.to_string());
    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    Ok(Some((lat, lng)))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
