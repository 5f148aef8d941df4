// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Row store client with typed operations.
//!
//! Thin wrapper over the PostgREST and storage endpoints:
//! - Generic `select` / `insert` / `upsert` / `update` on any table
//! - Avatar upload to object storage
//! - Magic-link auth endpoints
//! - Typed helpers for users, drops, stickers and the leaderboard
//!
//! One request per call: no retries, no batching. A client built without
//! credentials runs in demo mode, where typed reads come back empty and
//! writes are dropped.

use crate::db::{tables, AVATAR_BUCKET};
use crate::error::{AppError, Result};
use crate::models::{
    Drop, DropRow, Leaderboard, LeaderboardEntry, NewDropRow, Session, Sticker, UserProfile,
};
use crate::time_utils::now_rfc3339;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

const PREFER_RETURN: &str = "return=representation";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=representation";
const STICKER_COLUMNS: &str = "id,name,rarity,pts,hint,color,art_url,reference_url";

/// Row store client.
#[derive(Clone)]
pub struct SupabaseDb {
    remote: Option<Remote>,
    access_token: Option<String>,
}

#[derive(Clone)]
struct Remote {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseDb {
    /// Create a client for a project URL and anon key.
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            remote: Some(Remote {
                http: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                anon_key: anon_key.to_string(),
            }),
            access_token: None,
        }
    }

    /// Create a client with no backend (demo mode).
    pub fn new_demo() -> Self {
        Self {
            remote: None,
            access_token: None,
        }
    }

    /// Build from config, falling back to demo mode when unconfigured.
    pub fn from_config(config: &crate::config::Config) -> Self {
        if config.is_demo() {
            tracing::info!("Row store not configured, running in demo mode");
            Self::new_demo()
        } else {
            Self::new(&config.supabase_url, &config.supabase_anon_key)
        }
    }

    pub fn is_demo(&self) -> bool {
        self.remote.is_none()
    }

    /// Set (or clear) the user access token sent as bearer auth.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    /// Helper to get the remote or return an error in demo mode.
    fn remote(&self) -> Result<&Remote> {
        self.remote.as_ref().ok_or(AppError::DemoMode)
    }

    fn rest_url(remote: &Remote, table: &str) -> String {
        format!("{}/rest/v1/{}", remote.base_url, table)
    }

    fn authed(&self, remote: &Remote, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("apikey", &remote.anon_key);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    // ─── Generic Table Operations ────────────────────────────────

    /// `GET /rest/v1/{table}?select={columns}&{filters}`
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &str,
    ) -> Result<Vec<T>> {
        let remote = self.remote()?;
        let mut url = format!("{}?select={}", Self::rest_url(remote, table), columns);
        if !filters.is_empty() {
            url.push('&');
            url.push_str(filters);
        }

        let response = self
            .authed(remote, remote.http.get(&url))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response_json(response).await
    }

    /// Insert one row or many. A single object is wrapped into an array.
    pub async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>> {
        let remote = self.remote()?;
        let body = match serde_json::to_value(body)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode row: {}", e)))?
        {
            rows @ Value::Array(_) => rows,
            row => Value::Array(vec![row]),
        };

        let response = self
            .authed(remote, remote.http.post(Self::rest_url(remote, table)))
            .header("Prefer", PREFER_RETURN)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response_json(response).await
    }

    /// Insert or merge on primary key conflict.
    pub async fn upsert<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>> {
        let remote = self.remote()?;
        let response = self
            .authed(remote, remote.http.post(Self::rest_url(remote, table)))
            .header("Prefer", PREFER_MERGE)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response_json(response).await
    }

    /// `PATCH /rest/v1/{table}?{filters}`
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        filters: &str,
    ) -> Result<Vec<T>> {
        let remote = self.remote()?;
        let url = format!("{}?{}", Self::rest_url(remote, table), filters);
        let response = self
            .authed(remote, remote.http.patch(&url))
            .header("Prefer", PREFER_RETURN)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response_json(response).await
    }

    // ─── Storage ─────────────────────────────────────────────────

    /// Upload an avatar, overwriting any previous one. Returns its public URL.
    pub async fn upload_avatar(
        &self,
        user_id: &str,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let remote = self.remote()?;
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
            .unwrap_or("jpg");
        let path = format!("{}/avatar.{}", urlencoding::encode(user_id), ext);
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            remote.base_url, AVATAR_BUCKET, path
        );
        let bearer = self.access_token.as_deref().unwrap_or(&remote.anon_key);

        let response = remote
            .http
            .post(&url)
            .header("apikey", &remote.anon_key)
            .bearer_auth(bearer)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Database(format!("Avatar upload failed: {}", e)))?;

        check_response(response).await?;

        let public_url = format!(
            "{}/storage/v1/object/public/{}/{}",
            remote.base_url, AVATAR_BUCKET, path
        );
        tracing::info!(user_id, url = %public_url, "Avatar uploaded");
        Ok(public_url)
    }

    // ─── Auth ────────────────────────────────────────────────────

    /// Ask the auth service to email a one-time sign-in link.
    pub async fn send_magic_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        let remote = self.remote()?;
        let response = remote
            .http
            .post(format!("{}/auth/v1/otp", remote.base_url))
            .header("apikey", &remote.anon_key)
            .json(&json!({
                "email": email,
                "options": { "emailRedirectTo": redirect_to }
            }))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        check_response(response).await
    }

    /// Exchange a magic-link token for a session.
    pub async fn exchange_token(&self, token: &str) -> Result<Session> {
        let remote = self.remote()?;
        let response = remote
            .http
            .post(format!(
                "{}/auth/v1/token?grant_type=magiclink",
                remote.base_url
            ))
            .header("apikey", &remote.anon_key)
            .json(&json!({ "token": token }))
            .send()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if response.status().is_client_error() {
            return Err(AppError::InvalidToken);
        }
        check_response_json(response).await
    }

    // ─── Users ───────────────────────────────────────────────────

    /// Get a profile by user id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>> {
        if self.is_demo() {
            return Ok(None);
        }
        let rows: Vec<UserProfile> = self
            .select(tables::USERS, "*", &eq_filter("user_id", user_id))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Create or replace a full profile.
    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let mut row = serde_json::to_value(profile)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode profile: {}", e)))?;
        if let Value::Object(map) = &mut row {
            map.insert("updated_at".to_string(), Value::String(now_rfc3339()));
        }
        self.save_user_row(row).await
    }

    /// Write only the progress columns of a profile.
    pub async fn upsert_progress(&self, profile: &UserProfile) -> Result<()> {
        self.save_user_row(json!({
            "user_id": profile.user_id,
            "total_score": profile.total_score,
            "finds": profile.finds,
            "discovered": profile.discovered,
            "updated_at": now_rfc3339(),
        }))
        .await
    }

    async fn save_user_row(&self, row: Value) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        let _: Vec<Value> = self.upsert(tables::USERS, &row).await?;
        Ok(())
    }

    // ─── Drops ───────────────────────────────────────────────────

    /// Record a find.
    pub async fn insert_drop(&self, user_id: &str, drop: &Drop) -> Result<()> {
        if self.is_demo() {
            return Ok(());
        }
        let _: Vec<Value> = self
            .insert(tables::DROPS, &NewDropRow::new(user_id, drop))
            .await?;
        Ok(())
    }

    /// A user's drops, newest first.
    pub async fn list_drops(&self, user_id: &str) -> Result<Vec<Drop>> {
        if self.is_demo() {
            return Ok(Vec::new());
        }
        let filters = format!("{}&order=created_at.desc", eq_filter("user_id", user_id));
        let rows: Vec<DropRow> = self.select(tables::DROPS, "*", &filters).await?;
        Ok(rows.into_iter().map(Drop::from).collect())
    }

    /// Most recent drops from all players, newest first.
    pub async fn recent_drops(&self, limit: u32) -> Result<Vec<DropRow>> {
        if self.is_demo() {
            return Ok(Vec::new());
        }
        self.select(
            tables::DROPS,
            "*",
            &format!("order=created_at.desc&limit={}", limit),
        )
        .await
    }

    // ─── Catalog & Leaderboard ───────────────────────────────────

    /// Active stickers ordered by id.
    pub async fn active_stickers(&self) -> Result<Vec<Sticker>> {
        self.select(tables::STICKERS, STICKER_COLUMNS, "active=eq.true&order=id")
            .await
    }

    /// Top players by total score.
    pub async fn leaderboard(&self, limit: u32) -> Result<Leaderboard> {
        if self.is_demo() {
            return Ok(Leaderboard::default());
        }
        let entries: Vec<LeaderboardEntry> = self
            .select(
                tables::USERS,
                "username,total_score,avatar_id",
                &format!("order=total_score.desc&limit={}", limit),
            )
            .await?;
        Ok(Leaderboard::new(entries))
    }
}

/// PostgREST equality filter with an encoded value.
fn eq_filter(column: &str, value: &str) -> String {
    format!("{}=eq.{}", column, urlencoding::encode(value))
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Database(format!("HTTP {}: {}", status, body)))
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Database(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Database(format!("Failed to parse response: {}", e)))
}
