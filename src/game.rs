// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Game session: screen routing and the find flow.
//!
//! A `GameSession` owns everything that lives for one signed-in player:
//! the current screen, the profile, the drops shown on the map and the
//! last find. Every state change is mirrored into the offline cache first
//! and pushed to the row store best-effort afterwards, so a flaky network
//! never loses progress.

use crate::config::Config;
use crate::db::SupabaseDb;
use crate::error::{AppError, Result};
use crate::models::{
    Avatar, AvatarChoice, Drop, Leaderboard, LeaderboardEntry, ProfileSetup, Session, Sticker,
    UserProfile,
};
use crate::models::drop::JUST_NOW_LABEL;
use crate::services::map::{drops_geojson, focus, jitter_around, DROP_SPREAD_DEG};
use crate::services::{
    calc_score, load_catalog, AuthService, Catalog, LinkStatus, Score, ValidationClient,
};
use crate::store::{CachedState, LocalStore, OfflineCache};
use crate::time_utils::now_millis;
use base64::{engine::general_purpose::STANDARD, Engine};
use geo::Point;
use geojson::FeatureCollection;
use serde::Serialize;
use validator::Validate;

/// Rows requested for the leaderboard.
pub const LEADERBOARD_SIZE: u32 = 10;
/// Other players' drops pulled in for the shared map.
pub const SHARED_DROPS_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Auth,
    Dashboard,
    FindSticker,
    Camera,
    Validating,
    Failed,
    Map,
    Profile,
}

/// Outcome of the most recent accepted find.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindResult {
    pub sticker_id: String,
    pub score: Score,
    pub is_pioneer: bool,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub total_score: u32,
    pub finds: u32,
    pub discovered: usize,
    pub catalog_size: usize,
    pub own_drops: usize,
}

pub struct GameSession {
    db: SupabaseDb,
    auth: AuthService,
    cache: OfflineCache,
    validator: ValidationClient,
    catalog: Catalog,
    home_city: String,
    home_center: Point<f64>,

    screen: Screen,
    profile: Option<UserProfile>,
    drops: Vec<Drop>,
    selected: Option<String>,
    last_result: Option<FindResult>,
    fail_reason: Option<String>,
    pending_session: Option<Session>,
}

impl GameSession {
    pub fn new(config: &Config, store: LocalStore) -> Self {
        let db = SupabaseDb::from_config(config);
        let (lat, lng) = config.home_center;
        Self {
            auth: AuthService::new(db.clone(), store.clone(), config.frontend_url.clone()),
            cache: OfflineCache::new(store),
            validator: ValidationClient::from_config(config),
            catalog: Catalog::default(),
            home_city: config.home_city.clone(),
            home_center: Point::new(lng, lat),
            db,
            screen: Screen::Auth,
            profile: None,
            drops: Vec::new(),
            selected: None,
            last_result: None,
            fail_reason: None,
            pending_session: None,
        }
    }

    /// Session backed by the on-disk store in `config.data_dir`.
    pub fn open(config: &Config) -> Result<Self> {
        let store = LocalStore::open(&config.data_dir)?;
        Ok(Self::new(config, store))
    }

    // ─── Accessors ───────────────────────────────────────────────

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn drops(&self) -> &[Drop] {
        &self.drops
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selected_sticker(&self) -> Option<&Sticker> {
        self.selected.as_deref().and_then(|id| self.catalog.get(id))
    }

    pub fn last_result(&self) -> Option<&FindResult> {
        self.last_result.as_ref()
    }

    pub fn fail_reason(&self) -> Option<&str> {
        self.fail_reason.as_deref()
    }

    pub fn is_demo(&self) -> bool {
        self.db.is_demo()
    }

    /// True once a session exists but the player still has to pick a name.
    pub fn needs_profile(&self) -> bool {
        self.screen == Screen::Auth && self.pending_session.is_some()
    }

    // ─── Startup & Auth ──────────────────────────────────────────

    /// Boot the session.
    ///
    /// Order: redirect fragment (fresh sign-in), then the offline cache,
    /// then the remote catalog. A cached player is then refreshed from the
    /// row store; if that fails the cached view stays.
    pub async fn start(&mut self, redirect_fragment: Option<&str>) -> Result<()> {
        if let Some(stored) = self.auth.session() {
            self.db.set_access_token(Some(stored.access_token));
        }

        let fresh = match redirect_fragment {
            Some(fragment) => self.auth.complete_from_redirect(fragment).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring unreadable sign-in redirect");
                None
            }),
            None => None,
        };
        let restored = fresh.is_none() && self.restore_from_cache();

        self.catalog.replace(load_catalog(&self.db).await);

        if let Some(session) = fresh {
            self.load_user_after_auth(session).await?;
        } else if restored && !self.db.is_demo() {
            if let Err(e) = self.sync_from_remote().await {
                tracing::warn!(error = %e, "Sync failed, using cached profile");
            }
        }

        tracing::info!(screen = ?self.screen, demo = self.db.is_demo(), "Session started");
        Ok(())
    }

    /// Load the profile from the offline cache. Returns whether one was found.
    pub fn restore_from_cache(&mut self) -> bool {
        let state = self.cache.read_state();
        let Some(profile) = state.profile() else {
            return false;
        };

        self.drops = state
            .own_drops
            .into_iter()
            .map(|mut drop| {
                drop.is_own = true;
                drop
            })
            .collect();
        tracing::debug!(user_id = %profile.user_id, drops = self.drops.len(), "Restored cached profile");
        self.profile = Some(profile);
        self.screen = Screen::Dashboard;
        true
    }

    /// Route a freshly authenticated player: known players go to the
    /// dashboard, new ones stay on the auth screen for profile setup.
    pub async fn load_user_after_auth(&mut self, session: Session) -> Result<()> {
        self.db.set_access_token(Some(session.access_token.clone()));
        let Some(user_id) = session.user_id().map(str::to_string) else {
            tracing::warn!("Session has no user id");
            self.screen = Screen::Auth;
            return Ok(());
        };

        let remote = self.db.get_user(&user_id).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, user_id = %user_id, "Failed to load profile");
            None
        });

        match remote {
            Some(profile) => {
                let own_drops = self.db.list_drops(&user_id).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to load drops");
                    Vec::new()
                });
                self.apply_remote(profile, own_drops).await;
                self.pending_session = None;
                self.screen = Screen::Dashboard;
            }
            None => {
                tracing::info!(user_id = %user_id, "New player, profile setup required");
                self.pending_session = Some(session);
                self.screen = Screen::Auth;
            }
        }
        Ok(())
    }

    /// Refresh the loaded profile and drops from the row store.
    pub async fn sync_from_remote(&mut self) -> Result<()> {
        let user_id = self
            .profile
            .as_ref()
            .map(|p| p.user_id.clone())
            .ok_or(AppError::Unauthorized)?;

        let Some(remote) = self.db.get_user(&user_id).await? else {
            return Ok(());
        };
        let own_drops = self.db.list_drops(&user_id).await?;
        self.apply_remote(remote, own_drops).await;
        Ok(())
    }

    async fn apply_remote(&mut self, profile: UserProfile, own_drops: Vec<Drop>) {
        self.cache
            .write(&CachedState::from_profile(&profile, own_drops.clone()));

        let shared = self.shared_drops(&profile.user_id).await;
        self.drops = own_drops.into_iter().chain(shared).collect();
        self.profile = Some(profile);
    }

    async fn shared_drops(&self, user_id: &str) -> Vec<Drop> {
        match self.db.recent_drops(SHARED_DROPS_LIMIT).await {
            Ok(rows) => rows
                .into_iter()
                .filter(|row| !row.is_owned_by(user_id))
                .map(|row| row.into_shared())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load shared drops");
                Vec::new()
            }
        }
    }

    pub async fn request_link(&self, email: &str) -> Result<LinkStatus> {
        self.auth.request_link(email).await
    }

    /// Sign in with the one-time token from the emailed link, for when
    /// the redirect can't reach this client.
    pub async fn sign_in_with_token(&mut self, token: &str) -> Result<()> {
        self.expect_screen(&[Screen::Auth], "sign in")?;
        let session = self.auth.exchange(token.trim()).await?;
        self.load_user_after_auth(session).await
    }

    /// Create the player's profile and enter the game.
    pub async fn complete_profile(&mut self, setup: ProfileSetup) -> Result<()> {
        self.expect_screen(&[Screen::Auth], "set up a profile")?;
        setup
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let user_id = self
            .pending_session
            .as_ref()
            .and_then(|s| s.user_id().map(str::to_string))
            .or_else(|| self.auth.session().and_then(|s| s.user.id))
            .or_else(|| {
                self.db
                    .is_demo()
                    .then(|| format!("demo_{}", now_millis()))
            })
            .ok_or(AppError::Unauthorized)?;

        let avatar = match setup.avatar {
            AvatarChoice::Emoji(emoji) => Avatar::Emoji(emoji),
            AvatarChoice::Image {
                file_name,
                content_type,
                bytes,
            } => match self
                .db
                .upload_avatar(&user_id, &file_name, &content_type, bytes.clone())
                .await
            {
                Ok(url) => Avatar::Upload(url),
                Err(e) => {
                    if !e.is_demo_mode() {
                        tracing::warn!(error = %e, "Avatar upload failed, keeping it inline");
                    }
                    Avatar::Upload(data_url(&content_type, &bytes))
                }
            },
        };

        let profile = UserProfile::new(user_id, setup.username, &avatar);
        if let Err(e) = self.db.upsert_user(&profile).await {
            tracing::warn!(error = %e, "Failed to save profile");
        }
        self.cache.write(&CachedState::from_profile(&profile, Vec::new()));
        self.drops = self.shared_drops(&profile.user_id).await;

        tracing::info!(user_id = %profile.user_id, username = %profile.username, "Profile created");
        self.profile = Some(profile);
        self.pending_session = None;
        self.screen = Screen::Dashboard;
        Ok(())
    }

    /// Forget the session, the cache and all in-memory state.
    pub fn sign_out(&mut self) -> Result<()> {
        self.auth.sign_out()?;
        self.db.set_access_token(None);
        self.profile = None;
        self.drops.clear();
        self.selected = None;
        self.last_result = None;
        self.fail_reason = None;
        self.pending_session = None;
        self.screen = Screen::Auth;
        Ok(())
    }

    // ─── Navigation ──────────────────────────────────────────────

    fn expect_screen(&self, allowed: &[Screen], action: &str) -> Result<()> {
        if allowed.contains(&self.screen) {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Can't {} from the {:?} screen",
                action, self.screen
            )))
        }
    }

    pub fn start_hunt(&mut self) -> Result<()> {
        self.expect_screen(&[Screen::Dashboard], "start a hunt")?;
        self.selected = None;
        self.screen = Screen::FindSticker;
        Ok(())
    }

    pub fn select_sticker(&mut self, sticker_id: &str) -> Result<()> {
        self.expect_screen(&[Screen::FindSticker], "pick a sticker")?;
        if self.catalog.get(sticker_id).is_none() {
            return Err(AppError::NotFound(format!("Sticker {}", sticker_id)));
        }
        self.selected = Some(sticker_id.to_string());
        self.screen = Screen::Camera;
        Ok(())
    }

    pub fn open_map(&mut self) -> Result<()> {
        self.expect_screen(&[Screen::Dashboard], "open the map")?;
        self.screen = Screen::Map;
        Ok(())
    }

    pub fn open_profile(&mut self) -> Result<()> {
        self.expect_screen(&[Screen::Dashboard], "open the profile")?;
        self.screen = Screen::Profile;
        Ok(())
    }

    /// Go one screen back.
    pub fn back(&mut self) -> Result<()> {
        self.screen = match self.screen {
            Screen::FindSticker | Screen::Map | Screen::Profile => Screen::Dashboard,
            Screen::Camera | Screen::Failed => Screen::FindSticker,
            // A capture that never finished
            Screen::Validating => Screen::Camera,
            other => {
                return Err(AppError::BadRequest(format!(
                    "Can't go back from the {:?} screen",
                    other
                )))
            }
        };
        Ok(())
    }

    /// Try the same sticker again after a rejection.
    pub fn retry(&mut self) -> Result<()> {
        self.expect_screen(&[Screen::Failed], "retry")?;
        self.fail_reason = None;
        self.screen = Screen::Camera;
        Ok(())
    }

    pub fn dismiss_result(&mut self) {
        self.last_result = None;
    }

    // ─── Find Flow ───────────────────────────────────────────────

    /// Validate a captured photo against the selected sticker and, if it
    /// matches, score it and drop it on the map.
    pub async fn handle_capture(&mut self, photo_base64: &str) -> Result<()> {
        self.expect_screen(&[Screen::Camera], "capture")?;
        let sticker = self
            .selected_sticker()
            .cloned()
            .ok_or_else(|| AppError::BadRequest("No sticker selected".to_string()))?;
        if self.profile.is_none() {
            return Err(AppError::Unauthorized);
        }

        self.screen = Screen::Validating;
        let verdict = self.validator.validate(photo_base64, &sticker).await;

        if !verdict.valid {
            tracing::info!(sticker = %sticker.id, confidence = verdict.confidence, "Find rejected");
            self.fail_reason = Some(verdict.reason);
            self.screen = Screen::Failed;
            return Ok(());
        }

        let is_pioneer = self.is_pioneer(&sticker.id);
        let Some(profile) = self.profile.as_mut() else {
            return Err(AppError::Unauthorized);
        };
        let is_first = profile.finds == 0;
        let score = calc_score(&sticker, is_first, is_pioneer);

        let point = jitter_around(self.home_center, DROP_SPREAD_DEG);
        let drop = Drop {
            id: now_millis().to_string(),
            sticker_id: sticker.id.clone(),
            lat: point.y(),
            lng: point.x(),
            owner: profile.username.clone(),
            city: self.home_city.clone(),
            time: JUST_NOW_LABEL.to_string(),
            pts: score.total,
            pioneer: is_pioneer,
            is_own: true,
        };

        profile.total_score = profile.total_score.saturating_add(score.total);
        profile.finds += 1;
        profile.discover(&sticker.id);
        let user_id = profile.user_id.clone();

        tracing::info!(
            sticker = %sticker.id,
            pts = score.total,
            pioneer = is_pioneer,
            first = is_first,
            "Find accepted"
        );

        self.drops.insert(0, drop.clone());
        self.persist().await;
        if let Err(e) = self.db.insert_drop(&user_id, &drop).await {
            tracing::warn!(error = %e, "Failed to record drop");
        }

        self.last_result = Some(FindResult {
            sticker_id: sticker.id,
            score,
            is_pioneer,
            confidence: verdict.confidence,
        });
        self.selected = None;
        self.screen = Screen::Dashboard;
        Ok(())
    }

    /// No other player has dropped this sticker in the local view.
    pub fn is_pioneer(&self, sticker_id: &str) -> bool {
        !self
            .drops
            .iter()
            .any(|d| d.sticker_id == sticker_id && !d.is_own)
    }

    /// Write progress to the offline cache, then the row store.
    pub async fn persist(&self) {
        let Some(profile) = &self.profile else {
            return;
        };
        let own: Vec<Drop> = self.drops.iter().filter(|d| d.is_own).cloned().collect();
        self.cache.write(&CachedState::from_profile(profile, own));

        if let Err(e) = self.db.upsert_progress(profile).await {
            tracing::warn!(error = %e, "Failed to sync progress");
        }
    }

    // ─── Views ───────────────────────────────────────────────────

    /// Top players, or just this player when the board can't be loaded.
    pub async fn leaderboard(&self) -> Leaderboard {
        let remote = self.db.leaderboard(LEADERBOARD_SIZE).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load leaderboard");
            Leaderboard::default()
        });
        if !remote.entries.is_empty() {
            return remote;
        }

        let entries = self
            .profile
            .iter()
            .map(|p| LeaderboardEntry {
                username: p.username.clone(),
                total_score: p.total_score,
                avatar_id: p.avatar_id.clone(),
            })
            .collect();
        Leaderboard::new(entries)
    }

    pub fn map_geojson(&self) -> FeatureCollection {
        drops_geojson(&self.drops, &self.catalog)
    }

    /// Where the map opens: the latest own drop, else the home center.
    pub fn map_focus(&self) -> Point<f64> {
        focus(&self.drops).unwrap_or(self.home_center)
    }

    pub fn profile_stats(&self) -> Option<ProfileStats> {
        self.profile.as_ref().map(|p| ProfileStats {
            total_score: p.total_score,
            finds: p.finds,
            discovered: p.discovered.len(),
            catalog_size: self.catalog.len(),
            own_drops: self.drops.iter().filter(|d| d.is_own).count(),
        })
    }
}

fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}
