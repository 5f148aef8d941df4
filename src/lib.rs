// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Street Hunt: find stickers in the street, prove it with a photo.
//!
//! This crate provides the photo validation API (a vision model judges
//! whether a snapshot shows a given sticker) and the game client: auth,
//! the offline cache, scoring, drops on a shared map and the leaderboard.

pub mod config;
pub mod db;
pub mod error;
pub mod game;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use services::VisionService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub vision: VisionService,
}
