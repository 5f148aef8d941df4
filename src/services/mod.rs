// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod catalog;
pub mod map;
pub mod scoring;
pub mod validation;
pub mod vision;

pub use auth::{AuthService, LinkStatus};
pub use catalog::{load_catalog, Catalog};
pub use scoring::{calc_score, Score, ScoreLine};
pub use validation::ValidationClient;
pub use vision::VisionService;
