// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (PostgREST row store + object storage).

pub mod supabase;

pub use supabase::SupabaseDb;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const DROPS: &str = "drops";
    pub const STICKERS: &str = "stickers";
}

/// Storage bucket holding uploaded avatars (public read).
pub const AVATAR_BUCKET: &str = "avatars";
