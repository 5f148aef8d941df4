// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sticker catalog loading with a built-in fallback.

use crate::db::SupabaseDb;
use crate::models::{default_catalog, Sticker};

/// Stickers in circulation. Replaced wholesale on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    stickers: Vec<Sticker>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            stickers: default_catalog(),
        }
    }
}

impl Catalog {
    /// Catalog from a list; an empty list means the built-in one.
    pub fn new(stickers: Vec<Sticker>) -> Self {
        if stickers.is_empty() {
            Self::default()
        } else {
            Self { stickers }
        }
    }

    pub fn stickers(&self) -> &[Sticker] {
        &self.stickers
    }

    pub fn len(&self) -> usize {
        self.stickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stickers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.id == id)
    }

    pub fn first(&self) -> Option<&Sticker> {
        self.stickers.first()
    }

    /// Swap in a freshly loaded list.
    pub fn replace(&mut self, other: Catalog) {
        *self = other;
    }

    /// Reference image location for a sticker: its own URL when the store
    /// provides one, otherwise the bundled path.
    pub fn reference_for(&self, id: &str) -> Option<String> {
        self.get(id).map(|s| {
            s.reference_url
                .clone()
                .unwrap_or_else(|| s.reference_path())
        })
    }
}

/// Fetch the active stickers, falling back to the built-in list when the
/// store is unreachable, errors, or has none.
pub async fn load_catalog(db: &SupabaseDb) -> Catalog {
    if db.is_demo() {
        return Catalog::default();
    }
    match db.active_stickers().await {
        Ok(rows) if !rows.is_empty() => {
            tracing::info!(count = rows.len(), "Sticker catalog loaded");
            Catalog::new(rows)
        }
        Ok(_) => {
            tracing::warn!("No active stickers in store, using built-in catalog");
            Catalog::default()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load stickers, using built-in catalog");
            Catalog::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_falls_back() {
        assert_eq!(Catalog::new(Vec::new()), Catalog::default());
        assert_eq!(Catalog::default().len(), 8);
    }

    #[test]
    fn test_reference_for_prefers_store_url() {
        let mut stickers = default_catalog();
        stickers[0].reference_url = Some("https://cdn.example/ref/s1.png".to_string());
        let catalog = Catalog::new(stickers);

        assert_eq!(
            catalog.reference_for("s1").as_deref(),
            Some("https://cdn.example/ref/s1.png")
        );
        assert_eq!(
            catalog.reference_for("s2").as_deref(),
            Some("/stickers/neon-reaper.jpg")
        );
        assert_eq!(catalog.reference_for("nope"), None);
    }

    #[tokio::test]
    async fn test_demo_mode_uses_builtin() {
        let catalog = load_catalog(&SupabaseDb::new_demo()).await;
        assert_eq!(catalog, Catalog::default());
    }
}
