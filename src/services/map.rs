// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map projection of drops.

use crate::models::{Drop, Rarity, Sticker};
use crate::services::catalog::Catalog;
use geo::Point;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use rand::Rng;
use serde_json::json;

/// Default spread (degrees) of new drops around the home center.
pub const DROP_SPREAD_DEG: f64 = 0.06;

/// Color used for the player's own drops.
pub const OWN_DROP_COLOR: &str = "#C6FF00";

/// Random point within `spread / 2` degrees of `center` on both axes.
pub fn jitter_around(center: Point<f64>, spread: f64) -> Point<f64> {
    let mut rng = rand::thread_rng();
    Point::new(
        center.x() + (rng.gen::<f64>() - 0.5) * spread,
        center.y() + (rng.gen::<f64>() - 0.5) * spread,
    )
}

/// Where the map should fly to first: the most recent own drop.
pub fn focus(drops: &[Drop]) -> Option<Point<f64>> {
    drops
        .iter()
        .find(|d| d.is_own)
        .map(|d| Point::new(d.lng, d.lat))
}

/// Drops as a GeoJSON FeatureCollection for the map layer.
///
/// Drops whose sticker is no longer in the catalog are drawn as the first
/// catalog entry.
pub fn drops_geojson(drops: &[Drop], catalog: &Catalog) -> FeatureCollection {
    let features = drops
        .iter()
        .map(|drop| {
            let sticker = catalog.get(&drop.sticker_id).or_else(|| catalog.first());
            drop_feature(drop, sticker)
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn drop_feature(drop: &Drop, sticker: Option<&Sticker>) -> Feature {
    let (name, rarity, sticker_color) = match sticker {
        Some(s) => (s.name.as_str(), s.rarity, s.color.as_str()),
        None => ("?", Rarity::Common, OWN_DROP_COLOR),
    };
    let color = if drop.is_own {
        OWN_DROP_COLOR
    } else {
        sticker_color
    };

    let mut properties = JsonObject::new();
    properties.insert("stickerId".to_string(), json!(drop.sticker_id));
    properties.insert("name".to_string(), json!(name));
    properties.insert("rarity".to_string(), json!(rarity.as_str()));
    properties.insert("color".to_string(), json!(color));
    properties.insert(
        "artUrl".to_string(),
        json!(sticker.and_then(|s| s.art_url.as_deref())),
    );
    properties.insert("pts".to_string(), json!(drop.pts));
    properties.insert("pioneer".to_string(), json!(drop.pioneer));
    properties.insert("owner".to_string(), json!(drop.owner));
    properties.insert("city".to_string(), json!(drop.city));
    properties.insert("time".to_string(), json!(drop.time));
    properties.insert("isOwn".to_string(), json!(drop.is_own));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![drop.lng, drop.lat]))),
        id: Some(Id::String(drop.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}
