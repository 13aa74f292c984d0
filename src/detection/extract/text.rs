//! Text features

use crate::detection::features::FeatureMap;

pub fn extract(text: &str) -> FeatureMap {
    FeatureMap::new()
        .with_scalar("tokens", text.split_whitespace().count() as f64)
        .with_scalar("chars", text.chars().count() as f64)
}
