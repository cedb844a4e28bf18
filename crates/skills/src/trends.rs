//! Trend sources.
//!
//! [`StaticTrendSource`] serves hand-maintained tag pools per category and
//! season. Ordering is fixed (seasonal pool first, then the base pool), so
//! identical inputs always yield identical trends.

use chrono::{Datelike, Local};
use std::collections::{HashMap, HashSet};
use themeloom_core::TrendSource;
use tracing::debug;

/// Season for a calendar month (1-12).
pub fn season_for_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "winter",
        3..=5 => "spring",
        6..=8 => "summer",
        _ => "autumn",
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticTrendSource {
    base: HashMap<String, Vec<String>>,
    seasonal: HashMap<(String, String), Vec<String>>,
}

impl StaticTrendSource {
    /// The built-in anime tag pools.
    pub fn new() -> Self {
        let mut source = Self::default();

        source.set_base(
            "anime",
            &[
                "twintails",
                "side_ponytail",
                "long_hair",
                "short_hair",
                "ahoge",
                "hair_ribbon",
                "hairband",
                "cat_ears",
                "animal_ears",
                "school_uniform",
                "sailor_uniform",
                "serafuku",
                "hoodie",
                "jacket",
                "idol_costume",
                "onepiece",
                "thighhighs",
                "knee_socks",
                "bare_legs",
                "smile",
                "blush",
                "sidelong_glance",
                "looking_at_viewer",
                "waving",
                "peace_sign",
                "winking",
                "street",
                "school_hallway",
                "classroom",
                "bedroom",
                "rooftop",
                "stage",
                "city_lights",
                "soft_lighting",
                "backlighting",
                "bokeh",
                "lens_flare",
                "sparkles",
            ],
        );

        source.set_seasonal(
            "anime",
            "summer",
            &[
                "frilled_bikini",
                "bikini",
                "swimsuit",
                "school_swimsuit",
                "sarong",
                "sunhat",
                "sunglasses",
                "beach",
                "sea",
                "waves",
                "sand",
                "sunset",
                "blue_sky",
                "water_drops",
                "ice_cream",
                "ramune",
                "festival",
                "yukata",
                "fireworks",
            ],
        );
        source.set_seasonal(
            "anime",
            "spring",
            &[
                "sakura",
                "cherry_blossoms",
                "flower_petals",
                "park",
                "spring_dress",
                "cardigan",
                "light_scarf",
                "breeze",
                "soft_colors",
            ],
        );
        source.set_seasonal(
            "anime",
            "autumn",
            &[
                "fallen_leaves",
                "autumn_leaves",
                "coat",
                "scarf",
                "beret",
                "coffee",
                "cafe",
                "sunset_street",
                "warm_colors",
            ],
        );
        source.set_seasonal(
            "anime",
            "winter",
            &[
                "coat",
                "scarf",
                "mittens",
                "boots",
                "turtleneck",
                "snow",
                "snowflakes",
                "winter_city",
                "breath_visible",
                "warm_drink",
            ],
        );

        source
    }

    /// A source with no trends at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fixed list served for every category and season.
    pub fn snapshot(tags: &[&str]) -> Self {
        let mut source = Self::default();
        source.set_base("*", tags);
        source
    }

    pub fn set_base(&mut self, category: &str, tags: &[&str]) {
        self.base
            .insert(category.to_lowercase(), tags.iter().map(|t| t.to_string()).collect());
    }

    pub fn set_seasonal(&mut self, category: &str, season: &str, tags: &[&str]) {
        self.seasonal.insert(
            (category.to_lowercase(), season.to_lowercase()),
            tags.iter().map(|t| t.to_string()).collect(),
        );
    }
}

impl TrendSource for StaticTrendSource {
    fn trending_tags(&self, category: &str, season: Option<&str>, limit: usize) -> Vec<String> {
        if limit == 0 {
            return Vec::new();
        }

        let category = category.to_lowercase();
        let season = match season.map(str::trim).filter(|s| !s.is_empty() && *s != "any") {
            Some(s) => s.to_lowercase(),
            None => season_for_month(Local::now().month()).to_string(),
        };

        let seasonal = self
            .seasonal
            .get(&(category.clone(), season.clone()))
            .into_iter()
            .flatten();
        let base = self
            .base
            .get(&category)
            .or_else(|| self.base.get("*"))
            .into_iter()
            .flatten();

        let mut seen = HashSet::new();
        let tags: Vec<String> = seasonal
            .chain(base)
            .filter(|t| seen.insert(t.as_str()))
            .take(limit)
            .cloned()
            .collect();

        debug!(category = %category, season = %season, count = tags.len(), "Trending tags");
        tags
    }
}
