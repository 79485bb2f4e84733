//! Option merging and typed map configuration
//!
//! Callers hand options to [`crate::MapPlatform::show`] as a JSON object. The
//! object is deep-merged over the platform defaults with [`merge`] and then
//! decoded into [`ShowOptions`], so every field below has a well defined value
//! by the time an adapter sees it.

use crate::{
    core::{geo::LatLng, marker::Marker, style::MapStyle},
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Deep-merge `overrides` over `defaults`.
///
/// For every key in `overrides`, if `defaults` has the same key and both
/// values are objects the two are merged recursively; otherwise the override
/// wins verbatim. Keys only present in `defaults` are copied. Neither input is
/// modified. A non-object override replaces the defaults entirely.
pub fn merge(overrides: &Value, defaults: &Value) -> Value {
    match (overrides, defaults) {
        (Value::Object(over), Value::Object(base)) => Value::Object(merge_objects(over, base)),
        (Value::Null, _) => defaults.clone(),
        _ => overrides.clone(),
    }
}

fn merge_objects(overrides: &Map<String, Value>, defaults: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::with_capacity(overrides.len().max(defaults.len()));

    for (key, value) in overrides {
        let next = match (value, defaults.get(key)) {
            (Value::Object(over), Some(Value::Object(base))) => {
                Value::Object(merge_objects(over, base))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), next);
    }

    for (key, value) in defaults {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

/// Screen margins around a map shown with [`crate::MapPlatform::show`]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Fully resolved options for showing a map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShowOptions {
    pub style: MapStyle,
    pub access_token: Option<String>,
    pub margins: Margins,
    pub center: LatLng,
    pub zoom_level: f64,
    pub show_user_location: bool,
    pub hide_logo: bool,
    pub hide_attribution: bool,
    pub hide_compass: bool,
    pub hide_scale_bar: bool,
    pub disable_rotation: bool,
    pub disable_scroll: bool,
    pub disable_zoom: bool,
    pub disable_tilt: bool,
    pub markers: Vec<Marker>,
    /// Milliseconds to wait before constructing the native map
    pub delay: u64,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            style: MapStyle::Streets,
            access_token: None,
            margins: Margins::default(),
            center: LatLng::new(52.3702160, 4.8951680),
            zoom_level: 0.0,
            show_user_location: false,
            hide_logo: false,
            hide_attribution: true,
            hide_compass: false,
            hide_scale_bar: true,
            disable_rotation: false,
            disable_scroll: false,
            disable_zoom: false,
            disable_tilt: false,
            markers: Vec::new(),
            delay: 0,
        }
    }
}

impl ShowOptions {
    /// Defaults as a JSON object, the base for [`merge`]
    pub fn defaults_value() -> Value {
        serde_json::to_value(ShowOptions::default()).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    /// Merge `overrides` over `defaults` and decode the result
    pub fn resolve(overrides: &Value, defaults: &Value) -> Result<Self> {
        let merged = merge(overrides, defaults);
        serde_json::from_value(merged).map_err(|e| MapError::InvalidOptions(e.to_string()))
    }

    /// The access token, if present and non-empty
    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}

/// Per-platform adapter settings
#[derive(Debug, Clone)]
pub struct PlatformSettings {
    /// Class-level defaults that `show` options are merged over
    pub defaults: Value,
    /// Extra wait before every native map construction.
    ///
    /// Both native SDKs can crash when a map view is constructed in the same
    /// run loop turn as process launch. The wait keeps construction out of that
    /// window; set it to zero when the host guarantees a laid-out view.
    pub startup_delay: Duration,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            defaults: ShowOptions::defaults_value(),
            startup_delay: Duration::from_millis(500),
        }
    }
}

impl PlatformSettings {
    pub fn with_defaults(mut self, overrides: &Value) -> Self {
        self.defaults = merge(overrides, &self.defaults);
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Settings without any construction wait, for hosts and tests that
    /// already run after layout.
    pub fn immediate() -> Self {
        Self::default().with_startup_delay(Duration::ZERO)
    }
}
