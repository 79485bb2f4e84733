//! Map style identifiers
//!
//! Styles are opaque to this crate. A style is either one of the well known
//! named styles or a URL handed to the native SDK verbatim.

use serde::{Deserialize, Serialize};

const URL_SCHEMES: [&str; 5] = ["mapbox://", "http://", "https://", "asset://", "file://"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MapStyle {
    Streets,
    Light,
    Dark,
    Outdoors,
    Satellite,
    SatelliteStreets,
    TrafficDay,
    TrafficNight,
    /// A style URL passed through unchanged
    Url(String),
}

impl MapStyle {
    /// Resolve a style name or URL.
    ///
    /// Unrecognized names fall back to [`MapStyle::Streets`]; this never fails.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if URL_SCHEMES.iter().any(|scheme| trimmed.starts_with(scheme)) {
            return MapStyle::Url(trimmed.to_string());
        }

        match trimmed.to_ascii_lowercase().replace('_', "-").as_str() {
            "streets" => MapStyle::Streets,
            "light" => MapStyle::Light,
            "dark" => MapStyle::Dark,
            "outdoors" => MapStyle::Outdoors,
            "satellite" => MapStyle::Satellite,
            "satellite-streets" | "hybrid" => MapStyle::SatelliteStreets,
            "traffic-day" => MapStyle::TrafficDay,
            "traffic-night" => MapStyle::TrafficNight,
            other => {
                log::debug!("unknown map style '{}', using streets", other);
                MapStyle::Streets
            }
        }
    }

    /// Style URL understood by both native SDKs
    pub fn url(&self) -> &str {
        match self {
            MapStyle::Streets => "mapbox://styles/mapbox/streets-v11",
            MapStyle::Light => "mapbox://styles/mapbox/light-v10",
            MapStyle::Dark => "mapbox://styles/mapbox/dark-v10",
            MapStyle::Outdoors => "mapbox://styles/mapbox/outdoors-v11",
            MapStyle::Satellite => "mapbox://styles/mapbox/satellite-v9",
            MapStyle::SatelliteStreets => "mapbox://styles/mapbox/satellite-streets-v11",
            MapStyle::TrafficDay => "mapbox://styles/mapbox/traffic-day-v2",
            MapStyle::TrafficNight => "mapbox://styles/mapbox/traffic-night-v2",
            MapStyle::Url(url) => url,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MapStyle::Streets => "streets",
            MapStyle::Light => "light",
            MapStyle::Dark => "dark",
            MapStyle::Outdoors => "outdoors",
            MapStyle::Satellite => "satellite",
            MapStyle::SatelliteStreets => "satellite_streets",
            MapStyle::TrafficDay => "traffic_day",
            MapStyle::TrafficNight => "traffic_night",
            MapStyle::Url(url) => url,
        }
    }
}

impl Default for MapStyle {
    fn default() -> Self {
        MapStyle::Streets
    }
}

impl From<String> for MapStyle {
    fn from(value: String) -> Self {
        MapStyle::parse(&value)
    }
}

impl From<&str> for MapStyle {
    fn from(value: &str) -> Self {
        MapStyle::parse(value)
    }
}

impl From<MapStyle> for String {
    fn from(style: MapStyle) -> Self {
        style.name().to_string()
    }
}

impl std::fmt::Display for MapStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
