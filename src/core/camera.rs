//! Camera, viewport and overlay option types shared by every adapter

use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        marker::Polyline,
    },
    MapError, Result,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_ZOOM_LEVEL: f64 = 0.0;
pub const MAX_ZOOM_LEVEL: f64 = 20.0;

pub const DEFAULT_TILT: f64 = 30.0;
pub const DEFAULT_TILT_DURATION_MS: u64 = 5000;
pub const DEFAULT_CAMERA_DURATION_MS: u64 = 10000;

/// Padding in pixels applied on every edge when fitting a viewport
pub const VIEWPORT_EDGE_PADDING: f64 = 25.0;
pub const VIEWPORT_ANIMATION_MS: u64 = 1000;

/// Duration of animated center and zoom changes
pub const CAMERA_MOVE_ANIMATION_MS: u64 = 1000;

/// Reject zoom levels outside the closed range `[0, 20]`
pub fn validate_zoom_level(level: f64) -> Result<f64> {
    if (MIN_ZOOM_LEVEL..=MAX_ZOOM_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(MapError::InvalidZoomLevel(level))
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetCenterOptions {
    pub lat: f64,
    pub lng: f64,
    #[serde(default = "yes")]
    pub animated: bool,
}

impl SetCenterOptions {
    pub fn new(center: LatLng) -> Self {
        Self {
            lat: center.lat,
            lng: center.lng,
            animated: true,
        }
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetZoomLevelOptions {
    pub level: f64,
    #[serde(default = "yes")]
    pub animated: bool,
}

impl SetZoomLevelOptions {
    pub fn new(level: f64) -> Self {
        Self {
            level,
            animated: true,
        }
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SetTiltOptions {
    /// Degrees, 30 when absent
    pub tilt: Option<f64>,
    /// Milliseconds, 5000 when absent
    pub duration: Option<u64>,
}

impl SetTiltOptions {
    pub fn tilt(&self) -> f64 {
        self.tilt.unwrap_or(DEFAULT_TILT)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration.unwrap_or(DEFAULT_TILT_DURATION_MS))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimateCameraOptions {
    pub target: LatLng,
    #[serde(default)]
    pub zoom_level: Option<f64>,
    /// Camera altitude in meters; only the iOS-shaped SDK has a use for it
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub bearing: Option<f64>,
    #[serde(default)]
    pub tilt: Option<f64>,
    #[serde(default)]
    pub duration: Option<u64>,
}

impl AnimateCameraOptions {
    pub fn new(target: LatLng) -> Self {
        Self {
            target,
            zoom_level: None,
            altitude: None,
            bearing: None,
            tilt: None,
            duration: None,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration.unwrap_or(DEFAULT_CAMERA_DURATION_MS))
    }
}

/// The visible part of the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub bounds: LatLngBounds,
    pub zoom_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetViewportOptions {
    pub bounds: LatLngBounds,
    #[serde(default = "yes")]
    pub animated: bool,
}

impl SetViewportOptions {
    pub fn new(bounds: LatLngBounds) -> Self {
        Self {
            bounds,
            animated: true,
        }
    }

    pub fn animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    /// Animation length, zero when not animated
    pub fn duration(&self) -> Duration {
        if self.animated {
            Duration::from_millis(VIEWPORT_ANIMATION_MS)
        } else {
            Duration::ZERO
        }
    }
}

pub type AddPolylineOptions = Polyline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPolygonOptions {
    pub points: Vec<LatLng>,
    #[serde(default)]
    pub fill_color: Option<String>,
    #[serde(default)]
    pub fill_opacity: Option<f64>,
    #[serde(default)]
    pub stroke_color: Option<String>,
    #[serde(default)]
    pub stroke_width: Option<f64>,
    #[serde(default)]
    pub stroke_opacity: Option<f64>,
}

impl AddPolygonOptions {
    pub fn new(points: Vec<LatLng>) -> Self {
        Self {
            points,
            fill_color: None,
            fill_opacity: None,
            stroke_color: None,
            stroke_width: None,
            stroke_opacity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_range_is_closed() {
        assert!(validate_zoom_level(0.0).is_ok());
        assert!(validate_zoom_level(20.0).is_ok());
        assert!(matches!(validate_zoom_level(21.0), Err(MapError::InvalidZoomLevel(_))));
        assert!(validate_zoom_level(-0.5).is_err());
        assert!(validate_zoom_level(f64::NAN).is_err());
    }

    #[test]
    fn test_tilt_defaults() {
        let options = SetTiltOptions::default();
        assert_eq!(options.tilt(), 30.0);
        assert_eq!(options.duration(), Duration::from_millis(5000));
    }

    #[test]
    fn test_viewport_duration() {
        let bounds = LatLngBounds::from_coords(0.0, 0.0, 1.0, 1.0);
        assert_eq!(SetViewportOptions::new(bounds).duration(), Duration::from_millis(1000));
        assert!(SetViewportOptions::new(bounds).animated(false).duration().is_zero());
    }

    #[test]
    fn test_center_options_default_to_animated() {
        let options: SetCenterOptions =
            serde_json::from_value(serde_json::json!({ "lat": 1.0, "lng": 2.0 })).unwrap();
        assert!(options.animated);
        assert_eq!(options.center(), LatLng::new(1.0, 2.0));
    }
}
