//! Application-level map entities: markers and polylines

use crate::core::{geo::LatLng, listener::Listener};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Caller-assigned identifier for markers and polylines.
///
/// Identifiers are used for lookup and removal only; the crate never enforces
/// uniqueness. Numeric ids in JSON options are accepted and stored as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "IdRepr", into = "String")]
pub struct EntityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<IdRepr> for EntityId {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(text) => EntityId(text),
            IdRepr::Int(n) => EntityId(n.to_string()),
            IdRepr::Float(n) => EntityId(n.to_string()),
        }
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId(value)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId(value.to_string())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub type MarkerId = EntityId;
pub type PolylineId = EntityId;

/// Where a marker's icon comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerIcon {
    /// Bundled resource, written `res://name` in options
    Resource(String),
    /// Remote image, downloaded once and cached
    Url(String),
    /// Image file on the device
    File(PathBuf),
}

impl MarkerIcon {
    /// Classify an `icon` option value
    pub fn parse(value: &str) -> Option<Self> {
        if let Some(name) = value.strip_prefix("res://") {
            Some(MarkerIcon::Resource(name.to_string()))
        } else if value.starts_with("http://") || value.starts_with("https://") {
            Some(MarkerIcon::Url(value.to_string()))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: MarkerId,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// `res://name` or an http(s) URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Local file path, used when `icon` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(skip)]
    pub on_tap: Option<Listener<Marker>>,
    #[serde(skip)]
    pub on_callout_tap: Option<Listener<Marker>>,
}

impl Marker {
    pub fn new(id: impl Into<MarkerId>, position: LatLng) -> Self {
        Self {
            id: id.into(),
            lat: position.lat,
            lng: position.lng,
            title: None,
            subtitle: None,
            icon: None,
            icon_path: None,
            selected: false,
            on_tap: None,
            on_callout_tap: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_icon_path(mut self, path: impl Into<String>) -> Self {
        self.icon_path = Some(path.into());
        self
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn on_tap(mut self, listener: impl Into<Listener<Marker>>) -> Self {
        self.on_tap = Some(listener.into());
        self
    }

    pub fn on_callout_tap(mut self, listener: impl Into<Listener<Marker>>) -> Self {
        self.on_callout_tap = Some(listener.into());
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// The icon source to resolve, if any. `icon` wins over `icon_path`.
    pub fn icon_source(&self) -> Option<MarkerIcon> {
        self.icon
            .as_deref()
            .and_then(MarkerIcon::parse)
            .or_else(|| self.icon_path.as_ref().map(|p| MarkerIcon::File(PathBuf::from(p))))
    }
}

fn default_width() -> f64 {
    5.0
}

fn default_color() -> String {
    "#000000".to_string()
}

fn default_opacity() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Polyline {
    pub id: PolylineId,
    pub points: Vec<LatLng>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

impl Polyline {
    pub fn new(id: impl Into<PolylineId>, points: Vec<LatLng>) -> Self {
        Self {
            id: id.into(),
            points,
            width: default_width(),
            color: default_color(),
            opacity: default_opacity(),
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}
