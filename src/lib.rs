//! # mapbridge
//!
//! One async map-control API over two unrelated native mobile map SDKs.
//!
//! The crate does not draw anything. It orchestrates calls into a native map
//! engine (modelled by the traits in [`platform::android::sdk`] and
//! [`platform::ios::sdk`]) and reconciles their divergent callback styles into
//! the contract described by [`MapPlatform`] and [`MapController`].
//!
//! ```rust,ignore
//! use mapbridge::prelude::*;
//!
//! let icons = Arc::new(HttpIconLoader::new(resource_dir));
//! let platform = AndroidPlatform::new(sdk, PlatformSettings::default(), icons);
//! let map = platform
//!     .show(serde_json::json!({ "accessToken": token, "zoomLevel": 12 }))
//!     .await?;
//! map.add_markers(vec![Marker::new("home", LatLng::new(52.37, 4.89))]).await?;
//! ```

pub mod core;
pub mod offline;
pub mod platform;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod traits;
pub mod view;

pub use crate::core::{
    config::{merge, PlatformSettings, ShowOptions},
    geo::{LatLng, LatLngBounds},
    marker::{Marker, MarkerIcon, MarkerId, Polyline},
    style::MapStyle,
};

pub use crate::traits::{MapController, MapHandle, MapPlatform};

pub use crate::view::{MapView, MapViewConfig, MapViewEvent};

pub use platform::{android::AndroidPlatform, ios::IosPlatform};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
///
/// Every variant is local to the call that produced it. Messages are meant to
/// be shown to the application developer as-is.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Please set the 'accessToken' parameter")]
    MissingAccessToken,

    #[error("No map has been loaded")]
    NoMap,

    #[error("Map view is not ready yet, await ready() first")]
    NotReady,

    #[error("Invalid zoom level {0}, must be between 0 and 20")]
    InvalidZoomLevel(f64),

    #[error("Region not found")]
    RegionNotFound,

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Native error: {0}")]
    Native(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "http-icons")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<platform::NativeError> for MapError {
    fn from(err: platform::NativeError) -> Self {
        MapError::Native(err.to_string())
    }
}

/// Error type alias for convenience
pub type Error = MapError;
