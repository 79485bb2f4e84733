//! Prelude module for common mapbridge types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapbridge::prelude::*;`

pub use crate::core::{
    camera::{
        AddPolygonOptions, AddPolylineOptions, AnimateCameraOptions, SetCenterOptions,
        SetTiltOptions, SetViewportOptions, SetZoomLevelOptions, Viewport,
    },
    config::{merge, Margins, PlatformSettings, ShowOptions},
    geo::{LatLng, LatLngBounds},
    listener::Listener,
    marker::{Marker, MarkerIcon, MarkerId, Polyline, PolylineId},
    style::MapStyle,
};

pub use crate::offline::{
    DeleteOfflineRegionOptions, DownloadOfflineRegionOptions, DownloadProgress, OfflineRegion,
};

pub use crate::registry::icon::{IconCache, IconImage, IconLoader};

#[cfg(feature = "http-icons")]
pub use crate::registry::icon::HttpIconLoader;

pub use crate::platform::{android::AndroidPlatform, ios::IosPlatform, NativeError, Platform};

pub use crate::traits::{MapController, MapHandle, MapPlatform, MapState};

pub use crate::view::{LayoutContext, MapView, MapViewConfig, MapViewEvent};

pub use crate::{Error as MapError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
