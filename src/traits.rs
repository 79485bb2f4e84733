//! The adapter contract
//!
//! [`MapPlatform`] covers process-level operations (showing a map, offline
//! storage, permissions). [`MapController`] covers everything that acts on
//! one map instance. Both are implemented once per native SDK; the embeddable
//! [`crate::MapView`] forwards [`MapController`] to the map it owns.
//!
//! Every operation is asynchronous and reports failures as [`MapError`]
//! values. Adapters never panic across this boundary.

use crate::{
    core::{
        camera::{
            AddPolygonOptions, AddPolylineOptions, AnimateCameraOptions, SetCenterOptions,
            SetTiltOptions, SetViewportOptions, SetZoomLevelOptions, Viewport,
        },
        config::ShowOptions,
        geo::LatLng,
        listener::Listener,
        marker::{Marker, MarkerId, PolylineId},
    },
    offline::{DeleteOfflineRegionOptions, DownloadOfflineRegionOptions, OfflineRegion},
    platform::{Frame, Platform},
    Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Lifecycle of one native map instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    /// Waiting for the native view and its first style load
    Constructing,
    Ready,
    Destroyed,
}

/// Shared handle to a shown map.
///
/// Returned by [`MapPlatform::show`] and threaded through later calls instead
/// of a hidden module-level map reference.
pub type MapHandle = Arc<dyn MapController>;

/// Operations on a single map instance
#[async_trait]
pub trait MapController: Send + Sync {
    fn state(&self) -> MapState;

    async fn hide(&self) -> Result<()>;
    async fn unhide(&self) -> Result<()>;

    /// Tear the map down. Destroying twice succeeds silently.
    async fn destroy(&self) -> Result<()>;

    /// Switch the style by name or URL. Listeners registered before the
    /// switch must be registered again by the caller.
    async fn set_map_style(&self, style: &str) -> Result<()>;

    /// Add a batch of markers. All icons of the batch are resolved before the
    /// first marker reaches the native map.
    async fn add_markers(&self, markers: Vec<Marker>) -> Result<()>;

    /// Remove markers by id, or all of them when `ids` is `None`
    async fn remove_markers(&self, ids: Option<Vec<MarkerId>>) -> Result<()>;

    /// Markers currently owned by the map, in insertion order
    fn markers(&self) -> Vec<Marker>;

    async fn set_center(&self, options: SetCenterOptions) -> Result<()>;
    async fn get_center(&self) -> Result<LatLng>;
    async fn set_zoom_level(&self, options: SetZoomLevelOptions) -> Result<()>;
    async fn get_zoom_level(&self) -> Result<f64>;
    async fn set_tilt(&self, options: SetTiltOptions) -> Result<()>;
    async fn get_tilt(&self) -> Result<f64>;
    async fn animate_camera(&self, options: AnimateCameraOptions) -> Result<()>;

    async fn add_polygon(&self, options: AddPolygonOptions) -> Result<()>;
    async fn add_polyline(&self, options: AddPolylineOptions) -> Result<()>;

    /// Remove polylines by id, or all of them when `ids` is `None`
    async fn remove_polylines(&self, ids: Option<Vec<PolylineId>>) -> Result<()>;

    async fn set_on_map_click_listener(&self, listener: Listener<LatLng>) -> Result<()>;
    async fn set_on_map_long_click_listener(&self, listener: Listener<LatLng>) -> Result<()>;
    async fn set_on_scroll_listener(&self, listener: Listener<LatLng>) -> Result<()>;
    async fn set_on_fling_listener(&self, listener: Listener<()>) -> Result<()>;
    async fn set_on_camera_move_listener(&self, listener: Listener<()>) -> Result<()>;
    async fn set_on_camera_move_cancel_listener(&self, listener: Listener<()>) -> Result<()>;

    async fn get_viewport(&self) -> Result<Viewport>;
    async fn set_viewport(&self, options: SetViewportOptions) -> Result<()>;
}

/// Process-level operations of one native SDK
#[async_trait]
pub trait MapPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    /// Merge `overrides` over the platform defaults and show a full-screen map
    /// inset by the configured margins. Any map previously shown through this
    /// call is destroyed first.
    async fn show(&self, overrides: Value) -> Result<MapHandle>;

    /// Construct a map inside a host-provided frame. Used by embeddable views,
    /// which own their map and are not affected by [`MapPlatform::show`].
    async fn create_map(&self, options: ShowOptions, frame: Frame) -> Result<MapHandle>;

    async fn download_offline_region(&self, options: DownloadOfflineRegionOptions) -> Result<()>;
    async fn list_offline_regions(&self) -> Result<Vec<OfflineRegion>>;

    /// Delete every stored region with the given name
    async fn delete_offline_region(&self, options: DeleteOfflineRegionOptions) -> Result<()>;

    async fn has_fine_location_permission(&self) -> Result<bool>;
    async fn request_fine_location_permission(&self) -> Result<bool>;
}
