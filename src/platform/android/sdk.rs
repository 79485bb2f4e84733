//! The Android map SDK surface driven by [`super::AndroidPlatform`]
//!
//! A host embedding implements these traits over JNI. Completion is reported
//! through one-shot callbacks; events through listener objects registered on
//! the map.

use crate::{
    core::geo::{LatLng, LatLngBounds},
    platform::{Frame, NativeListener, NativeResult},
    registry::icon::IconImage,
    runtime::Callback,
};
use std::sync::Arc;
use std::time::Duration;

pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";

/// First API level with runtime permissions
pub const RUNTIME_PERMISSIONS_SDK_INT: u32 = 23;

pub type NativeMarkerId = i64;
pub type NativeAnnotationId = i64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f64,
    pub tilt: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraUpdate {
    Position(CameraPosition),
    Bounds { bounds: LatLngBounds, padding: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapboxMapOptions {
    pub style_url: String,
    pub camera: CameraPosition,
    pub compass_enabled: bool,
    pub logo_enabled: bool,
    pub attribution_enabled: bool,
    pub rotate_gestures_enabled: bool,
    pub scroll_gestures_enabled: bool,
    pub zoom_gestures_enabled: bool,
    pub tilt_gestures_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
    /// `None` uses the SDK's default marker icon
    pub icon: Option<IconImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineOptions {
    pub points: Vec<LatLng>,
    pub width: f64,
    pub color: String,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonOptions {
    pub points: Vec<LatLng>,
    pub fill_color: Option<String>,
    pub alpha: f64,
    pub stroke_color: Option<String>,
}

/// Activity lifecycle transitions forwarded to the map view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    Resumed,
    Paused,
    SaveInstanceState,
    Destroyed,
}

/// Entry point of the SDK
pub trait AndroidMapSdk: Send + Sync {
    /// `Build.VERSION.SDK_INT` of the device
    fn sdk_int(&self) -> u32;

    fn set_access_token(&self, token: &str) -> NativeResult<()>;

    /// Content frame of the foreground activity
    fn screen_frame(&self) -> Frame;

    /// Display density, used as the pixel ratio of offline tiles
    fn pixel_ratio(&self) -> f64;

    fn create_map_view(&self, options: &MapboxMapOptions) -> NativeResult<Arc<dyn AndroidMapView>>;

    /// Attach the view to the activity layout at `frame`
    fn add_to_layout(&self, view: &Arc<dyn AndroidMapView>, frame: Frame) -> NativeResult<()>;

    fn remove_from_layout(&self, view: &Arc<dyn AndroidMapView>) -> NativeResult<()>;

    fn offline_manager(&self) -> Arc<dyn AndroidOfflineManager>;

    fn check_self_permission(&self, permission: &str) -> bool;

    fn request_permissions(&self, permissions: &[&str], callback: Callback<bool>);

    /// Returns a token for [`AndroidMapSdk::unregister_lifecycle_callbacks`]
    fn register_lifecycle_callbacks(&self, callback: NativeListener<ActivityEvent>) -> u64;

    fn unregister_lifecycle_callbacks(&self, token: u64);
}

/// The `MapView` widget
pub trait AndroidMapView: Send + Sync {
    /// Calls back once the map object is available
    fn get_map_async(&self, callback: Callback<Arc<dyn MapboxMap>>);

    fn set_visibility(&self, visible: bool) -> NativeResult<()>;

    fn on_lifecycle(&self, event: ActivityEvent);

    fn on_destroy(&self) -> NativeResult<()>;
}

/// The `MapboxMap` controller
pub trait MapboxMap: Send + Sync {
    fn set_style(&self, style_url: &str, on_loaded: Callback<NativeResult<()>>);

    fn camera_position(&self) -> NativeResult<CameraPosition>;

    fn move_camera(&self, update: CameraUpdate) -> NativeResult<()>;

    /// Animate to `update`; `on_finish` runs when the animation ends or is
    /// interrupted.
    fn animate_camera(&self, update: CameraUpdate, duration: Duration, on_finish: Callback<()>)
        -> NativeResult<()>;

    fn add_markers(&self, markers: Vec<MarkerOptions>) -> NativeResult<Vec<NativeMarkerId>>;

    fn remove_marker(&self, id: NativeMarkerId) -> NativeResult<()>;

    fn select_marker(&self, id: NativeMarkerId) -> NativeResult<()>;

    fn add_polyline(&self, options: PolylineOptions) -> NativeResult<NativeAnnotationId>;

    fn add_polygon(&self, options: PolygonOptions) -> NativeResult<NativeAnnotationId>;

    fn remove_annotation(&self, id: NativeAnnotationId) -> NativeResult<()>;

    fn visible_region(&self) -> NativeResult<LatLngBounds>;

    fn set_my_location_enabled(&self, enabled: bool) -> NativeResult<()>;

    /// Listener returns `true` when it consumed the click
    fn set_on_marker_click_listener(&self, listener: Arc<dyn Fn(NativeMarkerId) -> bool + Send + Sync>);

    fn set_on_info_window_click_listener(
        &self,
        listener: Arc<dyn Fn(NativeMarkerId) -> bool + Send + Sync>,
    );

    fn add_on_map_click_listener(&self, listener: NativeListener<LatLng>);

    fn add_on_map_long_click_listener(&self, listener: NativeListener<LatLng>);

    /// Fires while the user drags the map
    fn add_on_move_listener(&self, listener: NativeListener<()>);

    fn add_on_fling_listener(&self, listener: NativeListener<()>);

    fn add_on_camera_move_listener(&self, listener: NativeListener<()>);

    fn add_on_camera_move_cancel_listener(&self, listener: NativeListener<()>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct OfflineRegionDefinition {
    pub style_url: String,
    pub bounds: LatLngBounds,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pixel_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfflineRegionStatus {
    pub completed_resource_count: u64,
    pub required_resource_count: u64,
    pub completed_resource_size: u64,
    pub required_resource_count_is_precise: bool,
    pub download_active: bool,
}

impl OfflineRegionStatus {
    pub fn is_complete(&self) -> bool {
        self.required_resource_count_is_precise
            && self.completed_resource_count >= self.required_resource_count
    }
}

/// Receives download status of one region
pub trait OfflineRegionObserver: Send + Sync {
    fn on_status_changed(&self, status: OfflineRegionStatus);

    fn on_error(&self, reason: String, message: String);

    fn mapbox_tile_count_limit_exceeded(&self, limit: u64);
}

pub trait AndroidOfflineManager: Send + Sync {
    fn create_offline_region(
        &self,
        definition: OfflineRegionDefinition,
        metadata: Vec<u8>,
        callback: Callback<NativeResult<Arc<dyn AndroidOfflineRegion>>>,
    );

    fn list_offline_regions(&self, callback: Callback<NativeResult<Vec<Arc<dyn AndroidOfflineRegion>>>>);
}

pub trait AndroidOfflineRegion: Send + Sync {
    fn id(&self) -> i64;

    fn definition(&self) -> OfflineRegionDefinition;

    fn metadata(&self) -> Vec<u8>;

    fn set_observer(&self, observer: Arc<dyn OfflineRegionObserver>);

    fn set_download_state(&self, active: bool);

    fn delete(&self, callback: Callback<NativeResult<()>>);
}
