//! The iOS map SDK surface driven by [`super::IosPlatform`]
//!
//! Map events reach the adapter through a single delegate object; gestures
//! through recognizers added to the view; offline progress through
//! notification observers on the shared offline storage.

use crate::{
    core::geo::{LatLng, LatLngBounds},
    platform::{Frame, NativeError, NativeListener, NativeResult},
    registry::icon::IconImage,
    runtime::Callback,
};
use std::sync::Arc;
use std::time::Duration;

pub type AnnotationHandle = u64;

/// `MGLMapCamera`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MglCamera {
    pub center: LatLng,
    /// Meters above the ground
    pub altitude: f64,
    pub pitch: f64,
    pub heading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeInsets {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl EdgeInsets {
    pub fn uniform(inset: f64) -> Self {
        Self {
            top: inset,
            left: inset,
            bottom: inset,
            right: inset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MglMapViewOptions {
    pub frame: Frame,
    pub style_url: String,
    pub center: LatLng,
    pub zoom_level: f64,
    pub logo_hidden: bool,
    pub attribution_hidden: bool,
    pub compass_hidden: bool,
    pub scale_bar_hidden: bool,
    pub rotate_enabled: bool,
    pub scroll_enabled: bool,
    pub zoom_enabled: bool,
    pub pitch_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Point {
        coordinate: LatLng,
        title: Option<String>,
        subtitle: Option<String>,
        /// `None` uses the default annotation image
        image: Option<IconImage>,
    },
    Polyline {
        coordinates: Vec<LatLng>,
        width: f64,
        color: String,
        alpha: f64,
    },
    Polygon {
        coordinates: Vec<LatLng>,
        fill_color: Option<String>,
        alpha: f64,
        stroke_color: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Tap,
    LongPress,
    Pan,
    Swipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionChangeReason {
    Finished,
    TransitionCancelled,
}

/// `MGLMapViewDelegate`. Every method has an empty default.
pub trait MglMapViewDelegate: Send + Sync {
    fn map_view_did_finish_loading_style(&self) {}

    fn map_view_did_fail_loading_map(&self, _error: NativeError) {}

    fn did_select_annotation(&self, _annotation: AnnotationHandle) {}

    fn tap_on_callout_for_annotation(&self, _annotation: AnnotationHandle) {}

    fn region_is_changing(&self) {}

    fn region_did_change(&self, _reason: RegionChangeReason) {}
}

/// `MGLMapView`
pub trait MglMapView: Send + Sync {
    /// The view keeps a strong reference until it is replaced or cleared
    fn set_delegate(&self, delegate: Option<Arc<dyn MglMapViewDelegate>>);

    /// Load a new style; the delegate hears about the outcome
    fn set_style_url(&self, style_url: &str);

    fn set_hidden(&self, hidden: bool);

    fn remove_from_superview(&self);

    fn set_shows_user_location(&self, shows: bool);

    fn camera(&self) -> MglCamera;

    fn set_camera(&self, camera: MglCamera, duration: Duration, completion: Callback<()>);

    /// `MGLAltitudeForZoomLevel` at the view's current size
    fn altitude_for_zoom_level(&self, zoom_level: f64, pitch: f64, latitude: f64) -> f64;

    fn zoom_level(&self) -> f64;

    fn set_zoom_level(&self, zoom_level: f64, animated: bool);

    fn center_coordinate(&self) -> LatLng;

    fn set_center_coordinate(&self, center: LatLng, animated: bool);

    fn add_annotations(&self, annotations: Vec<Annotation>) -> Vec<AnnotationHandle>;

    fn remove_annotations(&self, handles: &[AnnotationHandle]);

    fn select_annotation(&self, handle: AnnotationHandle, animated: bool);

    fn visible_coordinate_bounds(&self) -> LatLngBounds;

    fn set_visible_coordinate_bounds(
        &self,
        bounds: LatLngBounds,
        edge_padding: EdgeInsets,
        duration: Duration,
        completion: Callback<()>,
    );

    /// The listener receives the gesture location converted to a coordinate
    fn add_gesture_recognizer(&self, kind: GestureKind, listener: NativeListener<LatLng>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedAlways,
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedAlways | AuthorizationStatus::AuthorizedWhenInUse
        )
    }
}

pub trait IosMapSdk: Send + Sync {
    fn set_access_token(&self, token: &str);

    /// Bounds of the key window
    fn screen_bounds(&self) -> Frame;

    fn create_map_view(&self, options: &MglMapViewOptions) -> NativeResult<Arc<dyn MglMapView>>;

    /// Add the view to the key window's root view controller
    fn add_subview(&self, view: &Arc<dyn MglMapView>) -> NativeResult<()>;

    fn offline_storage(&self) -> Arc<dyn MglOfflineStorage>;

    fn location_authorization(&self) -> AuthorizationStatus;

    fn request_when_in_use_authorization(&self, callback: Callback<AuthorizationStatus>);
}

/// `MGLTilePyramidOfflineRegion`
#[derive(Debug, Clone, PartialEq)]
pub struct MglTilePyramidRegion {
    pub style_url: String,
    pub bounds: LatLngBounds,
    pub from_zoom: f64,
    pub to_zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflinePackState {
    Unknown,
    Inactive,
    Active,
    Complete,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OfflinePackProgress {
    pub count_of_resources_completed: u64,
    pub count_of_resources_expected: u64,
    pub count_of_bytes_completed: u64,
}

/// Notifications posted by the offline storage
#[derive(Debug, Clone, PartialEq)]
pub enum PackNotification {
    ProgressChanged {
        pack: u64,
        state: OfflinePackState,
        progress: OfflinePackProgress,
    },
    Error {
        pack: u64,
        message: String,
    },
    MaximumMapboxTilesReached {
        pack: u64,
        maximum: u64,
    },
}

impl PackNotification {
    pub fn pack(&self) -> u64 {
        match self {
            PackNotification::ProgressChanged { pack, .. }
            | PackNotification::Error { pack, .. }
            | PackNotification::MaximumMapboxTilesReached { pack, .. } => *pack,
        }
    }
}

/// `MGLOfflinePack`
pub trait MglOfflinePack: Send + Sync {
    fn id(&self) -> u64;

    fn region(&self) -> MglTilePyramidRegion;

    /// Opaque context blob stored with the pack
    fn context(&self) -> Vec<u8>;

    fn state(&self) -> OfflinePackState;

    fn resume(&self);

    fn suspend(&self);
}

/// `MGLOfflineStorage.sharedOfflineStorage`
pub trait MglOfflineStorage: Send + Sync {
    fn add_pack(
        &self,
        region: MglTilePyramidRegion,
        context: Vec<u8>,
        completion: Callback<NativeResult<Arc<dyn MglOfflinePack>>>,
    );

    fn packs(&self) -> Vec<Arc<dyn MglOfflinePack>>;

    fn remove_pack(&self, pack: &Arc<dyn MglOfflinePack>, completion: Callback<NativeResult<()>>);

    /// Returns a token for [`MglOfflineStorage::remove_observer`]
    fn add_observer(&self, observer: NativeListener<PackNotification>) -> u64;

    fn remove_observer(&self, token: u64);
}
