//! In-memory Android SDK used by the adapter tests
//!
//! Callbacks fire synchronously from inside the SDK call, which is the
//! harshest ordering a real SDK can produce. Trigger methods stand in for
//! user gestures.

use super::sdk::*;
use crate::{
    core::geo::{LatLng, LatLngBounds},
    offline::RegionMetadata,
    platform::{Frame, NativeError, NativeListener, NativeResult},
    runtime::{lock, Callback},
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type ClickListener = Arc<dyn Fn(NativeMarkerId) -> bool + Send + Sync>;

pub(crate) struct FakeAndroidSdk {
    pub sdk_int: AtomicU32,
    pub permission_granted: AtomicBool,
    pub grant_on_request: AtomicBool,
    pub permission_requests: AtomicU32,
    pub fail_style: AtomicBool,
    /// Maps created while set reject every marker batch
    pub fail_markers: AtomicBool,
    pub tokens: Mutex<Vec<String>>,
    pub views: Mutex<Vec<Arc<FakeMapView>>>,
    pub offline: Arc<FakeOfflineManager>,
    screen: Frame,
    lifecycle: Mutex<Vec<(u64, NativeListener<ActivityEvent>)>>,
    next_token: AtomicU64,
}

impl FakeAndroidSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sdk_int: AtomicU32::new(30),
            permission_granted: AtomicBool::new(false),
            grant_on_request: AtomicBool::new(true),
            permission_requests: AtomicU32::new(0),
            fail_style: AtomicBool::new(false),
            fail_markers: AtomicBool::new(false),
            tokens: Mutex::new(Vec::new()),
            views: Mutex::new(Vec::new()),
            offline: Arc::new(FakeOfflineManager::default()),
            screen: Frame::new(0.0, 0.0, 400.0, 800.0),
            lifecycle: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        })
    }

    pub fn view(&self, index: usize) -> Arc<FakeMapView> {
        lock(&self.views)[index].clone()
    }

    pub fn last_view(&self) -> Arc<FakeMapView> {
        lock(&self.views).last().cloned().expect("no map view was created")
    }

    pub fn lifecycle_listeners(&self) -> usize {
        lock(&self.lifecycle).len()
    }

    fn find(&self, view: &Arc<dyn AndroidMapView>) -> NativeResult<Arc<FakeMapView>> {
        let target = Arc::as_ptr(view) as *const ();
        lock(&self.views)
            .iter()
            .find(|candidate| Arc::as_ptr(*candidate) as *const () == target)
            .cloned()
            .ok_or_else(|| NativeError::new("unknown view"))
    }

    pub fn emit_activity(&self, event: ActivityEvent) {
        let listeners: Vec<_> = lock(&self.lifecycle).iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl AndroidMapSdk for FakeAndroidSdk {
    fn sdk_int(&self) -> u32 {
        self.sdk_int.load(Ordering::SeqCst)
    }

    fn set_access_token(&self, token: &str) -> NativeResult<()> {
        lock(&self.tokens).push(token.to_string());
        Ok(())
    }

    fn screen_frame(&self) -> Frame {
        self.screen
    }

    fn pixel_ratio(&self) -> f64 {
        2.0
    }

    fn create_map_view(&self, options: &MapboxMapOptions) -> NativeResult<Arc<dyn AndroidMapView>> {
        let map = Arc::new(FakeMapboxMap::new(
            options.camera,
            self.fail_style.load(Ordering::SeqCst),
        ));
        map.fail_markers
            .store(self.fail_markers.load(Ordering::SeqCst), Ordering::SeqCst);
        let view = Arc::new(FakeMapView {
            options: options.clone(),
            map,
            frame: Mutex::new(None),
            visible: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
            lifecycle_events: Mutex::new(Vec::new()),
        });
        lock(&self.views).push(view.clone());
        Ok(view)
    }

    fn add_to_layout(&self, view: &Arc<dyn AndroidMapView>, frame: Frame) -> NativeResult<()> {
        let view = self.find(view)?;
        *lock(&view.frame) = Some(frame);
        Ok(())
    }

    fn remove_from_layout(&self, view: &Arc<dyn AndroidMapView>) -> NativeResult<()> {
        let view = self.find(view)?;
        let taken = lock(&view.frame).take();
        match taken {
            Some(_) => Ok(()),
            None => Err(NativeError::new("view is not in the layout")),
        }
    }

    fn offline_manager(&self) -> Arc<dyn AndroidOfflineManager> {
        self.offline.clone()
    }

    fn check_self_permission(&self, _permission: &str) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }

    fn request_permissions(&self, _permissions: &[&str], callback: Callback<bool>) {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let granted = self.grant_on_request.load(Ordering::SeqCst);
        self.permission_granted.store(granted, Ordering::SeqCst);
        callback(granted);
    }

    fn register_lifecycle_callbacks(&self, callback: NativeListener<ActivityEvent>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        lock(&self.lifecycle).push((token, callback));
        token
    }

    fn unregister_lifecycle_callbacks(&self, token: u64) {
        lock(&self.lifecycle).retain(|(t, _)| *t != token);
    }
}

pub(crate) struct FakeMapView {
    pub options: MapboxMapOptions,
    pub map: Arc<FakeMapboxMap>,
    /// `Some` while attached to the layout
    pub frame: Mutex<Option<Frame>>,
    pub visible: AtomicBool,
    pub destroyed: AtomicBool,
    pub lifecycle_events: Mutex<Vec<ActivityEvent>>,
}

impl FakeMapView {
    pub fn is_attached(&self) -> bool {
        lock(&self.frame).is_some()
    }
}

impl AndroidMapView for FakeMapView {
    fn get_map_async(&self, callback: Callback<Arc<dyn MapboxMap>>) {
        callback(self.map.clone());
    }

    fn set_visibility(&self, visible: bool) -> NativeResult<()> {
        self.visible.store(visible, Ordering::SeqCst);
        Ok(())
    }

    fn on_lifecycle(&self, event: ActivityEvent) {
        lock(&self.lifecycle_events).push(event);
    }

    fn on_destroy(&self) -> NativeResult<()> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct Listeners {
    marker_click: Option<ClickListener>,
    info_window_click: Option<ClickListener>,
    map_click: Vec<NativeListener<LatLng>>,
    map_long_click: Vec<NativeListener<LatLng>>,
    moves: Vec<NativeListener<()>>,
    fling: Vec<NativeListener<()>>,
    camera_move: Vec<NativeListener<()>>,
    camera_move_cancel: Vec<NativeListener<()>>,
}

pub(crate) struct FakeMapboxMap {
    fail_style: bool,
    pub fail_markers: AtomicBool,
    /// Annotation that refuses to be removed
    pub stuck_annotation: Mutex<Option<NativeAnnotationId>>,
    pub style: Mutex<Option<String>>,
    pub camera: Mutex<CameraPosition>,
    pub markers: Mutex<Vec<(NativeMarkerId, MarkerOptions)>>,
    pub selected: Mutex<Vec<NativeMarkerId>>,
    pub polylines: Mutex<Vec<(NativeAnnotationId, PolylineOptions)>>,
    pub polygons: Mutex<Vec<(NativeAnnotationId, PolygonOptions)>>,
    pub animations: Mutex<Vec<(CameraUpdate, Duration)>>,
    pub my_location: AtomicBool,
    listeners: Mutex<Listeners>,
    next_id: AtomicI64,
}

impl FakeMapboxMap {
    fn new(camera: CameraPosition, fail_style: bool) -> Self {
        Self {
            fail_style,
            fail_markers: AtomicBool::new(false),
            stuck_annotation: Mutex::new(None),
            style: Mutex::new(None),
            camera: Mutex::new(camera),
            markers: Mutex::new(Vec::new()),
            selected: Mutex::new(Vec::new()),
            polylines: Mutex::new(Vec::new()),
            polygons: Mutex::new(Vec::new()),
            animations: Mutex::new(Vec::new()),
            my_location: AtomicBool::new(false),
            listeners: Mutex::new(Listeners::default()),
            next_id: AtomicI64::new(100),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn apply(&self, update: CameraUpdate) {
        let mut camera = lock(&self.camera);
        match update {
            CameraUpdate::Position(position) => *camera = position,
            CameraUpdate::Bounds { bounds, .. } => camera.target = bounds.center(),
        }
    }

    pub fn marker_ids(&self) -> Vec<NativeMarkerId> {
        lock(&self.markers).iter().map(|(id, _)| *id).collect()
    }

    pub fn tap_marker(&self, id: NativeMarkerId) -> bool {
        let listener = lock(&self.listeners).marker_click.clone();
        listener.map(|l| l(id)).unwrap_or(false)
    }

    pub fn tap_info_window(&self, id: NativeMarkerId) -> bool {
        let listener = lock(&self.listeners).info_window_click.clone();
        listener.map(|l| l(id)).unwrap_or(false)
    }

    pub fn click(&self, position: LatLng) {
        let listeners = lock(&self.listeners).map_click.clone();
        listeners.iter().for_each(|l| l(position));
    }

    pub fn long_click(&self, position: LatLng) {
        let listeners = lock(&self.listeners).map_long_click.clone();
        listeners.iter().for_each(|l| l(position));
    }

    pub fn drag(&self) {
        let listeners = lock(&self.listeners).moves.clone();
        listeners.iter().for_each(|l| l(()));
    }

    pub fn fling(&self) {
        let listeners = lock(&self.listeners).fling.clone();
        listeners.iter().for_each(|l| l(()));
    }

    pub fn camera_moved(&self) {
        let listeners = lock(&self.listeners).camera_move.clone();
        listeners.iter().for_each(|l| l(()));
    }

    pub fn camera_move_cancelled(&self) {
        let listeners = lock(&self.listeners).camera_move_cancel.clone();
        listeners.iter().for_each(|l| l(()));
    }

    pub fn map_click_listener_count(&self) -> usize {
        lock(&self.listeners).map_click.len()
    }
}

impl MapboxMap for FakeMapboxMap {
    fn set_style(&self, style_url: &str, on_loaded: Callback<NativeResult<()>>) {
        if self.fail_style {
            on_loaded(Err(NativeError::new("style failed to load")));
            return;
        }
        *lock(&self.style) = Some(style_url.to_string());
        on_loaded(Ok(()));
    }

    fn camera_position(&self) -> NativeResult<CameraPosition> {
        Ok(*lock(&self.camera))
    }

    fn move_camera(&self, update: CameraUpdate) -> NativeResult<()> {
        self.apply(update);
        Ok(())
    }

    fn animate_camera(
        &self,
        update: CameraUpdate,
        duration: Duration,
        on_finish: Callback<()>,
    ) -> NativeResult<()> {
        self.apply(update);
        lock(&self.animations).push((update, duration));
        on_finish(());
        Ok(())
    }

    fn add_markers(&self, markers: Vec<MarkerOptions>) -> NativeResult<Vec<NativeMarkerId>> {
        if self.fail_markers.load(Ordering::SeqCst) {
            return Err(NativeError::new("marker batch rejected"));
        }
        let mut stored = lock(&self.markers);
        Ok(markers
            .into_iter()
            .map(|options| {
                let id = self.next_id();
                stored.push((id, options));
                id
            })
            .collect())
    }

    fn remove_marker(&self, id: NativeMarkerId) -> NativeResult<()> {
        let mut markers = lock(&self.markers);
        let before = markers.len();
        markers.retain(|(m, _)| *m != id);
        if markers.len() == before {
            return Err(NativeError::new(format!("unknown marker {}", id)));
        }
        Ok(())
    }

    fn select_marker(&self, id: NativeMarkerId) -> NativeResult<()> {
        lock(&self.selected).push(id);
        Ok(())
    }

    fn add_polyline(&self, options: PolylineOptions) -> NativeResult<NativeAnnotationId> {
        let id = self.next_id();
        lock(&self.polylines).push((id, options));
        Ok(id)
    }

    fn add_polygon(&self, options: PolygonOptions) -> NativeResult<NativeAnnotationId> {
        let id = self.next_id();
        lock(&self.polygons).push((id, options));
        Ok(id)
    }

    fn remove_annotation(&self, id: NativeAnnotationId) -> NativeResult<()> {
        if *lock(&self.stuck_annotation) == Some(id) {
            return Err(NativeError::new(format!("annotation {} is busy", id)));
        }
        lock(&self.polylines).retain(|(p, _)| *p != id);
        lock(&self.polygons).retain(|(p, _)| *p != id);
        Ok(())
    }

    fn visible_region(&self) -> NativeResult<LatLngBounds> {
        let target = lock(&self.camera).target;
        Ok(LatLngBounds::from_coords(
            target.lat - 1.0,
            target.lng - 1.0,
            target.lat + 1.0,
            target.lng + 1.0,
        ))
    }

    fn set_my_location_enabled(&self, enabled: bool) -> NativeResult<()> {
        self.my_location.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn set_on_marker_click_listener(&self, listener: ClickListener) {
        lock(&self.listeners).marker_click = Some(listener);
    }

    fn set_on_info_window_click_listener(&self, listener: ClickListener) {
        lock(&self.listeners).info_window_click = Some(listener);
    }

    fn add_on_map_click_listener(&self, listener: NativeListener<LatLng>) {
        lock(&self.listeners).map_click.push(listener);
    }

    fn add_on_map_long_click_listener(&self, listener: NativeListener<LatLng>) {
        lock(&self.listeners).map_long_click.push(listener);
    }

    fn add_on_move_listener(&self, listener: NativeListener<()>) {
        lock(&self.listeners).moves.push(listener);
    }

    fn add_on_fling_listener(&self, listener: NativeListener<()>) {
        lock(&self.listeners).fling.push(listener);
    }

    fn add_on_camera_move_listener(&self, listener: NativeListener<()>) {
        lock(&self.listeners).camera_move.push(listener);
    }

    fn add_on_camera_move_cancel_listener(&self, listener: NativeListener<()>) {
        lock(&self.listeners).camera_move_cancel.push(listener);
    }
}

/// Offline storage; every region replays `script` when its download starts
#[derive(Default)]
pub(crate) struct FakeOfflineManager {
    pub regions: Arc<Mutex<Vec<Arc<FakeOfflineRegion>>>>,
    pub script: Mutex<Vec<OfflineRegionStatus>>,
    pub fail_with: Mutex<Option<(String, String)>>,
    next_id: AtomicI64,
}

impl FakeOfflineManager {
    /// Store a region as if a previous download had created it
    pub fn seed(&self, name: &str) {
        let metadata = RegionMetadata::new(name).encode().unwrap();
        self.seed_raw(metadata);
    }

    pub fn seed_raw(&self, metadata: Vec<u8>) {
        let definition = OfflineRegionDefinition {
            style_url: "mapbox://styles/mapbox/streets-v11".to_string(),
            bounds: LatLngBounds::from_coords(0.0, 0.0, 1.0, 1.0),
            min_zoom: 1.0,
            max_zoom: 10.0,
            pixel_ratio: 1.0,
        };
        let region = self.region(definition, metadata);
        lock(&self.regions).push(region);
    }

    fn region(&self, definition: OfflineRegionDefinition, metadata: Vec<u8>) -> Arc<FakeOfflineRegion> {
        Arc::new(FakeOfflineRegion {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            definition,
            metadata,
            observer: Mutex::new(None),
            active: AtomicBool::new(false),
            script: lock(&self.script).clone(),
            fail_with: lock(&self.fail_with).clone(),
            store: self.regions.clone(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.regions)
            .iter()
            .map(|r| RegionMetadata::decode_name(&r.metadata))
            .collect()
    }
}

impl AndroidOfflineManager for FakeOfflineManager {
    fn create_offline_region(
        &self,
        definition: OfflineRegionDefinition,
        metadata: Vec<u8>,
        callback: Callback<NativeResult<Arc<dyn AndroidOfflineRegion>>>,
    ) {
        let region = self.region(definition, metadata);
        lock(&self.regions).push(region.clone());
        callback(Ok(region));
    }

    fn list_offline_regions(&self, callback: Callback<NativeResult<Vec<Arc<dyn AndroidOfflineRegion>>>>) {
        let regions = lock(&self.regions)
            .iter()
            .map(|r| r.clone() as Arc<dyn AndroidOfflineRegion>)
            .collect();
        callback(Ok(regions));
    }
}

pub(crate) struct FakeOfflineRegion {
    id: i64,
    pub definition: OfflineRegionDefinition,
    pub metadata: Vec<u8>,
    observer: Mutex<Option<Arc<dyn OfflineRegionObserver>>>,
    pub active: AtomicBool,
    script: Vec<OfflineRegionStatus>,
    fail_with: Option<(String, String)>,
    store: Arc<Mutex<Vec<Arc<FakeOfflineRegion>>>>,
}

impl AndroidOfflineRegion for FakeOfflineRegion {
    fn id(&self) -> i64 {
        self.id
    }

    fn definition(&self) -> OfflineRegionDefinition {
        self.definition.clone()
    }

    fn metadata(&self) -> Vec<u8> {
        self.metadata.clone()
    }

    fn set_observer(&self, observer: Arc<dyn OfflineRegionObserver>) {
        *lock(&self.observer) = Some(observer);
    }

    fn set_download_state(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
        if !active {
            return;
        }
        let observer = lock(&self.observer).clone();
        if let Some(observer) = observer {
            for status in &self.script {
                observer.on_status_changed(*status);
            }
            if let Some((reason, message)) = self.fail_with.clone() {
                observer.on_error(reason, message);
            }
        }
    }

    fn delete(&self, callback: Callback<NativeResult<()>>) {
        lock(&self.store).retain(|r| r.id != self.id);
        callback(Ok(()));
    }
}
