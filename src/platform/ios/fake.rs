//! In-memory iOS SDK used by the adapter tests
//!
//! The view loads its style synchronously when it joins the window and on
//! every style URL change, reporting to its delegate like the real view does.

use super::sdk::*;
use crate::{
    core::geo::{LatLng, LatLngBounds},
    offline::RegionMetadata,
    platform::{Frame, NativeError, NativeListener, NativeResult},
    runtime::{lock, Callback},
};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) struct FakeIosSdk {
    pub authorization: Mutex<AuthorizationStatus>,
    pub answer_on_request: Mutex<AuthorizationStatus>,
    pub authorization_requests: AtomicU32,
    pub fail_style: AtomicBool,
    pub tokens: Mutex<Vec<String>>,
    pub views: Mutex<Vec<Arc<FakeMglMapView>>>,
    pub storage: Arc<FakeOfflineStorage>,
    screen: Frame,
}

impl FakeIosSdk {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            authorization: Mutex::new(AuthorizationStatus::NotDetermined),
            answer_on_request: Mutex::new(AuthorizationStatus::AuthorizedWhenInUse),
            authorization_requests: AtomicU32::new(0),
            fail_style: AtomicBool::new(false),
            tokens: Mutex::new(Vec::new()),
            views: Mutex::new(Vec::new()),
            storage: Arc::new(FakeOfflineStorage::default()),
            screen: Frame::new(0.0, 0.0, 375.0, 812.0),
        })
    }

    pub fn view(&self, index: usize) -> Arc<FakeMglMapView> {
        lock(&self.views)[index].clone()
    }

    pub fn last_view(&self) -> Arc<FakeMglMapView> {
        lock(&self.views).last().cloned().expect("no map view was created")
    }
}

impl IosMapSdk for FakeIosSdk {
    fn set_access_token(&self, token: &str) {
        lock(&self.tokens).push(token.to_string());
    }

    fn screen_bounds(&self) -> Frame {
        self.screen
    }

    fn create_map_view(&self, options: &MglMapViewOptions) -> NativeResult<Arc<dyn MglMapView>> {
        let view = Arc::new(FakeMglMapView::new(
            options.clone(),
            self.fail_style.load(Ordering::SeqCst),
        ));
        lock(&self.views).push(view.clone());
        Ok(view)
    }

    fn add_subview(&self, view: &Arc<dyn MglMapView>) -> NativeResult<()> {
        let target = Arc::as_ptr(view) as *const ();
        let view = lock(&self.views)
            .iter()
            .find(|candidate| Arc::as_ptr(*candidate) as *const () == target)
            .cloned()
            .ok_or_else(|| NativeError::new("unknown view"))?;
        view.in_superview.store(true, Ordering::SeqCst);
        view.load_style();
        Ok(())
    }

    fn offline_storage(&self) -> Arc<dyn MglOfflineStorage> {
        self.storage.clone()
    }

    fn location_authorization(&self) -> AuthorizationStatus {
        *lock(&self.authorization)
    }

    fn request_when_in_use_authorization(&self, callback: Callback<AuthorizationStatus>) {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        let answer = *lock(&self.answer_on_request);
        *lock(&self.authorization) = answer;
        callback(answer);
    }
}

pub(crate) struct FakeMglMapView {
    pub options: MglMapViewOptions,
    fail_style: bool,
    delegate: Mutex<Option<Arc<dyn MglMapViewDelegate>>>,
    pub style_url: Mutex<String>,
    pub in_superview: AtomicBool,
    pub hidden: AtomicBool,
    pub shows_user_location: AtomicBool,
    pub camera: Mutex<MglCamera>,
    pub zoom: Mutex<f64>,
    pub annotations: Mutex<Vec<(AnnotationHandle, Annotation)>>,
    pub selected: Mutex<Vec<AnnotationHandle>>,
    pub camera_changes: Mutex<Vec<(MglCamera, Duration)>>,
    pub bounds_changes: Mutex<Vec<(LatLngBounds, EdgeInsets, Duration)>>,
    recognizers: Mutex<Vec<(GestureKind, NativeListener<LatLng>)>>,
    next_id: AtomicU64,
}

impl FakeMglMapView {
    fn new(options: MglMapViewOptions, fail_style: bool) -> Self {
        Self {
            fail_style,
            delegate: Mutex::new(None),
            style_url: Mutex::new(options.style_url.clone()),
            in_superview: AtomicBool::new(false),
            hidden: AtomicBool::new(false),
            shows_user_location: AtomicBool::new(false),
            camera: Mutex::new(MglCamera {
                center: options.center,
                altitude: 10_000.0,
                pitch: 0.0,
                heading: 0.0,
            }),
            zoom: Mutex::new(options.zoom_level),
            annotations: Mutex::new(Vec::new()),
            selected: Mutex::new(Vec::new()),
            camera_changes: Mutex::new(Vec::new()),
            bounds_changes: Mutex::new(Vec::new()),
            recognizers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            options,
        }
    }

    fn delegate(&self) -> Option<Arc<dyn MglMapViewDelegate>> {
        lock(&self.delegate).clone()
    }

    pub fn has_delegate(&self) -> bool {
        lock(&self.delegate).is_some()
    }

    fn load_style(&self) {
        if let Some(delegate) = self.delegate() {
            if self.fail_style {
                delegate.map_view_did_fail_loading_map(NativeError::new("style failed to load"));
            } else {
                delegate.map_view_did_finish_loading_style();
            }
        }
    }

    pub fn handles(&self) -> Vec<AnnotationHandle> {
        lock(&self.annotations).iter().map(|(h, _)| *h).collect()
    }

    pub fn recognizer_count(&self, kind: GestureKind) -> usize {
        lock(&self.recognizers).iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn gesture(&self, kind: GestureKind, position: LatLng) {
        let listeners: Vec<_> = lock(&self.recognizers)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| l.clone())
            .collect();
        listeners.iter().for_each(|l| l(position));
    }

    pub fn select(&self, handle: AnnotationHandle) {
        if let Some(delegate) = self.delegate() {
            delegate.did_select_annotation(handle);
        }
    }

    pub fn tap_callout(&self, handle: AnnotationHandle) {
        if let Some(delegate) = self.delegate() {
            delegate.tap_on_callout_for_annotation(handle);
        }
    }

    pub fn region_changing(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.region_is_changing();
        }
    }

    pub fn region_changed(&self, reason: RegionChangeReason) {
        if let Some(delegate) = self.delegate() {
            delegate.region_did_change(reason);
        }
    }
}

impl MglMapView for FakeMglMapView {
    fn set_delegate(&self, delegate: Option<Arc<dyn MglMapViewDelegate>>) {
        *lock(&self.delegate) = delegate;
    }

    fn set_style_url(&self, style_url: &str) {
        *lock(&self.style_url) = style_url.to_string();
        self.load_style();
    }

    fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }

    fn remove_from_superview(&self) {
        self.in_superview.store(false, Ordering::SeqCst);
    }

    fn set_shows_user_location(&self, shows: bool) {
        self.shows_user_location.store(shows, Ordering::SeqCst);
    }

    fn camera(&self) -> MglCamera {
        *lock(&self.camera)
    }

    fn set_camera(&self, camera: MglCamera, duration: Duration, completion: Callback<()>) {
        *lock(&self.camera) = camera;
        lock(&self.camera_changes).push((camera, duration));
        completion(());
    }

    fn altitude_for_zoom_level(&self, zoom_level: f64, _pitch: f64, _latitude: f64) -> f64 {
        1_000_000.0 / 2f64.powf(zoom_level)
    }

    fn zoom_level(&self) -> f64 {
        *lock(&self.zoom)
    }

    fn set_zoom_level(&self, zoom_level: f64, _animated: bool) {
        *lock(&self.zoom) = zoom_level;
    }

    fn center_coordinate(&self) -> LatLng {
        lock(&self.camera).center
    }

    fn set_center_coordinate(&self, center: LatLng, _animated: bool) {
        lock(&self.camera).center = center;
    }

    fn add_annotations(&self, annotations: Vec<Annotation>) -> Vec<AnnotationHandle> {
        let mut stored = lock(&self.annotations);
        annotations
            .into_iter()
            .map(|annotation| {
                let handle = self.next_id.fetch_add(1, Ordering::SeqCst);
                stored.push((handle, annotation));
                handle
            })
            .collect()
    }

    fn remove_annotations(&self, handles: &[AnnotationHandle]) {
        lock(&self.annotations).retain(|(h, _)| !handles.contains(h));
    }

    fn select_annotation(&self, handle: AnnotationHandle, _animated: bool) {
        lock(&self.selected).push(handle);
    }

    fn visible_coordinate_bounds(&self) -> LatLngBounds {
        let center = lock(&self.camera).center;
        LatLngBounds::from_coords(
            center.lat - 1.0,
            center.lng - 1.0,
            center.lat + 1.0,
            center.lng + 1.0,
        )
    }

    fn set_visible_coordinate_bounds(
        &self,
        bounds: LatLngBounds,
        edge_padding: EdgeInsets,
        duration: Duration,
        completion: Callback<()>,
    ) {
        lock(&self.camera).center = bounds.center();
        lock(&self.bounds_changes).push((bounds, edge_padding, duration));
        completion(());
    }

    fn add_gesture_recognizer(&self, kind: GestureKind, listener: NativeListener<LatLng>) {
        lock(&self.recognizers).push((kind, listener));
    }
}

type Observers = Arc<Mutex<Vec<(u64, NativeListener<PackNotification>)>>>;

/// Offline storage; resuming a pack posts `script` for it, preceded by a
/// completion notice for an unrelated pack.
#[derive(Default)]
pub(crate) struct FakeOfflineStorage {
    pub packs: Arc<Mutex<Vec<Arc<FakeOfflinePack>>>>,
    pub script: Mutex<Vec<(OfflinePackState, OfflinePackProgress)>>,
    pub fail_with: Mutex<Option<String>>,
    observers: Observers,
    next_id: AtomicU64,
    next_token: AtomicU64,
}

impl FakeOfflineStorage {
    pub fn seed(&self, name: &str) {
        let context = RegionMetadata::new(name).encode().unwrap();
        let region = MglTilePyramidRegion {
            style_url: "mapbox://styles/mapbox/outdoors-v11".to_string(),
            bounds: LatLngBounds::from_coords(0.0, 0.0, 1.0, 1.0),
            from_zoom: 2.0,
            to_zoom: 8.0,
        };
        let pack = self.pack(region, context);
        lock(&self.packs).push(pack);
    }

    fn pack(&self, region: MglTilePyramidRegion, context: Vec<u8>) -> Arc<FakeOfflinePack> {
        Arc::new(FakeOfflinePack {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            region,
            context,
            state: Mutex::new(OfflinePackState::Inactive),
            script: lock(&self.script).clone(),
            fail_with: lock(&self.fail_with).clone(),
            observers: self.observers.clone(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        lock(&self.packs)
            .iter()
            .map(|p| RegionMetadata::decode_name(&p.context))
            .collect()
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }
}

impl MglOfflineStorage for FakeOfflineStorage {
    fn add_pack(
        &self,
        region: MglTilePyramidRegion,
        context: Vec<u8>,
        completion: Callback<NativeResult<Arc<dyn MglOfflinePack>>>,
    ) {
        let pack = self.pack(region, context);
        lock(&self.packs).push(pack.clone());
        completion(Ok(pack));
    }

    fn packs(&self) -> Vec<Arc<dyn MglOfflinePack>> {
        lock(&self.packs)
            .iter()
            .map(|p| p.clone() as Arc<dyn MglOfflinePack>)
            .collect()
    }

    fn remove_pack(&self, pack: &Arc<dyn MglOfflinePack>, completion: Callback<NativeResult<()>>) {
        let id = pack.id();
        lock(&self.packs).retain(|p| p.id != id);
        completion(Ok(()));
    }

    fn add_observer(&self, observer: NativeListener<PackNotification>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        lock(&self.observers).push((token, observer));
        token
    }

    fn remove_observer(&self, token: u64) {
        lock(&self.observers).retain(|(t, _)| *t != token);
    }
}

pub(crate) struct FakeOfflinePack {
    id: u64,
    pub region: MglTilePyramidRegion,
    pub context: Vec<u8>,
    pub state: Mutex<OfflinePackState>,
    script: Vec<(OfflinePackState, OfflinePackProgress)>,
    fail_with: Option<String>,
    observers: Observers,
}

impl FakeOfflinePack {
    fn post(&self, notification: PackNotification) {
        let observers: Vec<_> = lock(&self.observers).iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer(notification.clone());
        }
    }
}

impl MglOfflinePack for FakeOfflinePack {
    fn id(&self) -> u64 {
        self.id
    }

    fn region(&self) -> MglTilePyramidRegion {
        self.region.clone()
    }

    fn context(&self) -> Vec<u8> {
        self.context.clone()
    }

    fn state(&self) -> OfflinePackState {
        *lock(&self.state)
    }

    fn resume(&self) {
        *lock(&self.state) = OfflinePackState::Active;
        self.post(PackNotification::ProgressChanged {
            pack: u64::MAX,
            state: OfflinePackState::Complete,
            progress: OfflinePackProgress::default(),
        });
        for (state, progress) in &self.script {
            *lock(&self.state) = *state;
            self.post(PackNotification::ProgressChanged {
                pack: self.id,
                state: *state,
                progress: *progress,
            });
        }
        if let Some(message) = self.fail_with.clone() {
            self.post(PackNotification::Error {
                pack: self.id,
                message,
            });
        }
    }

    fn suspend(&self) {
        *lock(&self.state) = OfflinePackState::Inactive;
    }
}
