//! Adapter for the iOS map SDK

mod offline;
pub mod sdk;

#[cfg(test)]
pub(crate) mod fake;

use self::sdk::{
    Annotation, AnnotationHandle, EdgeInsets, GestureKind, IosMapSdk, MglCamera, MglMapView,
    MglMapViewDelegate, MglMapViewOptions, RegionChangeReason,
};
use crate::{
    core::{
        camera::{
            validate_zoom_level, AddPolygonOptions, AddPolylineOptions, AnimateCameraOptions,
            SetCenterOptions, SetTiltOptions, SetViewportOptions, SetZoomLevelOptions, Viewport,
            VIEWPORT_EDGE_PADDING,
        },
        config::{PlatformSettings, ShowOptions},
        geo::LatLng,
        listener::Listener,
        marker::{Marker, MarkerId, PolylineId},
        style::MapStyle,
    },
    offline::{DeleteOfflineRegionOptions, DownloadOfflineRegionOptions, OfflineRegion},
    platform::{
        session::{ListenerKind, SessionCore},
        Frame, NativeError, NativeListener, NativeResult, Platform,
    },
    registry::icon::{resolve_icons, IconCache, IconLoader},
    runtime::{async_delay, completion, lock, Callback},
    traits::{MapController, MapHandle, MapPlatform, MapState},
    MapError, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

type IosCore = SessionCore<AnnotationHandle, AnnotationHandle>;

/// [`MapPlatform`] implementation over [`IosMapSdk`]
pub struct IosPlatform {
    sdk: Arc<dyn IosMapSdk>,
    settings: PlatformSettings,
    icons: Arc<IconCache>,
    loader: Arc<dyn IconLoader>,
    shown: Mutex<Option<MapHandle>>,
    last_token: Mutex<Option<String>>,
}

impl IosPlatform {
    pub fn new(
        sdk: Arc<dyn IosMapSdk>,
        settings: PlatformSettings,
        loader: Arc<dyn IconLoader>,
    ) -> Self {
        Self {
            sdk,
            settings,
            icons: Arc::new(IconCache::new()),
            loader,
            shown: Mutex::new(None),
            last_token: Mutex::new(None),
        }
    }

    pub fn icon_cache(&self) -> &Arc<IconCache> {
        &self.icons
    }

    fn view_options(options: &ShowOptions, frame: Frame) -> MglMapViewOptions {
        MglMapViewOptions {
            frame,
            style_url: options.style.url().to_string(),
            center: options.center,
            zoom_level: options.zoom_level,
            logo_hidden: options.hide_logo,
            attribution_hidden: options.hide_attribution,
            compass_hidden: options.hide_compass,
            scale_bar_hidden: options.hide_scale_bar,
            rotate_enabled: !options.disable_rotation,
            scroll_enabled: !options.disable_scroll,
            zoom_enabled: !options.disable_zoom,
            pitch_enabled: !options.disable_tilt,
        }
    }

    fn token_for(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .or_else(|| lock(&self.last_token).clone())
            .ok_or(MapError::MissingAccessToken)
    }
}

#[async_trait]
impl MapPlatform for IosPlatform {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    async fn show(&self, overrides: Value) -> Result<MapHandle> {
        let options = ShowOptions::resolve(&overrides, &self.settings.defaults)?;
        let token = options.token().ok_or(MapError::MissingAccessToken)?.to_string();

        let previous = lock(&self.shown).take();
        if let Some(previous) = previous {
            log::debug!("destroying previously shown ios map");
            if let Err(e) = previous.destroy().await {
                log::warn!("Failed to destroy previous map: {}", e);
            }
        }
        *lock(&self.last_token) = Some(token);

        let frame = self.sdk.screen_bounds().inset(&options.margins);
        let handle = self.create_map(options, frame).await?;

        // another show may have finished while this one was constructing
        let stale = lock(&self.shown).replace(handle.clone());
        if let Some(stale) = stale {
            log::debug!("destroying ios map shown by an overlapping call");
            if let Err(e) = stale.destroy().await {
                log::warn!("Failed to destroy previous map: {}", e);
            }
        }
        Ok(handle)
    }

    async fn create_map(&self, options: ShowOptions, frame: Frame) -> Result<MapHandle> {
        let token = options.token().ok_or(MapError::MissingAccessToken)?.to_string();

        async_delay(options.delay()).await;
        async_delay(self.settings.startup_delay).await;

        self.sdk.set_access_token(&token);
        let view = self
            .sdk
            .create_map_view(&Self::view_options(&options, frame))?;

        let core = Arc::new(IosCore::new());
        let delegate = Arc::new(SessionDelegate::new(Arc::downgrade(&core)));
        let loaded = delegate.expect_style();
        view.set_delegate(Some(delegate.clone()));

        let attached = self.sdk.add_subview(&view);
        let loaded = match attached {
            Ok(()) => loaded.wait().await.and_then(|r| r.map_err(MapError::from)),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = loaded {
            view.set_delegate(None);
            view.remove_from_superview();
            return Err(e);
        }
        log::debug!("ios map view loaded style {}", options.style);

        if options.show_user_location {
            view.set_shows_user_location(true);
        }

        let session = IosMapSession {
            view,
            core,
            delegate,
            icons: self.icons.clone(),
            loader: self.loader.clone(),
        };
        if !options.markers.is_empty() {
            if let Err(e) = session.add_markers(options.markers.clone()).await {
                if let Err(err) = session.destroy().await {
                    log::warn!("Failed to destroy map after marker failure: {}", err);
                }
                return Err(e);
            }
        }
        Ok(Arc::new(session))
    }

    async fn download_offline_region(&self, options: DownloadOfflineRegionOptions) -> Result<()> {
        let token = self.token_for(options.access_token.as_deref())?;
        self.sdk.set_access_token(&token);
        offline::download(self.sdk.offline_storage().as_ref(), options).await
    }

    async fn list_offline_regions(&self) -> Result<Vec<OfflineRegion>> {
        Ok(offline::list(self.sdk.offline_storage().as_ref()))
    }

    async fn delete_offline_region(&self, options: DeleteOfflineRegionOptions) -> Result<()> {
        offline::delete(self.sdk.offline_storage().as_ref(), &options.name).await
    }

    async fn has_fine_location_permission(&self) -> Result<bool> {
        Ok(self.sdk.location_authorization().is_authorized())
    }

    async fn request_fine_location_permission(&self) -> Result<bool> {
        let status = self.sdk.location_authorization();
        if status != sdk::AuthorizationStatus::NotDetermined {
            return Ok(status.is_authorized());
        }
        let (callback, answered) = completion();
        self.sdk.request_when_in_use_authorization(callback);
        Ok(answered.wait().await?.is_authorized())
    }
}

/// Routes delegate callbacks into the session core.
///
/// Style loads are awaited by arming a one-shot callback before the load
/// starts; the next finish or failure settles it.
struct SessionDelegate {
    core: Weak<IosCore>,
    style_loaded: Mutex<Option<Callback<NativeResult<()>>>>,
}

impl SessionDelegate {
    fn new(core: Weak<IosCore>) -> Self {
        Self {
            core,
            style_loaded: Mutex::new(None),
        }
    }

    fn expect_style(&self) -> crate::runtime::Completion<NativeResult<()>> {
        let (callback, loaded) = completion();
        // a load still pending is superseded; its waiter sees a dropped callback
        *lock(&self.style_loaded) = Some(callback);
        loaded
    }

    fn settle_style(&self, result: NativeResult<()>) {
        let pending = lock(&self.style_loaded).take();
        match pending {
            Some(callback) => callback(result),
            None => log::debug!("style event without a pending load"),
        }
    }
}

impl MglMapViewDelegate for SessionDelegate {
    fn map_view_did_finish_loading_style(&self) {
        self.settle_style(Ok(()));
    }

    fn map_view_did_fail_loading_map(&self, error: NativeError) {
        log::warn!("Map failed to load: {}", error);
        self.settle_style(Err(error));
    }

    fn did_select_annotation(&self, annotation: AnnotationHandle) {
        if let Some(core) = self.core.upgrade() {
            core.dispatch_marker_tap(&annotation);
        }
    }

    fn tap_on_callout_for_annotation(&self, annotation: AnnotationHandle) {
        if let Some(core) = self.core.upgrade() {
            core.dispatch_callout_tap(&annotation);
        }
    }

    fn region_is_changing(&self) {
        if let Some(core) = self.core.upgrade() {
            core.dispatch_unit(ListenerKind::CameraMove);
        }
    }

    fn region_did_change(&self, reason: RegionChangeReason) {
        if reason == RegionChangeReason::TransitionCancelled {
            if let Some(core) = self.core.upgrade() {
                core.dispatch_unit(ListenerKind::CameraMoveCancel);
            }
        }
    }
}

/// One shown iOS map
pub struct IosMapSession {
    view: Arc<dyn MglMapView>,
    core: Arc<IosCore>,
    delegate: Arc<SessionDelegate>,
    icons: Arc<IconCache>,
    loader: Arc<dyn IconLoader>,
}

impl IosMapSession {
    fn recognizer(&self, kind: GestureKind, listener_kind: ListenerKind) {
        let core = Arc::downgrade(&self.core);
        let dispatcher: NativeListener<LatLng> = Arc::new(move |position: LatLng| {
            if let Some(core) = core.upgrade() {
                match listener_kind {
                    ListenerKind::Fling => {
                        core.dispatch_unit(listener_kind);
                    }
                    _ => {
                        core.dispatch_map(listener_kind, position);
                    }
                }
            }
        });
        self.view.add_gesture_recognizer(kind, dispatcher);
    }

    async fn fly_to(&self, camera: MglCamera, duration: Duration) -> Result<()> {
        let (callback, finished) = completion();
        self.view.set_camera(camera, duration, callback);
        finished.wait().await
    }

    fn add_annotation(&self, annotation: Annotation) -> Result<AnnotationHandle> {
        self.view
            .add_annotations(vec![annotation])
            .into_iter()
            .next()
            .ok_or_else(|| MapError::Native("annotation was not added".to_string()))
    }
}

#[async_trait]
impl MapController for IosMapSession {
    fn state(&self) -> MapState {
        self.core.state()
    }

    async fn hide(&self) -> Result<()> {
        self.core.ensure_live()?;
        self.view.set_hidden(true);
        Ok(())
    }

    async fn unhide(&self) -> Result<()> {
        self.core.ensure_live()?;
        self.view.set_hidden(false);
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        if !self.core.mark_destroyed() {
            return Ok(());
        }
        log::debug!("destroying ios map session");

        self.core.clear_listeners();
        lock(&self.core.markers).clear();
        lock(&self.core.polylines).clear();
        lock(&self.core.polygons).clear();

        self.view.set_delegate(None);
        self.view.remove_from_superview();
        Ok(())
    }

    async fn set_map_style(&self, style: &str) -> Result<()> {
        self.core.ensure_live()?;
        let style = MapStyle::parse(style);

        let loaded = self.delegate.expect_style();
        self.view.set_style_url(style.url());
        loaded.wait().await??;

        // listeners are bound to the previous style
        self.core.clear_listeners();
        Ok(())
    }

    async fn add_markers(&self, markers: Vec<Marker>) -> Result<()> {
        self.core.ensure_live()?;
        let icons = resolve_icons(&markers, self.loader.as_ref(), &self.icons).await;
        self.core.ensure_live()?;

        let annotations = markers
            .iter()
            .zip(icons)
            .map(|(marker, image)| Annotation::Point {
                coordinate: marker.position(),
                title: marker.title.clone(),
                subtitle: marker.subtitle.clone(),
                image,
            })
            .collect();
        let handles = self.view.add_annotations(annotations);
        if handles.len() != markers.len() {
            log::warn!(
                "added {} of {} marker annotations",
                handles.len(),
                markers.len()
            );
        }

        let mut selected = Vec::new();
        {
            let mut registry = lock(&self.core.markers);
            for (marker, handle) in markers.into_iter().zip(handles) {
                if marker.selected {
                    selected.push(handle);
                }
                registry.insert(marker, handle);
            }
        }
        // only one annotation can be selected at a time; the last one wins
        if let Some(handle) = selected.pop() {
            self.view.select_annotation(handle, false);
        }
        Ok(())
    }

    async fn remove_markers(&self, ids: Option<Vec<MarkerId>>) -> Result<()> {
        self.core.ensure_live()?;
        let handles: Vec<_> = lock(&self.core.markers)
            .remove(ids.as_deref())
            .into_iter()
            .map(|(_, handle)| handle)
            .collect();
        if !handles.is_empty() {
            self.view.remove_annotations(&handles);
        }
        Ok(())
    }

    fn markers(&self) -> Vec<Marker> {
        lock(&self.core.markers).entities()
    }

    async fn set_center(&self, options: SetCenterOptions) -> Result<()> {
        self.core.ensure_live()?;
        self.view
            .set_center_coordinate(options.center(), options.animated);
        Ok(())
    }

    async fn get_center(&self) -> Result<LatLng> {
        self.core.ensure_live()?;
        Ok(self.view.center_coordinate())
    }

    async fn set_zoom_level(&self, options: SetZoomLevelOptions) -> Result<()> {
        let zoom = validate_zoom_level(options.level)?;
        self.core.ensure_live()?;
        self.view.set_zoom_level(zoom, options.animated);
        Ok(())
    }

    async fn get_zoom_level(&self) -> Result<f64> {
        self.core.ensure_live()?;
        Ok(self.view.zoom_level())
    }

    async fn set_tilt(&self, options: SetTiltOptions) -> Result<()> {
        self.core.ensure_live()?;
        let camera = MglCamera {
            pitch: options.tilt(),
            ..self.view.camera()
        };
        self.fly_to(camera, options.duration()).await
    }

    async fn get_tilt(&self) -> Result<f64> {
        self.core.ensure_live()?;
        Ok(self.view.camera().pitch)
    }

    async fn animate_camera(&self, options: AnimateCameraOptions) -> Result<()> {
        if let Some(zoom) = options.zoom_level {
            validate_zoom_level(zoom)?;
        }
        self.core.ensure_live()?;
        let current = self.view.camera();
        let pitch = options.tilt.unwrap_or(current.pitch);
        let altitude = options
            .altitude
            .or_else(|| {
                options.zoom_level.map(|zoom| {
                    self.view
                        .altitude_for_zoom_level(zoom, pitch, options.target.lat)
                })
            })
            .unwrap_or(current.altitude);

        let camera = MglCamera {
            center: options.target,
            altitude,
            pitch,
            heading: options.bearing.unwrap_or(current.heading),
        };
        self.fly_to(camera, options.duration()).await
    }

    async fn add_polygon(&self, options: AddPolygonOptions) -> Result<()> {
        self.core.ensure_live()?;
        let handle = self.add_annotation(Annotation::Polygon {
            coordinates: options.points,
            fill_color: options.fill_color,
            alpha: options.fill_opacity.unwrap_or(1.0),
            stroke_color: options.stroke_color,
        })?;
        lock(&self.core.polygons).push(handle);
        Ok(())
    }

    async fn add_polyline(&self, options: AddPolylineOptions) -> Result<()> {
        self.core.ensure_live()?;
        let handle = self.add_annotation(Annotation::Polyline {
            coordinates: options.points.clone(),
            width: options.width,
            color: options.color.clone(),
            alpha: options.opacity,
        })?;
        lock(&self.core.polylines).insert(options, handle);
        Ok(())
    }

    async fn remove_polylines(&self, ids: Option<Vec<PolylineId>>) -> Result<()> {
        self.core.ensure_live()?;
        let handles: Vec<_> = lock(&self.core.polylines)
            .remove(ids.as_deref())
            .into_iter()
            .map(|(_, handle)| handle)
            .collect();
        if !handles.is_empty() {
            self.view.remove_annotations(&handles);
        }
        Ok(())
    }

    async fn set_on_map_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::MapClick, listener) {
            self.recognizer(GestureKind::Tap, ListenerKind::MapClick);
        }
        Ok(())
    }

    async fn set_on_map_long_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::MapLongClick, listener) {
            self.recognizer(GestureKind::LongPress, ListenerKind::MapLongClick);
        }
        Ok(())
    }

    async fn set_on_scroll_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::Scroll, listener) {
            self.recognizer(GestureKind::Pan, ListenerKind::Scroll);
        }
        Ok(())
    }

    async fn set_on_fling_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_unit(ListenerKind::Fling, listener) {
            self.recognizer(GestureKind::Swipe, ListenerKind::Fling);
        }
        Ok(())
    }

    async fn set_on_camera_move_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        // the delegate already forwards region changes
        self.core.set_listener_unit(ListenerKind::CameraMove, listener);
        Ok(())
    }

    async fn set_on_camera_move_cancel_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        self.core
            .set_listener_unit(ListenerKind::CameraMoveCancel, listener);
        Ok(())
    }

    async fn get_viewport(&self) -> Result<Viewport> {
        self.core.ensure_live()?;
        Ok(Viewport {
            bounds: self.view.visible_coordinate_bounds(),
            zoom_level: self.view.zoom_level(),
        })
    }

    async fn set_viewport(&self, options: SetViewportOptions) -> Result<()> {
        self.core.ensure_live()?;
        let (callback, finished) = completion();
        self.view.set_visible_coordinate_bounds(
            options.bounds,
            EdgeInsets::uniform(VIEWPORT_EDGE_PADDING),
            options.duration(),
            callback,
        );
        finished.wait().await
    }
}
