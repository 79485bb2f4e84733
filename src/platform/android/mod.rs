//! Adapter for the Android map SDK

mod offline;
pub mod sdk;

#[cfg(test)]
pub(crate) mod fake;

use self::sdk::{
    ActivityEvent, AndroidMapSdk, AndroidMapView, CameraPosition, CameraUpdate, MapboxMap,
    MapboxMapOptions, MarkerOptions, NativeAnnotationId, NativeMarkerId, PolygonOptions,
    PolylineOptions, ACCESS_FINE_LOCATION, RUNTIME_PERMISSIONS_SDK_INT,
};
use crate::{
    core::{
        camera::{
            validate_zoom_level, AddPolygonOptions, AddPolylineOptions, AnimateCameraOptions,
            SetCenterOptions, SetTiltOptions, SetViewportOptions, SetZoomLevelOptions, Viewport,
            CAMERA_MOVE_ANIMATION_MS, VIEWPORT_EDGE_PADDING,
        },
        config::{PlatformSettings, ShowOptions},
        geo::LatLng,
        listener::Listener,
        marker::{Marker, MarkerId, PolylineId},
        style::MapStyle,
    },
    offline::{DeleteOfflineRegionOptions, DownloadOfflineRegionOptions, OfflineRegion},
    platform::{session::ListenerKind, session::SessionCore, Frame, NativeListener, Platform},
    registry::icon::{resolve_icons, IconCache, IconLoader},
    runtime::{async_delay, completion, lock},
    traits::{MapController, MapHandle, MapPlatform, MapState},
    MapError, Result,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// [`MapPlatform`] implementation over [`AndroidMapSdk`]
pub struct AndroidPlatform {
    sdk: Arc<dyn AndroidMapSdk>,
    settings: PlatformSettings,
    icons: Arc<IconCache>,
    loader: Arc<dyn IconLoader>,
    shown: Mutex<Option<MapHandle>>,
    last_token: Mutex<Option<String>>,
}

impl AndroidPlatform {
    pub fn new(
        sdk: Arc<dyn AndroidMapSdk>,
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

    /// Process-wide icon cache shared by every map of this platform
    pub fn icon_cache(&self) -> &Arc<IconCache> {
        &self.icons
    }

    fn map_options(options: &ShowOptions) -> MapboxMapOptions {
        MapboxMapOptions {
            style_url: options.style.url().to_string(),
            camera: CameraPosition {
                target: options.center,
                zoom: options.zoom_level,
                tilt: 0.0,
                bearing: 0.0,
            },
            compass_enabled: !options.hide_compass,
            logo_enabled: !options.hide_logo,
            attribution_enabled: !options.hide_attribution,
            rotate_gestures_enabled: !options.disable_rotation,
            scroll_gestures_enabled: !options.disable_scroll,
            zoom_gestures_enabled: !options.disable_zoom,
            tilt_gestures_enabled: !options.disable_tilt,
        }
    }

    async fn load_map(
        &self,
        view: &Arc<dyn AndroidMapView>,
        options: &ShowOptions,
    ) -> Result<AndroidMapSession> {
        let (callback, map_ready) = completion();
        view.get_map_async(callback);
        let map = map_ready.wait().await?;
        log::debug!("android map object ready, loading style {}", options.style);

        let (callback, style_loaded) = completion();
        map.set_style(options.style.url(), callback);
        style_loaded.wait().await??;

        if options.show_user_location {
            map.set_my_location_enabled(true)?;
        }

        let session = AndroidMapSession::new(
            self.sdk.clone(),
            view.clone(),
            map,
            self.icons.clone(),
            self.loader.clone(),
        );
        session.install_marker_listeners();
        session.register_lifecycle();
        Ok(session)
    }

    pub(crate) fn token_for(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .or_else(|| lock(&self.last_token).clone())
            .ok_or(MapError::MissingAccessToken)
    }
}

#[async_trait]
impl MapPlatform for AndroidPlatform {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    async fn show(&self, overrides: Value) -> Result<MapHandle> {
        let options = ShowOptions::resolve(&overrides, &self.settings.defaults)?;
        let token = options.token().ok_or(MapError::MissingAccessToken)?.to_string();

        let previous = lock(&self.shown).take();
        if let Some(previous) = previous {
            log::debug!("destroying previously shown android map");
            if let Err(e) = previous.destroy().await {
                log::warn!("Failed to destroy previous map: {}", e);
            }
        }
        *lock(&self.last_token) = Some(token);

        let frame = self.sdk.screen_frame().inset(&options.margins);
        let handle = self.create_map(options, frame).await?;

        // another show may have finished while this one was constructing
        let stale = lock(&self.shown).replace(handle.clone());
        if let Some(stale) = stale {
            log::debug!("destroying android map shown by an overlapping call");
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

        self.sdk.set_access_token(&token)?;
        let view = self.sdk.create_map_view(&Self::map_options(&options))?;
        self.sdk.add_to_layout(&view, frame)?;
        log::debug!("android map view attached at {:?}", frame);

        let session = match self.load_map(&view, &options).await {
            Ok(session) => session,
            Err(e) => {
                if let Err(err) = self.sdk.remove_from_layout(&view) {
                    log::warn!("Failed to detach map view: {}", err);
                }
                if let Err(err) = view.on_destroy() {
                    log::warn!("Failed to destroy map view: {}", err);
                }
                return Err(e);
            }
        };

        // the session owns the lifecycle listener from here on
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
        offline::download(self.sdk.as_ref(), &token, options).await
    }

    async fn list_offline_regions(&self) -> Result<Vec<OfflineRegion>> {
        offline::list(self.sdk.offline_manager().as_ref()).await
    }

    async fn delete_offline_region(&self, options: DeleteOfflineRegionOptions) -> Result<()> {
        offline::delete(self.sdk.offline_manager().as_ref(), &options.name).await
    }

    async fn has_fine_location_permission(&self) -> Result<bool> {
        if self.sdk.sdk_int() < RUNTIME_PERMISSIONS_SDK_INT {
            return Ok(true);
        }
        Ok(self.sdk.check_self_permission(ACCESS_FINE_LOCATION))
    }

    async fn request_fine_location_permission(&self) -> Result<bool> {
        if self.sdk.sdk_int() < RUNTIME_PERMISSIONS_SDK_INT {
            return Ok(true);
        }
        let (callback, granted) = completion();
        self.sdk.request_permissions(&[ACCESS_FINE_LOCATION], callback);
        granted.wait().await
    }
}

/// One shown Android map
pub struct AndroidMapSession {
    sdk: Arc<dyn AndroidMapSdk>,
    view: Arc<dyn AndroidMapView>,
    map: Arc<dyn MapboxMap>,
    core: Arc<SessionCore<NativeMarkerId, NativeAnnotationId>>,
    icons: Arc<IconCache>,
    loader: Arc<dyn IconLoader>,
    lifecycle_token: Mutex<Option<u64>>,
}

impl AndroidMapSession {
    fn new(
        sdk: Arc<dyn AndroidMapSdk>,
        view: Arc<dyn AndroidMapView>,
        map: Arc<dyn MapboxMap>,
        icons: Arc<IconCache>,
        loader: Arc<dyn IconLoader>,
    ) -> Self {
        Self {
            sdk,
            view,
            map,
            core: Arc::new(SessionCore::new()),
            icons,
            loader,
            lifecycle_token: Mutex::new(None),
        }
    }

    fn install_marker_listeners(&self) {
        let core = Arc::downgrade(&self.core);
        self.map.set_on_marker_click_listener(Arc::new(move |id: NativeMarkerId| {
            core.upgrade()
                .map(|core| core.dispatch_marker_tap(&id))
                .unwrap_or(false)
        }));

        let core = Arc::downgrade(&self.core);
        self.map.set_on_info_window_click_listener(Arc::new(move |id: NativeMarkerId| {
            core.upgrade()
                .map(|core| core.dispatch_callout_tap(&id))
                .unwrap_or(false)
        }));
    }

    fn register_lifecycle(&self) {
        let view = Arc::downgrade(&self.view);
        let token = self
            .sdk
            .register_lifecycle_callbacks(Arc::new(move |event: ActivityEvent| {
                if let Some(view) = view.upgrade() {
                    view.on_lifecycle(event);
                }
            }));
        *lock(&self.lifecycle_token) = Some(token);
    }

    fn unregister_lifecycle(&self) {
        if let Some(token) = lock(&self.lifecycle_token).take() {
            self.sdk.unregister_lifecycle_callbacks(token);
        }
    }

    fn coordinate_dispatcher(&self, kind: ListenerKind) -> NativeListener<LatLng> {
        let core = Arc::downgrade(&self.core);
        Arc::new(move |position: LatLng| {
            if let Some(core) = core.upgrade() {
                core.dispatch_map(kind, position);
            }
        })
    }

    fn unit_dispatcher(&self, kind: ListenerKind) -> NativeListener<()> {
        let core = Arc::downgrade(&self.core);
        Arc::new(move |_: ()| {
            if let Some(core) = core.upgrade() {
                core.dispatch_unit(kind);
            }
        })
    }

    async fn animate(&self, update: CameraUpdate, duration: Duration) -> Result<()> {
        let (callback, finished) = completion();
        self.map.animate_camera(update, duration, callback)?;
        finished.wait().await
    }

    async fn move_to(&self, position: CameraPosition, animated: bool) -> Result<()> {
        let update = CameraUpdate::Position(position);
        if animated {
            self.animate(update, Duration::from_millis(CAMERA_MOVE_ANIMATION_MS))
                .await
        } else {
            Ok(self.map.move_camera(update)?)
        }
    }
}

#[async_trait]
impl MapController for AndroidMapSession {
    fn state(&self) -> MapState {
        self.core.state()
    }

    async fn hide(&self) -> Result<()> {
        self.core.ensure_live()?;
        Ok(self.view.set_visibility(false)?)
    }

    async fn unhide(&self) -> Result<()> {
        self.core.ensure_live()?;
        Ok(self.view.set_visibility(true)?)
    }

    async fn destroy(&self) -> Result<()> {
        if !self.core.mark_destroyed() {
            return Ok(());
        }
        log::debug!("destroying android map session");

        self.unregister_lifecycle();
        self.core.clear_listeners();
        lock(&self.core.markers).clear();
        lock(&self.core.polylines).clear();
        lock(&self.core.polygons).clear();

        if let Err(e) = self.sdk.remove_from_layout(&self.view) {
            log::warn!("Failed to detach map view: {}", e);
        }
        Ok(self.view.on_destroy()?)
    }

    async fn set_map_style(&self, style: &str) -> Result<()> {
        self.core.ensure_live()?;
        let style = MapStyle::parse(style);

        let (callback, loaded) = completion();
        self.map.set_style(style.url(), callback);
        loaded.wait().await??;

        // listeners are bound to the previous style
        self.core.clear_listeners();
        Ok(())
    }

    async fn add_markers(&self, markers: Vec<Marker>) -> Result<()> {
        self.core.ensure_live()?;
        let icons = resolve_icons(&markers, self.loader.as_ref(), &self.icons).await;
        // the map may have been destroyed while icons were downloading
        self.core.ensure_live()?;

        let options = markers
            .iter()
            .zip(icons)
            .map(|(marker, icon)| MarkerOptions {
                position: marker.position(),
                title: marker.title.clone(),
                snippet: marker.subtitle.clone(),
                icon,
            })
            .collect();
        let handles = self.map.add_markers(options)?;
        log::debug!("added {} markers", handles.len());

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
        for handle in selected {
            self.map.select_marker(handle)?;
        }
        Ok(())
    }

    async fn remove_markers(&self, ids: Option<Vec<MarkerId>>) -> Result<()> {
        self.core.ensure_live()?;
        let removed = lock(&self.core.markers).remove(ids.as_deref());

        let mut result = Ok(());
        for (_, handle) in removed {
            if let Err(e) = self.map.remove_marker(handle) {
                log::warn!("Failed to remove marker {}: {}", handle, e);
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result
    }

    fn markers(&self) -> Vec<Marker> {
        lock(&self.core.markers).entities()
    }

    async fn set_center(&self, options: SetCenterOptions) -> Result<()> {
        self.core.ensure_live()?;
        let position = CameraPosition {
            target: options.center(),
            ..self.map.camera_position()?
        };
        self.move_to(position, options.animated).await
    }

    async fn get_center(&self) -> Result<LatLng> {
        self.core.ensure_live()?;
        Ok(self.map.camera_position()?.target)
    }

    async fn set_zoom_level(&self, options: SetZoomLevelOptions) -> Result<()> {
        let zoom = validate_zoom_level(options.level)?;
        self.core.ensure_live()?;
        let position = CameraPosition {
            zoom,
            ..self.map.camera_position()?
        };
        self.move_to(position, options.animated).await
    }

    async fn get_zoom_level(&self) -> Result<f64> {
        self.core.ensure_live()?;
        Ok(self.map.camera_position()?.zoom)
    }

    async fn set_tilt(&self, options: SetTiltOptions) -> Result<()> {
        self.core.ensure_live()?;
        let position = CameraPosition {
            tilt: options.tilt(),
            ..self.map.camera_position()?
        };
        self.animate(CameraUpdate::Position(position), options.duration())
            .await
    }

    async fn get_tilt(&self) -> Result<f64> {
        self.core.ensure_live()?;
        Ok(self.map.camera_position()?.tilt)
    }

    async fn animate_camera(&self, options: AnimateCameraOptions) -> Result<()> {
        if let Some(zoom) = options.zoom_level {
            validate_zoom_level(zoom)?;
        }
        self.core.ensure_live()?;
        let current = self.map.camera_position()?;
        let position = CameraPosition {
            target: options.target,
            zoom: options.zoom_level.unwrap_or(current.zoom),
            tilt: options.tilt.unwrap_or(current.tilt),
            bearing: options.bearing.unwrap_or(current.bearing),
        };
        self.animate(CameraUpdate::Position(position), options.duration())
            .await
    }

    async fn add_polygon(&self, options: AddPolygonOptions) -> Result<()> {
        self.core.ensure_live()?;
        let handle = self.map.add_polygon(PolygonOptions {
            points: options.points,
            fill_color: options.fill_color,
            alpha: options.fill_opacity.unwrap_or(1.0),
            stroke_color: options.stroke_color,
        })?;
        lock(&self.core.polygons).push(handle);
        Ok(())
    }

    async fn add_polyline(&self, options: AddPolylineOptions) -> Result<()> {
        self.core.ensure_live()?;
        let handle = self.map.add_polyline(PolylineOptions {
            points: options.points.clone(),
            width: options.width,
            color: options.color.clone(),
            alpha: options.opacity,
        })?;
        lock(&self.core.polylines).insert(options, handle);
        Ok(())
    }

    async fn remove_polylines(&self, ids: Option<Vec<PolylineId>>) -> Result<()> {
        self.core.ensure_live()?;
        let removed = lock(&self.core.polylines).remove(ids.as_deref());
        let mut result = Ok(());
        for (_, handle) in removed {
            if let Err(e) = self.map.remove_annotation(handle) {
                log::warn!("Failed to remove polyline {}: {}", handle, e);
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result
    }

    async fn set_on_map_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::MapClick, listener) {
            self.map
                .add_on_map_click_listener(self.coordinate_dispatcher(ListenerKind::MapClick));
        }
        Ok(())
    }

    async fn set_on_map_long_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::MapLongClick, listener) {
            self.map.add_on_map_long_click_listener(
                self.coordinate_dispatcher(ListenerKind::MapLongClick),
            );
        }
        Ok(())
    }

    async fn set_on_scroll_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_map(ListenerKind::Scroll, listener) {
            // the move listener carries no position; report the camera target
            let core = Arc::downgrade(&self.core);
            let map = Arc::downgrade(&self.map);
            self.map.add_on_move_listener(Arc::new(move |_: ()| {
                if let (Some(core), Some(map)) = (core.upgrade(), map.upgrade()) {
                    match map.camera_position() {
                        Ok(position) => {
                            core.dispatch_map(ListenerKind::Scroll, position.target);
                        }
                        Err(e) => log::warn!("Scroll without camera position: {}", e),
                    }
                }
            }));
        }
        Ok(())
    }

    async fn set_on_fling_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_unit(ListenerKind::Fling, listener) {
            self.map
                .add_on_fling_listener(self.unit_dispatcher(ListenerKind::Fling));
        }
        Ok(())
    }

    async fn set_on_camera_move_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_unit(ListenerKind::CameraMove, listener) {
            self.map
                .add_on_camera_move_listener(self.unit_dispatcher(ListenerKind::CameraMove));
        }
        Ok(())
    }

    async fn set_on_camera_move_cancel_listener(&self, listener: Listener<()>) -> Result<()> {
        self.core.ensure_live()?;
        if self.core.set_listener_unit(ListenerKind::CameraMoveCancel, listener) {
            self.map.add_on_camera_move_cancel_listener(
                self.unit_dispatcher(ListenerKind::CameraMoveCancel),
            );
        }
        Ok(())
    }

    async fn get_viewport(&self) -> Result<Viewport> {
        self.core.ensure_live()?;
        Ok(Viewport {
            bounds: self.map.visible_region()?,
            zoom_level: self.map.camera_position()?.zoom,
        })
    }

    async fn set_viewport(&self, options: SetViewportOptions) -> Result<()> {
        self.core.ensure_live()?;
        let update = CameraUpdate::Bounds {
            bounds: options.bounds,
            padding: VIEWPORT_EDGE_PADDING,
        };
        if options.animated {
            self.animate(update, options.duration()).await
        } else {
            Ok(self.map.move_camera(update)?)
        }
    }
}
