//! Embeddable map view
//!
//! A [`MapView`] owns one map, constructed lazily once the view has both a
//! layout and an access token. It implements [`MapController`] by forwarding
//! to that map, and reports what happens to it as [`MapViewEvent`]s.
//!
//! ```rust,ignore
//! let view = MapView::new(platform, MapViewConfig::new().access_token(token).zoom(12.0));
//! view.attach(LayoutContext::new(Frame::new(0.0, 0.0, 320.0, 240.0)));
//! let map = view.ready().await?;
//! map.add_markers(initial_markers).await?;
//! ```

use crate::{
    core::{
        camera::{
            AddPolygonOptions, AddPolylineOptions, AnimateCameraOptions, SetCenterOptions,
            SetTiltOptions, SetViewportOptions, SetZoomLevelOptions, Viewport,
        },
        config::{Margins, ShowOptions},
        geo::LatLng,
        listener::Listener,
        marker::{Marker, MarkerId, PolylineId},
        style::MapStyle,
    },
    platform::Frame,
    runtime::{lock, spawn, Deferred},
    traits::{MapController, MapHandle, MapPlatform, MapState},
    MapError, Result,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Typed view properties
#[derive(Debug, Clone, PartialEq)]
pub struct MapViewConfig {
    pub access_token: Option<String>,
    pub style: MapStyle,
    pub center: LatLng,
    pub zoom_level: f64,
    pub show_user_location: bool,
    pub hide_logo: bool,
    pub hide_attribution: bool,
    pub hide_compass: bool,
    pub hide_scale_bar: bool,
    pub disable_rotation: bool,
    pub disable_scroll: bool,
    pub disable_zoom: bool,
    pub disable_tilt: bool,
    /// Milliseconds to wait before constructing the native map
    pub delay: u64,
}

impl Default for MapViewConfig {
    fn default() -> Self {
        let defaults = ShowOptions::default();
        Self {
            access_token: None,
            style: defaults.style,
            center: defaults.center,
            zoom_level: defaults.zoom_level,
            show_user_location: defaults.show_user_location,
            hide_logo: defaults.hide_logo,
            hide_attribution: defaults.hide_attribution,
            hide_compass: defaults.hide_compass,
            hide_scale_bar: defaults.hide_scale_bar,
            disable_rotation: defaults.disable_rotation,
            disable_scroll: defaults.disable_scroll,
            disable_zoom: defaults.disable_zoom,
            disable_tilt: defaults.disable_tilt,
            delay: defaults.delay,
        }
    }
}

impl MapViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn style(mut self, style: MapStyle) -> Self {
        self.style = style;
        self
    }

    pub fn center(mut self, lat: f64, lng: f64) -> Self {
        self.center = LatLng::new(lat, lng);
        self
    }

    pub fn zoom(mut self, zoom_level: f64) -> Self {
        self.zoom_level = zoom_level;
        self
    }

    pub fn show_user_location(mut self, show: bool) -> Self {
        self.show_user_location = show;
        self
    }

    pub fn hide_logo(mut self, hide: bool) -> Self {
        self.hide_logo = hide;
        self
    }

    pub fn hide_attribution(mut self, hide: bool) -> Self {
        self.hide_attribution = hide;
        self
    }

    pub fn hide_compass(mut self, hide: bool) -> Self {
        self.hide_compass = hide;
        self
    }

    pub fn hide_scale_bar(mut self, hide: bool) -> Self {
        self.hide_scale_bar = hide;
        self
    }

    pub fn disable_rotation(mut self, disable: bool) -> Self {
        self.disable_rotation = disable;
        self
    }

    pub fn disable_scroll(mut self, disable: bool) -> Self {
        self.disable_scroll = disable;
        self
    }

    pub fn disable_zoom(mut self, disable: bool) -> Self {
        self.disable_zoom = disable;
        self
    }

    pub fn disable_tilt(mut self, disable: bool) -> Self {
        self.disable_tilt = disable;
        self
    }

    pub fn delay(mut self, millis: u64) -> Self {
        self.delay = millis;
        self
    }

    fn token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Options for constructing the map. The view fills its frame, so there
    /// are no margins.
    pub fn to_show_options(&self) -> ShowOptions {
        ShowOptions {
            style: self.style.clone(),
            access_token: self.access_token.clone(),
            margins: Margins::default(),
            center: self.center,
            zoom_level: self.zoom_level,
            show_user_location: self.show_user_location,
            hide_logo: self.hide_logo,
            hide_attribution: self.hide_attribution,
            hide_compass: self.hide_compass,
            hide_scale_bar: self.hide_scale_bar,
            disable_rotation: self.disable_rotation,
            disable_scroll: self.disable_scroll,
            disable_zoom: self.disable_zoom,
            disable_tilt: self.disable_tilt,
            markers: Vec::new(),
            delay: self.delay,
        }
    }
}

/// Where the host placed the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    pub frame: Frame,
}

impl LayoutContext {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapViewEvent {
    /// The map finished construction and its first style load
    MapReady,
    MapDestroyed,
    MapClick(LatLng),
    MapLongClick(LatLng),
    Scroll(LatLng),
    Fling,
    CameraMove,
    CameraMoveCancel,
}

#[derive(Default)]
struct UserListeners {
    map_click: Option<Listener<LatLng>>,
    map_long_click: Option<Listener<LatLng>>,
    scroll: Option<Listener<LatLng>>,
    fling: Option<Listener<()>>,
    camera_move: Option<Listener<()>>,
    camera_move_cancel: Option<Listener<()>>,
}

/// State shared with the construction task and the event forwarders
struct Shared {
    map: Mutex<Option<MapHandle>>,
    ready: Deferred<MapHandle>,
    events: broadcast::Sender<MapViewEvent>,
    listeners: Mutex<UserListeners>,
    detached: AtomicBool,
}

impl Shared {
    fn emit(&self, event: MapViewEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Install the forwarders that turn map events into view events and calls to
/// the listeners registered on the view.
async fn install_forwarders(map: &MapHandle, shared: &Arc<Shared>) -> Result<()> {
    fn coordinate(
        shared: &Arc<Shared>,
        event: fn(LatLng) -> MapViewEvent,
        slot: fn(&UserListeners) -> Option<Listener<LatLng>>,
    ) -> Listener<LatLng> {
        let shared: Weak<Shared> = Arc::downgrade(shared);
        Listener::new(move |position: LatLng| {
            if let Some(shared) = shared.upgrade() {
                shared.emit(event(position));
                let listener = slot(&lock(&shared.listeners));
                if let Some(listener) = listener {
                    listener.call(position);
                }
            }
        })
    }

    fn unit(
        shared: &Arc<Shared>,
        event: MapViewEvent,
        slot: fn(&UserListeners) -> Option<Listener<()>>,
    ) -> Listener<()> {
        let shared: Weak<Shared> = Arc::downgrade(shared);
        Listener::new(move |_: ()| {
            if let Some(shared) = shared.upgrade() {
                shared.emit(event.clone());
                let listener = slot(&lock(&shared.listeners));
                if let Some(listener) = listener {
                    listener.call(());
                }
            }
        })
    }

    map.set_on_map_click_listener(coordinate(shared, MapViewEvent::MapClick, |l| {
        l.map_click.clone()
    }))
    .await?;
    map.set_on_map_long_click_listener(coordinate(shared, MapViewEvent::MapLongClick, |l| {
        l.map_long_click.clone()
    }))
    .await?;
    map.set_on_scroll_listener(coordinate(shared, MapViewEvent::Scroll, |l| {
        l.scroll.clone()
    }))
    .await?;
    map.set_on_fling_listener(unit(shared, MapViewEvent::Fling, |l| l.fling.clone()))
        .await?;
    map.set_on_camera_move_listener(unit(shared, MapViewEvent::CameraMove, |l| {
        l.camera_move.clone()
    }))
    .await?;
    map.set_on_camera_move_cancel_listener(unit(shared, MapViewEvent::CameraMoveCancel, |l| {
        l.camera_move_cancel.clone()
    }))
    .await?;
    Ok(())
}

/// A view that owns its own map instance
pub struct MapView {
    platform: Arc<dyn MapPlatform>,
    config: Mutex<MapViewConfig>,
    layout: Mutex<Option<LayoutContext>>,
    started: AtomicBool,
    shared: Arc<Shared>,
}

impl MapView {
    pub fn new(platform: Arc<dyn MapPlatform>, config: MapViewConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            platform,
            config: Mutex::new(config),
            layout: Mutex::new(None),
            started: AtomicBool::new(false),
            shared: Arc::new(Shared {
                map: Mutex::new(None),
                ready: Deferred::new(),
                events,
                listeners: Mutex::new(UserListeners::default()),
                detached: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> MapViewConfig {
        lock(&self.config).clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MapViewEvent> {
        self.shared.events.subscribe()
    }

    /// Resolves with the map once it is ready. Fails when construction fails
    /// or the view is detached first. Safe to await any number of times.
    pub async fn ready(&self) -> Result<MapHandle> {
        self.shared.ready.wait().await
    }

    /// Give the view its layout. Construction starts as soon as an access
    /// token is configured too. Must be called inside a tokio runtime.
    pub fn attach(&self, layout: LayoutContext) {
        if self.shared.detached.load(Ordering::SeqCst) {
            log::warn!("MapView::attach() - view was already detached");
            return;
        }
        *lock(&self.layout) = Some(layout);
        self.try_construct();
    }

    /// Replace the view's properties.
    ///
    /// Style, center and zoom are applied to a ready map right away. Other
    /// properties take effect the next time a map is constructed.
    pub async fn apply_config(&self, config: MapViewConfig) -> Result<()> {
        let map = lock(&self.shared.map).clone();
        let Some(map) = map else {
            *lock(&self.config) = config;
            self.try_construct();
            return Ok(());
        };

        // live properties keep their old values until the map accepts them
        let previous = self.config();
        let mut applied = MapViewConfig {
            style: previous.style,
            center: previous.center,
            zoom_level: previous.zoom_level,
            ..config.clone()
        };
        let result = self.apply_live(&map, &config, &mut applied).await;
        *lock(&self.config) = applied;
        result
    }

    async fn apply_live(
        &self,
        map: &MapHandle,
        config: &MapViewConfig,
        applied: &mut MapViewConfig,
    ) -> Result<()> {
        if config.style != applied.style {
            self.set_map_style(&config.style.to_string()).await?;
            applied.style = config.style.clone();
        }
        if config.center != applied.center {
            map.set_center(SetCenterOptions::new(config.center).animated(false))
                .await?;
            applied.center = config.center;
        }
        if config.zoom_level != applied.zoom_level {
            map.set_zoom_level(SetZoomLevelOptions::new(config.zoom_level).animated(false))
                .await?;
            applied.zoom_level = config.zoom_level;
        }
        Ok(())
    }

    fn try_construct(&self) {
        let Some(layout) = *lock(&self.layout) else {
            return;
        };
        let config = self.config();
        if config.token().is_none() {
            log::debug!("map view is laid out but has no access token yet");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let platform = self.platform.clone();
        let shared = self.shared.clone();
        let options = config.to_show_options();
        spawn(async move {
            let map = match platform.create_map(options, layout.frame).await {
                Ok(map) => map,
                Err(e) => {
                    log::warn!("Failed to construct map view: {}", e);
                    shared.ready.reject(e.to_string());
                    return;
                }
            };

            if let Err(e) = install_forwarders(&map, &shared).await {
                log::warn!("Failed to forward map events: {}", e);
            }

            // detach() raises the flag before taking the slot
            let stored = {
                let mut slot = lock(&shared.map);
                if shared.detached.load(Ordering::SeqCst) {
                    false
                } else {
                    *slot = Some(map.clone());
                    true
                }
            };
            if !stored {
                log::debug!("map view was detached during construction");
                if let Err(e) = map.destroy().await {
                    log::warn!("Failed to destroy map: {}", e);
                }
                return;
            }
            shared.ready.resolve(map);
            shared.emit(MapViewEvent::MapReady);
        });
    }

    /// Remove the view from the UI. Destroys its map; calls afterwards fail
    /// with [`MapError::NoMap`]. Detaching twice is a no-op.
    pub async fn detach(&self) -> Result<()> {
        if self.shared.detached.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.ready.reject("map view was detached");
        *lock(&self.shared.listeners) = UserListeners::default();

        let map = lock(&self.shared.map).take();
        let result = match map {
            Some(map) => map.destroy().await,
            None => Ok(()),
        };
        self.shared.emit(MapViewEvent::MapDestroyed);
        result
    }

    fn map(&self) -> Result<MapHandle> {
        if self.shared.detached.load(Ordering::SeqCst) {
            return Err(MapError::NoMap);
        }
        lock(&self.shared.map).clone().ok_or(MapError::NotReady)
    }
}

#[async_trait]
impl MapController for MapView {
    fn state(&self) -> MapState {
        if self.shared.detached.load(Ordering::SeqCst) {
            return MapState::Destroyed;
        }
        match lock(&self.shared.map).as_ref() {
            Some(map) => map.state(),
            None => MapState::Constructing,
        }
    }

    async fn hide(&self) -> Result<()> {
        self.map()?.hide().await
    }

    async fn unhide(&self) -> Result<()> {
        self.map()?.unhide().await
    }

    async fn destroy(&self) -> Result<()> {
        self.detach().await
    }

    async fn set_map_style(&self, style: &str) -> Result<()> {
        let map = self.map()?;
        map.set_map_style(style).await?;
        // the switch dropped every listener; view events keep flowing, the
        // listeners registered on the view do not
        *lock(&self.shared.listeners) = UserListeners::default();
        install_forwarders(&map, &self.shared).await
    }

    async fn add_markers(&self, markers: Vec<Marker>) -> Result<()> {
        self.map()?.add_markers(markers).await
    }

    async fn remove_markers(&self, ids: Option<Vec<MarkerId>>) -> Result<()> {
        self.map()?.remove_markers(ids).await
    }

    fn markers(&self) -> Vec<Marker> {
        self.map().map(|map| map.markers()).unwrap_or_default()
    }

    async fn set_center(&self, options: SetCenterOptions) -> Result<()> {
        self.map()?.set_center(options).await
    }

    async fn get_center(&self) -> Result<LatLng> {
        self.map()?.get_center().await
    }

    async fn set_zoom_level(&self, options: SetZoomLevelOptions) -> Result<()> {
        self.map()?.set_zoom_level(options).await
    }

    async fn get_zoom_level(&self) -> Result<f64> {
        self.map()?.get_zoom_level().await
    }

    async fn set_tilt(&self, options: SetTiltOptions) -> Result<()> {
        self.map()?.set_tilt(options).await
    }

    async fn get_tilt(&self) -> Result<f64> {
        self.map()?.get_tilt().await
    }

    async fn animate_camera(&self, options: AnimateCameraOptions) -> Result<()> {
        self.map()?.animate_camera(options).await
    }

    async fn add_polygon(&self, options: AddPolygonOptions) -> Result<()> {
        self.map()?.add_polygon(options).await
    }

    async fn add_polyline(&self, options: AddPolylineOptions) -> Result<()> {
        self.map()?.add_polyline(options).await
    }

    async fn remove_polylines(&self, ids: Option<Vec<PolylineId>>) -> Result<()> {
        self.map()?.remove_polylines(ids).await
    }

    async fn set_on_map_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).map_click = Some(listener);
        Ok(())
    }

    async fn set_on_map_long_click_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).map_long_click = Some(listener);
        Ok(())
    }

    async fn set_on_scroll_listener(&self, listener: Listener<LatLng>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).scroll = Some(listener);
        Ok(())
    }

    async fn set_on_fling_listener(&self, listener: Listener<()>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).fling = Some(listener);
        Ok(())
    }

    async fn set_on_camera_move_listener(&self, listener: Listener<()>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).camera_move = Some(listener);
        Ok(())
    }

    async fn set_on_camera_move_cancel_listener(&self, listener: Listener<()>) -> Result<()> {
        self.map()?;
        lock(&self.shared.listeners).camera_move_cancel = Some(listener);
        Ok(())
    }

    async fn get_viewport(&self) -> Result<Viewport> {
        self.map()?.get_viewport().await
    }

    async fn set_viewport(&self, options: SetViewportOptions) -> Result<()> {
        self.map()?.set_viewport(options).await
    }
}
