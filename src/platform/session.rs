//! State shared by both platform map sessions
//!
//! Native listeners capture a `Weak<SessionCore>` so a destroyed session is
//! freed even when the native SDK keeps its listener closures alive. Every
//! lock taken here is released before control returns to native code or to a
//! caller-supplied listener.

use crate::{
    core::{geo::LatLng, listener::Listener, marker::Marker},
    registry::{MarkerRegistry, PolylineRegistry},
    runtime::lock,
    traits::MapState,
    MapError, Result,
};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ListenerKind {
    MapClick,
    MapLongClick,
    Scroll,
    Fling,
    CameraMove,
    CameraMoveCancel,
}

#[derive(Debug, Default)]
struct ListenerSlots {
    map_click: Option<Listener<LatLng>>,
    map_long_click: Option<Listener<LatLng>>,
    scroll: Option<Listener<LatLng>>,
    fling: Option<Listener<()>>,
    camera_move: Option<Listener<()>>,
    camera_move_cancel: Option<Listener<()>>,
}

/// Registries, listener slots and lifecycle state of one map instance.
///
/// `M` and `L` are the native marker and line handle types.
#[derive(Debug)]
pub(crate) struct SessionCore<M, L> {
    pub markers: Mutex<MarkerRegistry<M>>,
    pub polylines: Mutex<PolylineRegistry<L>>,
    /// Polygon handles; polygons are not addressable by id
    pub polygons: Mutex<Vec<L>>,
    listeners: Mutex<ListenerSlots>,
    installed: Mutex<Vec<ListenerKind>>,
    state: Mutex<MapState>,
}

impl<M: PartialEq + Clone, L: PartialEq + Clone> SessionCore<M, L> {
    pub fn new() -> Self {
        Self {
            markers: Mutex::new(MarkerRegistry::markers()),
            polylines: Mutex::new(PolylineRegistry::polylines()),
            polygons: Mutex::new(Vec::new()),
            listeners: Mutex::new(ListenerSlots::default()),
            installed: Mutex::new(Vec::new()),
            state: Mutex::new(MapState::Ready),
        }
    }

    pub fn state(&self) -> MapState {
        *lock(&self.state)
    }

    /// Fails with [`MapError::NoMap`] once the map is destroyed
    pub fn ensure_live(&self) -> Result<()> {
        match self.state() {
            MapState::Destroyed => Err(MapError::NoMap),
            _ => Ok(()),
        }
    }

    /// Flip to destroyed. Returns `false` when it already was.
    pub fn mark_destroyed(&self) -> bool {
        let mut state = lock(&self.state);
        if *state == MapState::Destroyed {
            return false;
        }
        *state = MapState::Destroyed;
        true
    }

    /// Store a listener. Returns `true` when the native side has no
    /// dispatcher for this kind yet and the caller must install one.
    pub fn set_listener_map(&self, kind: ListenerKind, listener: Listener<LatLng>) -> bool {
        {
            let mut slots = lock(&self.listeners);
            match kind {
                ListenerKind::MapClick => slots.map_click = Some(listener),
                ListenerKind::MapLongClick => slots.map_long_click = Some(listener),
                ListenerKind::Scroll => slots.scroll = Some(listener),
                _ => log::warn!("{:?} does not carry a coordinate", kind),
            }
        }
        self.mark_installed(kind)
    }

    pub fn set_listener_unit(&self, kind: ListenerKind, listener: Listener<()>) -> bool {
        {
            let mut slots = lock(&self.listeners);
            match kind {
                ListenerKind::Fling => slots.fling = Some(listener),
                ListenerKind::CameraMove => slots.camera_move = Some(listener),
                ListenerKind::CameraMoveCancel => slots.camera_move_cancel = Some(listener),
                _ => log::warn!("{:?} carries a coordinate", kind),
            }
        }
        self.mark_installed(kind)
    }

    fn mark_installed(&self, kind: ListenerKind) -> bool {
        let mut installed = lock(&self.installed);
        if installed.contains(&kind) {
            false
        } else {
            installed.push(kind);
            true
        }
    }

    /// Drop every application listener. Native dispatchers stay installed and
    /// become no-ops until a listener is set again.
    pub fn clear_listeners(&self) {
        *lock(&self.listeners) = ListenerSlots::default();
    }

    /// Invoke the listener for a coordinate event. Returns whether one ran.
    pub fn dispatch_map(&self, kind: ListenerKind, position: LatLng) -> bool {
        if self.ensure_live().is_err() {
            return false;
        }
        let listener = {
            let slots = lock(&self.listeners);
            match kind {
                ListenerKind::MapClick => slots.map_click.clone(),
                ListenerKind::MapLongClick => slots.map_long_click.clone(),
                ListenerKind::Scroll => slots.scroll.clone(),
                _ => None,
            }
        };
        match listener {
            Some(listener) => {
                listener.call(position);
                true
            }
            None => false,
        }
    }

    pub fn dispatch_unit(&self, kind: ListenerKind) -> bool {
        if self.ensure_live().is_err() {
            return false;
        }
        let listener = {
            let slots = lock(&self.listeners);
            match kind {
                ListenerKind::Fling => slots.fling.clone(),
                ListenerKind::CameraMove => slots.camera_move.clone(),
                ListenerKind::CameraMoveCancel => slots.camera_move_cancel.clone(),
                _ => None,
            }
        };
        match listener {
            Some(listener) => {
                listener.call(());
                true
            }
            None => false,
        }
    }

    /// The marker registered for a native marker handle
    pub fn marker_for(&self, handle: &M) -> Option<Marker> {
        lock(&self.markers).find_by_handle(handle).cloned()
    }

    /// Run the marker's tap listener. Returns whether one ran.
    pub fn dispatch_marker_tap(&self, handle: &M) -> bool {
        match self.marker_for(handle) {
            Some(marker) => match marker.on_tap.clone() {
                Some(listener) => {
                    listener.call(marker);
                    true
                }
                None => false,
            },
            None => {
                log::debug!("tap on a marker this session does not own");
                false
            }
        }
    }

    pub fn dispatch_callout_tap(&self, handle: &M) -> bool {
        match self.marker_for(handle) {
            Some(marker) => match marker.on_callout_tap.clone() {
                Some(listener) => {
                    listener.call(marker);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}
