//! In-memory registries mapping application entities to native handles
//!
//! A registry owns the application-level entity; the native handle stored next
//! to it is only a back-reference used for removal and for correlating native
//! click events to the entity that produced them.

pub mod icon;

use crate::core::marker::{EntityId, Marker, Polyline};

/// Marker id reserved for the user-location indicator
pub const USER_LOCATION_MARKER_ID: &str = "__user_location";
/// Marker id reserved for the user-location accuracy ring
pub const USER_LOCATION_ACCURACY_MARKER_ID: &str = "__user_location_accuracy";

const RESERVED_MARKER_IDS: &[&str] = &[USER_LOCATION_MARKER_ID, USER_LOCATION_ACCURACY_MARKER_ID];

/// Entities that carry a caller-assigned id
pub trait Identified {
    fn entity_id(&self) -> &EntityId;
}

impl Identified for Marker {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

impl Identified for Polyline {
    fn entity_id(&self) -> &EntityId {
        &self.id
    }
}

/// Ordered entity/handle pairs for one map instance
#[derive(Debug)]
pub struct EntityRegistry<E, H> {
    entries: Vec<(E, H)>,
    reserved: &'static [&'static str],
}

pub type MarkerRegistry<H> = EntityRegistry<Marker, H>;
pub type PolylineRegistry<H> = EntityRegistry<Polyline, H>;

impl<H> EntityRegistry<Marker, H> {
    /// Marker registry that protects the user-location ids from bulk removal
    pub fn markers() -> Self {
        Self {
            entries: Vec::new(),
            reserved: RESERVED_MARKER_IDS,
        }
    }
}

impl<H> EntityRegistry<Polyline, H> {
    pub fn polylines() -> Self {
        Self {
            entries: Vec::new(),
            reserved: &[],
        }
    }
}

impl<E: Identified + Clone, H: PartialEq + Clone> EntityRegistry<E, H> {
    pub fn insert(&mut self, entity: E, handle: H) {
        self.entries.push((entity, handle));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities in insertion order
    pub fn entities(&self) -> Vec<E> {
        self.entries.iter().map(|(entity, _)| entity.clone()).collect()
    }

    /// Entity whose native handle equals `handle`
    pub fn find_by_handle(&self, handle: &H) -> Option<&E> {
        self.entries
            .iter()
            .find(|(_, h)| h == handle)
            .map(|(entity, _)| entity)
    }

    /// Handles of every entity carrying `id`
    pub fn handles_for(&self, id: &EntityId) -> Vec<H> {
        self.entries
            .iter()
            .filter(|(entity, _)| entity.entity_id() == id)
            .map(|(_, h)| h.clone())
            .collect()
    }

    fn is_reserved(&self, id: &EntityId) -> bool {
        self.reserved.contains(&id.as_str())
    }

    /// Remove the entities listed in `ids`, or every entity when `ids` is
    /// `None`. Reserved ids are never removed this way.
    pub fn remove(&mut self, ids: Option<&[EntityId]>) -> Vec<(E, H)> {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.entries).into_iter().partition(|(entity, _)| {
                let id = entity.entity_id();
                let selected = ids.map_or(true, |ids| ids.contains(id));
                selected && !self.is_reserved(id)
            });
        self.entries = kept;
        removed
    }

    /// Empty the registry, reserved entries included. Used on teardown.
    pub fn clear(&mut self) -> Vec<(E, H)> {
        std::mem::take(&mut self.entries)
    }
}
