//! Per-player world state

use crate::cache::CellTtlCache;
use crate::geo::{CellId, GeoPoint};
use crate::items::ItemId;
use crate::spawn::SpawnKind;
use crate::time::{format_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A persistent game object bound to one real-world point of interest.
///
/// State changes go through the lifecycle methods so that `respawn_time` is
/// only ever set on an inactive, respawning location and `keys_required`
/// never grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnLocation {
    pub(crate) location_id: String,
    pub(crate) object_type_id: SpawnKind,
    pub(crate) active: bool,
    pub(crate) respawns: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) respawn_time: Option<Timestamp>,
    #[serde(default)]
    pub(crate) keys_required: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) key_type_id: Option<ItemId>,
    pub(crate) position: GeoPoint,
    pub(crate) origin_cell_id: CellId,
}

impl SpawnLocation {
    /// A fresh, active location with the fixed attributes of `kind`.
    pub fn new(
        location_id: impl Into<String>,
        kind: SpawnKind,
        position: GeoPoint,
        origin_cell_id: CellId,
    ) -> Self {
        let (key_type_id, keys_required) = match kind.lock() {
            Some((key, count)) => (Some(key), count),
            None => (None, 0),
        };
        Self {
            location_id: location_id.into(),
            object_type_id: kind,
            active: true,
            respawns: kind.respawns(),
            respawn_time: None,
            keys_required,
            key_type_id,
            position,
            origin_cell_id,
        }
    }

    pub fn location_id(&self) -> &str {
        &self.location_id
    }

    pub fn kind(&self) -> SpawnKind {
        self.object_type_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn respawns(&self) -> bool {
        self.respawns
    }

    pub fn respawn_time(&self) -> Option<Timestamp> {
        self.respawn_time
    }

    pub fn keys_required(&self) -> u32 {
        self.keys_required
    }

    pub fn key_type(&self) -> Option<ItemId> {
        self.key_type_id
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn origin_cell_id(&self) -> &CellId {
        &self.origin_cell_id
    }
}

/// Everything the server remembers about one player's map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldState {
    #[serde(default)]
    locations: BTreeMap<String, SpawnLocation>,
    /// Cell id to the provider TTL recorded when the cell was last queried.
    #[serde(default)]
    cell_ttls: CellTtlCache,
    /// Informational only; restamped whenever the world is handed out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_server_time: Option<String>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locations(&self) -> impl Iterator<Item = &SpawnLocation> {
        self.locations.values()
    }

    pub fn location(&self, location_id: &str) -> Option<&SpawnLocation> {
        self.locations.get(location_id)
    }

    pub fn location_mut(&mut self, location_id: &str) -> Option<&mut SpawnLocation> {
        self.locations.get_mut(location_id)
    }

    pub fn contains(&self, location_id: &str) -> bool {
        self.locations.contains_key(location_id)
    }

    /// Add a location unless its id is already known. Known locations are
    /// never replaced; returns whether the location was added.
    pub fn insert_if_absent(&mut self, location: SpawnLocation) -> bool {
        if self.locations.contains_key(&location.location_id) {
            return false;
        }
        self.locations
            .insert(location.location_id.clone(), location);
        true
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn cache(&self) -> &CellTtlCache {
        &self.cell_ttls
    }

    pub fn cache_mut(&mut self) -> &mut CellTtlCache {
        &mut self.cell_ttls
    }

    /// Reactivate every location whose respawn timer has run out.
    /// Returns the number of locations that changed.
    pub fn sweep_respawns(&mut self, now: Timestamp) -> usize {
        self.locations
            .values_mut()
            .map(|location| location.refresh(now))
            .filter(|changed| *changed)
            .count()
    }

    pub fn current_server_time(&self) -> Option<&str> {
        self.current_server_time.as_deref()
    }

    pub fn stamp_server_time(&mut self, now: Timestamp) {
        self.current_server_time = Some(format_timestamp(now));
    }
}
