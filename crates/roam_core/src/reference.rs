//! Static per-item reference data
//!
//! Read-only once loaded. The lifecycle engine only looks at
//! `respawn_duration`; battle setup reads `cooldown`.

use crate::error::{CoreError, CoreResult};
use crate::items::ItemId;
use crate::spawn::SpawnKind;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
    pub item_id: ItemId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attack_score: i32,
    #[serde(default)]
    pub defense_score: i32,
    #[serde(
        default,
        with = "crate::duration::iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cooldown: Option<Duration>,
    /// Absent means "does not respawn".
    #[serde(
        default,
        with = "crate::duration::iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub respawn_duration: Option<Duration>,
    #[serde(default)]
    pub prefab: String,
}

/// Reference items keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    items: BTreeMap<ItemId, ReferenceItem>,
}

impl ReferenceData {
    /// Build and validate. Every spawn type needs an entry, and its respawn
    /// duration must agree with whether the type respawns.
    pub fn from_items(items: impl IntoIterator<Item = ReferenceItem>) -> CoreResult<Self> {
        let items: BTreeMap<_, _> = items
            .into_iter()
            .map(|item| (item.item_id, item))
            .collect();
        let data = Self { items };

        for kind in SpawnKind::ALL {
            let item = data.require(kind.item_id())?;
            match (kind.respawns(), item.respawn_duration) {
                (true, None) => {
                    return Err(CoreError::MissingRespawnDuration {
                        item: item.item_id,
                    })
                }
                (false, Some(_)) => {
                    return Err(CoreError::UnexpectedRespawnDuration {
                        item: item.item_id,
                    })
                }
                _ => {}
            }
        }
        if let Some(general) = data.get(ItemId::General) {
            if general.respawn_duration.is_some() {
                return Err(CoreError::UnexpectedRespawnDuration {
                    item: ItemId::General,
                });
            }
        }
        Ok(data)
    }

    pub fn get(&self, item_id: ItemId) -> Option<&ReferenceItem> {
        self.items.get(&item_id)
    }

    pub fn require(&self, item_id: ItemId) -> CoreResult<&ReferenceItem> {
        self.get(item_id)
            .ok_or(CoreError::MissingReference { item: item_id })
    }

    pub fn respawn_duration(&self, item_id: ItemId) -> Option<Duration> {
        self.get(item_id).and_then(|item| item.respawn_duration)
    }

    pub fn cooldown(&self, item_id: ItemId) -> Option<Duration> {
        self.get(item_id).and_then(|item| item.cooldown)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
