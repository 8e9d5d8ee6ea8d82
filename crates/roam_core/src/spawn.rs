//! Spawn generation
//!
//! Turns a raw point of interest into a typed [`SpawnLocation`] with a single
//! uniform draw over `ROLL_MIN..=ROLL_MAX`. The interval is split into
//! contiguous bands walked in a fixed order; the first band holding the roll
//! decides the object type.

use crate::error::{CoreError, CoreResult};
use crate::geo::{CellId, GeoPoint};
use crate::items::ItemId;
use crate::world::SpawnLocation;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

pub const ROLL_MIN: u32 = 0;
pub const ROLL_MAX: u32 = 100;

/// Classification bands: energy station 5%, chest 20%, tower 15%, minion 60%.
pub const SPAWN_BANDS: [(SpawnKind, RangeInclusive<u32>); 4] = [
    (SpawnKind::EnergyStation, 0..=4),
    (SpawnKind::Chest, 5..=24),
    (SpawnKind::Tower, 25..=39),
    (SpawnKind::Minion, 40..=100),
];

/// Object types a spawn location can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpawnKind {
    EnergyStation,
    Chest,
    Tower,
    Minion,
}

impl SpawnKind {
    pub const ALL: [SpawnKind; 4] = [
        SpawnKind::EnergyStation,
        SpawnKind::Chest,
        SpawnKind::Tower,
        SpawnKind::Minion,
    ];

    pub fn item_id(self) -> ItemId {
        match self {
            Self::EnergyStation => ItemId::EnergyStation,
            Self::Chest => ItemId::Chest,
            Self::Tower => ItemId::Tower,
            Self::Minion => ItemId::Minion,
        }
    }

    /// Whether a consumed location of this type comes back.
    pub fn respawns(self) -> bool {
        !matches!(self, Self::Tower)
    }

    /// Key type and count needed to unlock a fresh location.
    pub fn lock(self) -> Option<(ItemId, u32)> {
        match self {
            Self::Chest => Some((ItemId::GoldKey, 3)),
            Self::Tower => Some((ItemId::DiamondKey, 3)),
            Self::EnergyStation | Self::Minion => None,
        }
    }
}

/// A point returned by the points-of-interest provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPointOfInterest {
    /// Stable, unique resource name (e.g. `curatedPlayableLocations/abc`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_point: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapped_point: Option<GeoPoint>,
    #[serde(default)]
    pub types: Vec<String>,
    /// Cell the point was discovered in.
    pub cell_id: CellId,
}

/// Map a roll to its band. `None` only outside `ROLL_MIN..=ROLL_MAX`.
pub fn classify_roll(roll: u32) -> Option<SpawnKind> {
    SPAWN_BANDS
        .iter()
        .find(|(_, band)| band.contains(&roll))
        .map(|(kind, _)| *kind)
}

/// Location key for a provider point: its name with path separators flattened.
pub fn location_id_for(name: &str) -> CoreResult<String> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidPoint {
            reason: "point has no name".to_string(),
        });
    }
    Ok(name.replace('/', "_"))
}

/// Create a spawn location for a newly discovered point.
pub fn classify<R: Rng>(
    point: &RawPointOfInterest,
    rng: &mut R,
) -> CoreResult<SpawnLocation> {
    let location_id = location_id_for(&point.name)?;
    let position = point
        .snapped_point
        .or(point.center_point)
        .ok_or_else(|| CoreError::InvalidPoint {
            reason: format!("point '{}' has neither a snapped nor a center point", point.name),
        })?;

    let roll = rng.gen_range(ROLL_MIN..=ROLL_MAX);
    let kind = classify_roll(roll).ok_or_else(|| CoreError::InvalidPoint {
        reason: format!("roll {roll} fell outside every spawn band"),
    })?;

    Ok(SpawnLocation::new(
        location_id,
        kind,
        position,
        point.cell_id.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn point(name: &str) -> RawPointOfInterest {
        RawPointOfInterest {
            name: name.to_string(),
            place_id: None,
            plus_code: None,
            center_point: Some(GeoPoint::new(37.422, -122.084)),
            snapped_point: None,
            types: vec!["park".to_string()],
            cell_id: CellId::from_token("9749618446378729472"),
        }
    }

    #[test]
    fn every_roll_has_exactly_one_kind() {
        for roll in ROLL_MIN..=ROLL_MAX {
            let hits = SPAWN_BANDS
                .iter()
                .filter(|(_, band)| band.contains(&roll))
                .count();
            assert_eq!(hits, 1, "roll {roll} matched {hits} bands");
            assert!(classify_roll(roll).is_some());
        }
        assert_eq!(classify_roll(ROLL_MAX + 1), None);
    }

    #[test]
    fn band_widths_follow_design_ratio() {
        let widths: Vec<u32> = SPAWN_BANDS
            .iter()
            .map(|(_, band)| band.end() - band.start() + 1)
            .collect();
        assert_eq!(widths, vec![5, 20, 15, 61]);
        assert_eq!(classify_roll(4), Some(SpawnKind::EnergyStation));
        assert_eq!(classify_roll(5), Some(SpawnKind::Chest));
        assert_eq!(classify_roll(24), Some(SpawnKind::Chest));
        assert_eq!(classify_roll(25), Some(SpawnKind::Tower));
        assert_eq!(classify_roll(39), Some(SpawnKind::Tower));
        assert_eq!(classify_roll(40), Some(SpawnKind::Minion));
    }

    #[test]
    fn classify_derives_id_and_prefers_snapped_point() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut raw = point("curatedPlayableLocations/abc");
        raw.snapped_point = Some(GeoPoint::new(37.5, -122.0));

        let location = classify(&raw, &mut rng).unwrap();
        assert_eq!(location.location_id(), "curatedPlayableLocations_abc");
        assert_eq!(location.position(), GeoPoint::new(37.5, -122.0));
        assert_eq!(location.origin_cell_id(), &raw.cell_id);
        assert!(location.is_active());
    }

    #[test]
    fn classify_rejects_unusable_points() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            classify(&point(""), &mut rng),
            Err(CoreError::InvalidPoint { .. })
        ));

        let mut nowhere = point("generatedPlayableLocations/x");
        nowhere.center_point = None;
        assert!(matches!(
            classify(&nowhere, &mut rng),
            Err(CoreError::InvalidPoint { .. })
        ));
    }

    #[test]
    fn kinds_carry_fixed_attributes() {
        assert!(SpawnKind::EnergyStation.respawns());
        assert!(SpawnKind::Chest.respawns());
        assert!(!SpawnKind::Tower.respawns());
        assert!(SpawnKind::Minion.respawns());
        assert_eq!(SpawnKind::Chest.lock(), Some((ItemId::GoldKey, 3)));
        assert_eq!(SpawnKind::Tower.lock(), Some((ItemId::DiamondKey, 3)));
        assert_eq!(SpawnKind::Minion.lock(), None);
    }
}
