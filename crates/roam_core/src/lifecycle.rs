//! Spawn location lifecycle
//!
//! ```text
//!   Locked --unlock--> Active --consume--> Respawning --timer--> Active
//!                        |
//!                        +--consume (no respawn)--> Spent
//! ```
//!
//! `Locked` is persisted as `active` with `keys_required > 0`. Reactivation
//! is lazy: it happens when the location is looked up, never on a timer.

use crate::error::{CoreError, CoreResult};
use crate::items::{Inventory, ItemId};
use crate::outcome::{Outcome, Rejection};
use crate::time::Timestamp;
use crate::world::SpawnLocation;
use chrono::Duration;

/// Gameplay-visible state of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationState {
    Active,
    Locked { key: Option<ItemId>, keys_required: u32 },
    Respawning { until: Timestamp },
    Spent,
}

impl SpawnLocation {
    /// State as stored, without applying any expired timer.
    pub fn state(&self) -> LocationState {
        match (self.active, self.respawn_time) {
            (true, _) if self.keys_required > 0 => LocationState::Locked {
                key: self.key_type_id,
                keys_required: self.keys_required,
            },
            (true, _) => LocationState::Active,
            (false, Some(until)) => LocationState::Respawning { until },
            (false, None) => LocationState::Spent,
        }
    }

    /// Reactivate the location if its respawn timer has run out.
    /// Returns whether anything changed.
    pub fn refresh(&mut self, now: Timestamp) -> bool {
        match self.respawn_time {
            Some(until) if !self.active && now >= until => {
                self.active = true;
                self.respawn_time = None;
                true
            }
            _ => false,
        }
    }

    /// Refresh, then check that the location can be acted on.
    pub fn ensure_available(&mut self, now: Timestamp) -> Result<(), Rejection> {
        self.refresh(now);
        match self.state() {
            LocationState::Respawning { until } => Err(Rejection::StillRespawning {
                location_id: self.location_id.clone(),
                respawn_time: until,
            }),
            LocationState::Spent => Err(Rejection::Spent {
                location_id: self.location_id.clone(),
            }),
            LocationState::Active | LocationState::Locked { .. } => Ok(()),
        }
    }

    /// Pay the key cost from `inventory`. Once paid, the location stays
    /// unlocked for good. Completes with the number of keys spent.
    pub fn unlock(&mut self, inventory: &mut Inventory) -> CoreResult<Outcome<u32>> {
        let required = self.keys_required;
        if required == 0 {
            return Ok(Outcome::Completed(0));
        }
        let key = self.key_type_id.ok_or_else(|| CoreError::InvalidLock {
            location_id: self.location_id.clone(),
            keys_required: required,
        })?;

        if !inventory.debit(key, required) {
            return Ok(Outcome::Rejected(Rejection::InsufficientResources {
                item: key,
                required,
                available: inventory.quantity_of(key),
            }));
        }
        self.keys_required = 0;
        Ok(Outcome::Completed(required))
    }

    /// Take the location out of play after a battle, a drained station or an
    /// opened chest. Respawning types come back after `respawn_duration`;
    /// the rest are spent.
    pub fn consume(
        &mut self,
        respawn_duration: Option<Duration>,
        now: Timestamp,
    ) -> CoreResult<LocationState> {
        match (self.respawns, respawn_duration) {
            (true, Some(duration)) => {
                let until = now.checked_add_signed(duration).ok_or_else(|| {
                    CoreError::InvalidDuration {
                        input: crate::duration::format_iso8601(duration),
                    }
                })?;
                self.active = false;
                self.respawn_time = Some(until);
            }
            (true, None) => {
                return Err(CoreError::MissingRespawnDuration {
                    item: self.object_type_id.item_id(),
                });
            }
            (false, _) => {
                self.active = false;
                self.respawn_time = None;
            }
        }
        Ok(self.state())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{CellId, GeoPoint};
    use crate::items::Item;
    use crate::spawn::SpawnKind;
    use chrono::{TimeZone, Utc};

    fn at(kind: SpawnKind) -> SpawnLocation {
        SpawnLocation::new("loc", kind, GeoPoint::new(0.0, 0.0), CellId::from_token("7"))
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn respawn_timer_is_exact() {
        let d = Duration::minutes(10);
        let mut minion = at(SpawnKind::Minion);
        assert_eq!(
            minion.consume(Some(d), t0()).unwrap(),
            LocationState::Respawning { until: t0() + d }
        );

        let just_before = t0() + d - Duration::milliseconds(1);
        assert!(matches!(
            minion.ensure_available(just_before),
            Err(Rejection::StillRespawning { respawn_time, .. }) if respawn_time == t0() + d
        ));
        assert!(!minion.is_active());
        assert_eq!(minion.respawn_time(), Some(t0() + d));

        assert!(minion.ensure_available(t0() + d).is_ok());
        assert!(minion.is_active());
        assert_eq!(minion.respawn_time(), None);
    }

    #[test]
    fn respawn_past_the_calendar_is_refused() {
        let mut minion = at(SpawnKind::Minion);
        let err = minion
            .consume(Some(Duration::milliseconds(i64::MAX)), t0())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDuration { .. }));
        assert!(minion.is_active());
        assert_eq!(minion.respawn_time(), None);
    }

    #[test]
    fn refresh_only_reports_real_changes() {
        let mut station = at(SpawnKind::EnergyStation);
        assert!(!station.refresh(t0()));
        station.consume(Some(Duration::seconds(30)), t0()).unwrap();
        assert!(!station.refresh(t0() + Duration::seconds(29)));
        assert!(station.refresh(t0() + Duration::seconds(31)));
        assert!(!station.refresh(t0() + Duration::seconds(32)));
    }

    #[test]
    fn towers_are_spent_after_use() {
        let mut tower = at(SpawnKind::Tower);
        assert_eq!(tower.consume(None, t0()).unwrap(), LocationState::Spent);
        assert_eq!(tower.respawn_time(), None);
        assert!(!tower.is_active());
        assert!(!tower.refresh(t0() + Duration::days(365)));
        assert!(matches!(
            tower.ensure_available(t0() + Duration::days(365)),
            Err(Rejection::Spent { .. })
        ));
    }

    #[test]
    fn respawning_type_without_duration_is_a_config_error() {
        let mut chest = at(SpawnKind::Chest);
        assert!(matches!(
            chest.consume(None, t0()),
            Err(CoreError::MissingRespawnDuration { item: ItemId::Chest })
        ));
        assert!(chest.is_active());
    }

    #[test]
    fn unlock_debits_keys_once() {
        let mut tower = at(SpawnKind::Tower);
        let mut inventory = Inventory::from_items([Item::new(ItemId::DiamondKey, 4)]);

        assert_eq!(tower.unlock(&mut inventory).unwrap(), Outcome::Completed(3));
        assert_eq!(tower.keys_required(), 0);
        assert_eq!(inventory.quantity_of(ItemId::DiamondKey), 1);
        assert_eq!(tower.state(), LocationState::Active);

        assert_eq!(tower.unlock(&mut inventory).unwrap(), Outcome::Completed(0));
        assert_eq!(inventory.quantity_of(ItemId::DiamondKey), 1);
    }

    #[test]
    fn unlock_without_enough_keys_changes_nothing() {
        let mut chest = at(SpawnKind::Chest);
        let mut inventory = Inventory::from_items([Item::new(ItemId::GoldKey, 2)]);

        let outcome = chest.unlock(&mut inventory).unwrap();
        assert_eq!(
            outcome,
            Outcome::Rejected(Rejection::InsufficientResources {
                item: ItemId::GoldKey,
                required: 3,
                available: 2,
            })
        );
        assert_eq!(chest.keys_required(), 3);
        assert_eq!(inventory.quantity_of(ItemId::GoldKey), 2);
    }

    #[test]
    fn keys_required_never_grows() {
        let mut chest = at(SpawnKind::Chest);
        let mut inventory = Inventory::from_items([Item::new(ItemId::GoldKey, 10)]);
        let mut last = chest.keys_required();
        let mut now = t0();

        for step in 0..12 {
            match step % 3 {
                0 => {
                    let _ = chest.unlock(&mut inventory).unwrap();
                }
                1 => {
                    chest.consume(Some(Duration::minutes(1)), now).unwrap();
                }
                _ => {
                    now += Duration::minutes(2);
                    let _ = chest.ensure_available(now);
                }
            }
            assert!(chest.keys_required() <= last);
            last = chest.keys_required();
        }
        assert_eq!(last, 0);
    }
}
