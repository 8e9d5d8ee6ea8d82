//! Gameplay service
//!
//! Every operation runs read, mutate, write against one player's documents
//! while holding that player's lock. Writes carry the revision each document
//! was read at, so a writer outside this process surfaces as a conflict
//! instead of a lost update.

use crate::assembler::{AssemblyStats, WorldAssembler};
use crate::error::{ServiceError, ServiceResult};
use crate::player::PlayerData;
use crate::settings::GameplaySettings;
use crate::storage::{
    ensure_revision, load_as, store_as, DocumentStore, Versioned, PLAYERS, WORLDS,
};
use chrono::Duration;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roam_assets::GameAssets;
use roam_core::duration::iso8601;
use roam_core::{
    Clock, CoreError, GeoPoint, Item, ItemId, LocationState, Outcome, Rejection, SpawnKind,
    SpawnLocation, Timestamp, WorldState,
};
use roam_net::PoiTransport;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Opening move of a battle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleData {
    pub location_id: String,
    pub opponent_type_id: ItemId,
    pub player_starts: bool,
    pub energy_level: i32,
    pub max_attack_score_bonus: i32,
    pub max_defense_score_bonus: i32,
    #[serde(
        with = "iso8601::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cooldown: Option<Duration>,
}

/// Items granted (or taken, as negative quantities) by an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rewards {
    pub location_id: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSummary {
    pub winner: bool,
    pub won_the_game: bool,
    pub rewards: Rewards,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respawn_time: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRestored {
    pub location_id: String,
    pub amount_restored: i32,
    pub respawn_time: Option<Timestamp>,
}

/// A player's documents, loaded for one operation.
struct Session {
    player_id: String,
    world: WorldState,
    world_revision: Option<u64>,
    world_dirty: bool,
    player: PlayerData,
    player_revision: Option<u64>,
    player_dirty: bool,
    now: Timestamp,
}

/// Look up a location after applying its respawn timer.
fn locate<'w>(
    world: &'w mut WorldState,
    location_id: &str,
    now: Timestamp,
    world_dirty: &mut bool,
) -> ServiceResult<&'w mut SpawnLocation> {
    let location = world
        .location_mut(location_id)
        .ok_or_else(|| CoreError::NotFound {
            location_id: location_id.to_string(),
        })?;
    if location.refresh(now) {
        *world_dirty = true;
    }
    Ok(location)
}

pub struct GameService<T> {
    store: Arc<dyn DocumentStore>,
    assembler: WorldAssembler<T>,
    assets: Arc<GameAssets>,
    gameplay: GameplaySettings,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    player_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<T: PoiTransport> GameService<T> {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        assembler: WorldAssembler<T>,
        assets: Arc<GameAssets>,
        gameplay: GameplaySettings,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            assembler,
            assets,
            gameplay,
            clock,
            rng: Mutex::new(rng),
            player_locks: DashMap::new(),
        }
    }

    pub fn assets(&self) -> &GameAssets {
        &self.assets
    }

    /// Players whose lock is currently held or awaited.
    pub fn tracked_players(&self) -> usize {
        self.player_locks.len()
    }

    /// Run `action` holding the player's lock. The table entry goes away
    /// once nobody else holds or waits on it.
    fn with_player_lock<R>(&self, player_id: &str, action: impl FnOnce() -> R) -> R {
        let lock = self
            .player_locks
            .entry(player_id.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            action()
        };
        drop(lock);
        self.player_locks.remove_if(player_id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A generator of its own, so slow work does not hold the shared one.
    fn child_rng(&self) -> StdRng {
        StdRng::from_seed(self.rng().gen())
    }

    /// Run `action` against the player's documents under their lock and
    /// write back whatever it changed.
    fn with_session<R>(
        &self,
        player_id: &str,
        action: impl FnOnce(&mut Session) -> ServiceResult<R>,
    ) -> ServiceResult<R> {
        self.with_player_lock(player_id, || -> ServiceResult<_> {
            let world = load_as::<WorldState>(self.store.as_ref(), WORLDS, player_id)?;
            let player = load_as::<PlayerData>(self.store.as_ref(), PLAYERS, player_id)?;
            let (player, player_revision, player_dirty) = match player {
                Some(Versioned { revision, value }) => (value, Some(revision), false),
                None => (PlayerData::starter(&self.gameplay), None, true),
            };
            let (world, world_revision) = match world {
                Some(Versioned { revision, value }) => (value, Some(revision)),
                None => (WorldState::new(), None),
            };

            let mut session = Session {
                player_id: player_id.to_string(),
                world,
                world_revision,
                world_dirty: false,
                player,
                player_revision,
                player_dirty,
                now: self.clock.now(),
            };
            let result = action(&mut session)?;
            self.save(&session)?;
            Ok(result)
        })
    }

    /// Write back the dirty documents. Both revisions are checked before
    /// either is written, so a conflict seen here leaves both untouched.
    /// The two writes are still not atomic: an I/O failure on the second, or
    /// a writer slipping in between check and write, persists the world
    /// without the player.
    fn save(&self, session: &Session) -> ServiceResult<()> {
        let store = self.store.as_ref();
        if session.world_dirty {
            ensure_revision(store, WORLDS, &session.player_id, session.world_revision)?;
        }
        if session.player_dirty {
            ensure_revision(store, PLAYERS, &session.player_id, session.player_revision)?;
        }

        if session.world_dirty {
            store_as(
                self.store.as_ref(),
                WORLDS,
                &session.player_id,
                &session.world,
                session.world_revision,
            )?;
        }
        if session.player_dirty {
            store_as(
                self.store.as_ref(),
                PLAYERS,
                &session.player_id,
                &session.player,
                session.player_revision,
            )?;
        }
        Ok(())
    }

    /// The player's world with expired timers applied, or `None` before
    /// their first viewport request.
    pub fn world(&self, player_id: &str) -> ServiceResult<Option<WorldState>> {
        self.with_player_lock(player_id, || -> ServiceResult<_> {
            let Some(Versioned { revision, value: mut world }) =
                load_as::<WorldState>(self.store.as_ref(), WORLDS, player_id)?
            else {
                return Ok(None);
            };
            let now = self.clock.now();
            let reactivated = world.sweep_respawns(now);
            if reactivated > 0 {
                tracing::debug!(player = player_id, reactivated, "Respawn timers expired");
                store_as(self.store.as_ref(), WORLDS, player_id, &world, Some(revision))?;
            }
            world.stamp_server_time(now);
            Ok(Some(world))
        })
    }

    /// Assemble the player's world for a viewport, creating it on first use.
    pub fn refresh_world(
        &self,
        player_id: &str,
        southwest: GeoPoint,
        northeast: GeoPoint,
    ) -> ServiceResult<(WorldState, AssemblyStats)> {
        self.with_player_lock(player_id, || -> ServiceResult<_> {
            let (mut world, revision) =
                match load_as::<WorldState>(self.store.as_ref(), WORLDS, player_id)? {
                    Some(Versioned { revision, value }) => (value, Some(revision)),
                    None => (WorldState::new(), None),
                };
            let now = self.clock.now();
            let mut rng = self.child_rng();
            let stats = self
                .assembler
                .assemble(&mut world, southwest, northeast, now, &mut rng)?;
            if stats.persist_needed() || revision.is_none() {
                store_as(self.store.as_ref(), WORLDS, player_id, &world, revision)?;
            }
            tracing::info!(player = player_id, locations = world.len(), "World refreshed");
            world.stamp_server_time(now);
            Ok((world, stats))
        })
    }

    /// Wipe the player's world and player record.
    pub fn remove_world(&self, player_id: &str) -> ServiceResult<bool> {
        self.with_player_lock(player_id, || -> ServiceResult<_> {
            let world = self.store.remove(WORLDS, player_id)?;
            let player = self.store.remove(PLAYERS, player_id)?;
            tracing::info!(player = player_id, world, player_record = player, "Player data wiped");
            Ok(world || player)
        })
    }

    /// The player's record, created with starter values on first use.
    pub fn player(&self, player_id: &str) -> ServiceResult<PlayerData> {
        self.with_session(player_id, |session| Ok(session.player.clone()))
    }

    /// Set up a battle against a minion or a tower's general. Towers must be
    /// unlocked with diamond keys first; the keys are spent here.
    pub fn start_battle(
        &self,
        player_id: &str,
        location_id: &str,
    ) -> ServiceResult<Outcome<BattleData>> {
        let outcome = self.with_session(player_id, |session| {
            let Session {
                world,
                player,
                now,
                world_dirty,
                player_dirty,
                ..
            } = session;
            let now = *now;
            let location = locate(world, location_id, now, world_dirty)?;
            let kind = location.kind();
            if !matches!(kind, SpawnKind::Minion | SpawnKind::Tower) {
                return Err(unsupported(location_id, kind, "battle"));
            }
            if let Err(rejection) = location.ensure_available(now) {
                return Ok(Outcome::Rejected(rejection));
            }

            if kind == SpawnKind::Tower {
                match location.unlock(&mut player.inventory)? {
                    Outcome::Completed(0) => {}
                    Outcome::Completed(spent) => {
                        tracing::info!(
                            player = player_id,
                            location = location_id,
                            spent,
                            "Tower unlocked"
                        );
                        *world_dirty = true;
                        *player_dirty = true;
                    }
                    Outcome::Rejected(rejection) => return Ok(Outcome::Rejected(rejection)),
                }
            }
            Ok(Outcome::Completed(self.battle_data(location_id, kind)))
        })?;
        log_outcome(player_id, location_id, "battle", &outcome);
        Ok(outcome)
    }

    fn battle_data(&self, location_id: &str, kind: SpawnKind) -> BattleData {
        let g = &self.gameplay;
        let (opponent, energy, attack, defense) = match kind {
            SpawnKind::Tower => (
                ItemId::General,
                g.general_energy,
                g.general_attack_bonus,
                g.general_defense_bonus,
            ),
            _ => (
                ItemId::Minion,
                g.minion_energy,
                g.minion_attack_bonus,
                g.minion_defense_bonus,
            ),
        };
        BattleData {
            location_id: location_id.to_string(),
            opponent_type_id: opponent,
            player_starts: self.rng().gen_bool(0.5),
            energy_level: energy,
            max_attack_score_bonus: attack,
            max_defense_score_bonus: defense,
            cooldown: self.assets.reference.cooldown(opponent),
        }
    }

    /// Settle a finished battle. Winners are rewarded; losers forfeit a gold
    /// key if they hold one. Either way the location is consumed.
    pub fn battle_summary(
        &self,
        player_id: &str,
        location_id: &str,
        winner: bool,
    ) -> ServiceResult<Outcome<BattleSummary>> {
        let outcome = self.with_session(player_id, |session| {
            let Session {
                world,
                player,
                now,
                world_dirty,
                player_dirty,
                ..
            } = session;
            let now = *now;
            let location = locate(world, location_id, now, world_dirty)?;
            let kind = location.kind();
            if !matches!(kind, SpawnKind::Minion | SpawnKind::Tower) {
                return Err(unsupported(location_id, kind, "battle summary"));
            }
            if let Err(rejection) = location.ensure_available(now) {
                return Ok(Outcome::Rejected(rejection));
            }
            if let LocationState::Locked { key: Some(key), keys_required } = location.state() {
                return Ok(Outcome::Rejected(Rejection::InsufficientResources {
                    item: key,
                    required: keys_required,
                    available: player.inventory.quantity_of(key),
                }));
            }

            let respawn = self.assets.reference.respawn_duration(kind.item_id());
            let state = location.consume(respawn, now)?;

            let inventory = &mut player.inventory;
            let mut won_the_game = false;
            let items = if winner {
                let items = {
                    let mut rng = self.rng();
                    match kind {
                        SpawnKind::Tower => self.assets.loot.general_battle_rewards(&mut *rng)?,
                        _ => self.assets.loot.minion_battle_rewards(&mut *rng)?,
                    }
                };
                for item in &items {
                    inventory.add(*item);
                }
                let freed = inventory.quantity_of(ItemId::FreedLeaders);
                won_the_game = freed >= self.gameplay.freed_leaders_to_win;
                items
            } else if inventory.debit(ItemId::GoldKey, 1) {
                vec![Item::new(ItemId::GoldKey, -1)]
            } else {
                Vec::new()
            };

            *world_dirty = true;
            *player_dirty = true;
            Ok(Outcome::Completed(BattleSummary {
                winner,
                won_the_game,
                rewards: Rewards {
                    location_id: location_id.to_string(),
                    items,
                },
                respawn_time: respawn_time_of(state),
            }))
        })?;
        log_outcome(player_id, location_id, "battle summary", &outcome);
        Ok(outcome)
    }

    /// Refill the player's energy from a station and start its timer.
    pub fn drain_energy_station(
        &self,
        player_id: &str,
        location_id: &str,
    ) -> ServiceResult<Outcome<EnergyRestored>> {
        let outcome = self.with_session(player_id, |session| {
            let Session {
                world,
                player,
                now,
                world_dirty,
                player_dirty,
                ..
            } = session;
            let now = *now;
            let location = locate(world, location_id, now, world_dirty)?;
            let kind = location.kind();
            if kind != SpawnKind::EnergyStation {
                return Err(unsupported(location_id, kind, "energy refill"));
            }
            if let Err(rejection) = location.ensure_available(now) {
                return Ok(Outcome::Rejected(rejection));
            }

            let respawn = self.assets.reference.respawn_duration(kind.item_id());
            let state = location.consume(respawn, now)?;
            let amount_restored = player.restore_energy();

            *world_dirty = true;
            *player_dirty = true;
            Ok(Outcome::Completed(EnergyRestored {
                location_id: location_id.to_string(),
                amount_restored,
                respawn_time: respawn_time_of(state),
            }))
        })?;
        log_outcome(player_id, location_id, "energy refill", &outcome);
        Ok(outcome)
    }

    /// Unlock a chest with gold keys, start its timer and hand out its loot.
    pub fn open_chest(
        &self,
        player_id: &str,
        location_id: &str,
    ) -> ServiceResult<Outcome<Rewards>> {
        let outcome = self.with_session(player_id, |session| {
            let Session {
                world,
                player,
                now,
                world_dirty,
                player_dirty,
                ..
            } = session;
            let now = *now;
            let location = locate(world, location_id, now, world_dirty)?;
            let kind = location.kind();
            if kind != SpawnKind::Chest {
                return Err(unsupported(location_id, kind, "opening"));
            }
            if let Err(rejection) = location.ensure_available(now) {
                return Ok(Outcome::Rejected(rejection));
            }
            if let Outcome::Rejected(rejection) = location.unlock(&mut player.inventory)? {
                return Ok(Outcome::Rejected(rejection));
            }

            let respawn = self.assets.reference.respawn_duration(kind.item_id());
            location.consume(respawn, now)?;
            let items = self.assets.loot.chest_rewards(&mut *self.rng())?;
            for item in &items {
                player.inventory.add(*item);
            }

            *world_dirty = true;
            *player_dirty = true;
            Ok(Outcome::Completed(Rewards {
                location_id: location_id.to_string(),
                items,
            }))
        })?;
        log_outcome(player_id, location_id, "chest", &outcome);
        Ok(outcome)
    }
}

fn unsupported(location_id: &str, kind: SpawnKind, action: &'static str) -> ServiceError {
    ServiceError::UnsupportedAction {
        location_id: location_id.to_string(),
        kind,
        action,
    }
}

fn respawn_time_of(state: LocationState) -> Option<Timestamp> {
    match state {
        LocationState::Respawning { until } => Some(until),
        _ => None,
    }
}

fn log_outcome<T>(player_id: &str, location_id: &str, action: &str, outcome: &Outcome<T>) {
    let (player, location) = (player_id, location_id);
    match outcome.rejection() {
        Some(rejection) => tracing::info!(player, location, action, %rejection, "Action rejected"),
        None => tracing::info!(player, location, action, "Action completed"),
    }
}
