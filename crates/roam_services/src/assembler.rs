//! World snapshot assembly
//!
//! One viewport request: cover the viewport, query the provider for every
//! stale cell, spawn locations for points never seen before, then sweep the
//! whole world for expired respawn timers.

use crate::error::ServiceResult;
use rand::Rng;
use roam_core::spawn::{classify, location_id_for};
use roam_core::{GeoPoint, SpawnLocation, Timestamp, WorldState};
use roam_net::{CellCoverer, CellFetch, PoiGateway, PoiTransport};

/// What one assembly pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub cells_covered: usize,
    pub cells_queried: usize,
    pub cells_recorded: usize,
    pub locations_spawned: usize,
    pub locations_reactivated: usize,
}

impl AssemblyStats {
    /// Whether the world differs from what was loaded.
    pub fn persist_needed(&self) -> bool {
        self.cells_recorded > 0 || self.locations_spawned > 0 || self.locations_reactivated > 0
    }
}

pub struct WorldAssembler<T> {
    coverer: CellCoverer,
    gateway: PoiGateway<T>,
}

impl<T: PoiTransport> WorldAssembler<T> {
    pub fn new(coverer: CellCoverer, gateway: PoiGateway<T>) -> Self {
        Self { coverer, gateway }
    }

    pub fn coverer(&self) -> &CellCoverer {
        &self.coverer
    }

    /// Bring `world` up to date for the viewport `southwest`..`northeast`.
    ///
    /// Any provider failure or unusable point fails the whole request and
    /// leaves `world` untouched.
    pub fn assemble<R: Rng>(
        &self,
        world: &mut WorldState,
        southwest: GeoPoint,
        northeast: GeoPoint,
        now: Timestamp,
        rng: &mut R,
    ) -> ServiceResult<AssemblyStats> {
        let cells = self.coverer.cover(southwest, northeast)?;
        let fetched = cells
            .iter()
            .filter(|cell| world.cache().should_query(cell))
            .map(|cell| self.gateway.fetch(cell))
            .collect::<Result<Vec<CellFetch>, _>>()?;

        // Classify before touching the world so a bad point changes nothing.
        let mut fresh: Vec<SpawnLocation> = Vec::new();
        for fetch in &fetched {
            for point in &fetch.points {
                let location_id = location_id_for(&point.name)?;
                let seen = world.contains(&location_id)
                    || fresh
                        .iter()
                        .any(|location| location.location_id() == location_id);
                if !seen {
                    fresh.push(classify(point, rng)?);
                }
            }
        }

        let mut stats = AssemblyStats {
            cells_covered: cells.len(),
            cells_queried: fetched.len(),
            ..AssemblyStats::default()
        };
        for fetch in fetched {
            let previous = world.cache().ttl(&fetch.cell_id);
            let written = world.cache_mut().record_fresh(fetch.cell_id, fetch.ttl);
            if written && previous != Some(fetch.ttl) {
                stats.cells_recorded += 1;
            }
        }
        stats.locations_spawned = fresh
            .into_iter()
            .map(|location| world.insert_if_absent(location))
            .filter(|added| *added)
            .count();
        stats.locations_reactivated = world.sweep_respawns(now);

        tracing::info!(
            cells = stats.cells_covered,
            queried = stats.cells_queried,
            spawned = stats.locations_spawned,
            reactivated = stats.locations_reactivated,
            persist = stats.persist_needed(),
            "World assembled"
        );
        Ok(stats)
    }
}
