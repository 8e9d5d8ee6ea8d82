//! Cell coverage of a viewport
//!
//! Refines cells level by level from the six faces. A cell is kept once it
//! lies inside the viewport at `min_level` or deeper, or once `max_level` is
//! reached; refinement stops early when the next level would blow the cell
//! budget.

use crate::cell::{Cell, CellBound};
use crate::error::{NetError, NetResult};
use roam_core::{CellId, GeoPoint};
use serde::{Deserialize, Serialize};

/// Covering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub min_level: u8,
    pub max_level: u8,
    pub max_cells: usize,
    /// Largest number of cells tracked at one level before giving up.
    pub max_frontier: usize,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            min_level: 11,
            max_level: 14,
            max_cells: 8,
            max_frontier: 4096,
        }
    }
}

/// Axis-aligned latitude/longitude box. A low longitude greater than the high
/// longitude wraps across the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub lo: GeoPoint,
    pub hi: GeoPoint,
}

impl Viewport {
    pub fn new(lo: GeoPoint, hi: GeoPoint) -> NetResult<Self> {
        for (label, corner) in [("south-west", lo), ("north-east", hi)] {
            if !corner.is_valid() {
                return Err(NetError::InvalidRegion {
                    reason: format!("{label} corner {corner} is out of range"),
                });
            }
        }
        if lo.latitude > hi.latitude {
            return Err(NetError::InvalidRegion {
                reason: format!(
                    "south latitude {} exceeds north latitude {}",
                    lo.latitude, hi.latitude
                ),
            });
        }
        Ok(Self { lo, hi })
    }

    pub fn wraps(&self) -> bool {
        self.lo.longitude > self.hi.longitude
    }

    /// Longitude interval with the upper end unwrapped past 180 if needed.
    fn lng_interval(&self) -> (f64, f64) {
        if self.wraps() {
            (self.lo.longitude, self.hi.longitude + 360.0)
        } else {
            (self.lo.longitude, self.hi.longitude)
        }
    }

    fn spans_all_longitudes(&self) -> bool {
        let (lo, hi) = self.lng_interval();
        hi - lo >= 360.0
    }

    fn intersects(&self, bound: &CellBound) -> bool {
        if bound.lat_lo > self.hi.latitude || bound.lat_hi < self.lo.latitude {
            return false;
        }
        if bound.full_longitude || self.spans_all_longitudes() {
            return true;
        }
        let (lo, hi) = self.lng_interval();
        SHIFTS
            .iter()
            .any(|shift| bound.lng_lo + shift <= hi && bound.lng_hi + shift >= lo)
    }

    fn contains(&self, bound: &CellBound) -> bool {
        if bound.lat_lo < self.lo.latitude || bound.lat_hi > self.hi.latitude {
            return false;
        }
        if self.spans_all_longitudes() {
            return true;
        }
        if bound.full_longitude {
            return false;
        }
        let (lo, hi) = self.lng_interval();
        SHIFTS
            .iter()
            .any(|shift| bound.lng_lo + shift >= lo && bound.lng_hi + shift <= hi)
    }
}

const SHIFTS: [f64; 3] = [-360.0, 0.0, 360.0];

/// Computes deterministic cell coverings.
#[derive(Debug, Clone, Default)]
pub struct CellCoverer {
    config: CoverageConfig,
}

impl CellCoverer {
    pub fn new(config: CoverageConfig) -> NetResult<Self> {
        if config.min_level > config.max_level || config.max_level > crate::cell::MAX_LEVEL {
            return Err(NetError::InvalidRegion {
                reason: format!(
                    "level range {}..={} is not usable",
                    config.min_level, config.max_level
                ),
            });
        }
        if config.max_cells == 0 {
            return Err(NetError::InvalidRegion {
                reason: "max_cells must be positive".into(),
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CoverageConfig {
        &self.config
    }

    /// Sorted, duplicate-free cell ids whose union covers the viewport.
    pub fn cover(&self, lo: GeoPoint, hi: GeoPoint) -> NetResult<Vec<CellId>> {
        let viewport = Viewport::new(lo, hi)?;
        let mut cells = self.cover_cells(&viewport)?;
        cells.sort_unstable();
        cells.dedup();
        tracing::debug!(cells = cells.len(), %lo, %hi, "Viewport covered");
        Ok(cells.into_iter().map(Cell::cell_id).collect())
    }

    fn cover_cells(&self, viewport: &Viewport) -> NetResult<Vec<Cell>> {
        let CoverageConfig {
            min_level,
            max_level,
            max_cells,
            max_frontier,
        } = self.config;

        let mut result = Vec::new();
        let mut frontier: Vec<Cell> = Cell::faces()
            .into_iter()
            .filter(|cell| viewport.intersects(&cell.bound()))
            .collect();

        for level in 0..=max_level {
            let mut open = Vec::with_capacity(frontier.len());
            for cell in frontier {
                let settled = level >= min_level
                    && (level == max_level || viewport.contains(&cell.bound()));
                if settled {
                    result.push(cell);
                } else {
                    open.push(cell);
                }
            }
            if open.is_empty() {
                break;
            }

            let children: Vec<Cell> = open
                .iter()
                .filter_map(|cell| cell.children())
                .flatten()
                .filter(|child| viewport.intersects(&child.bound()))
                .collect();

            if level >= min_level && result.len() + children.len() > max_cells {
                result.extend(open);
                break;
            }
            if children.len() > max_frontier {
                return Err(NetError::InvalidRegion {
                    reason: format!(
                        "viewport needs {} cells at level {}, limit is {max_frontier}",
                        children.len(),
                        level + 1
                    ),
                });
            }
            frontier = children;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverer() -> CellCoverer {
        CellCoverer::new(CoverageConfig::default()).unwrap()
    }

    fn covered(cells: &[CellId], point: GeoPoint) -> bool {
        let leaf = Cell::from_point(point);
        cells
            .iter()
            .filter_map(Cell::from_cell_id)
            .any(|cell| cell.contains(leaf))
    }

    #[test]
    fn covers_a_city_block() {
        let lo = GeoPoint::new(37.4200, -122.0860);
        let hi = GeoPoint::new(37.4240, -122.0820);
        let cells = coverer().cover(lo, hi).unwrap();

        assert!(!cells.is_empty());
        assert!(cells.len() <= 8);
        for cell in &cells {
            let level = Cell::from_cell_id(cell).unwrap().level();
            assert!((11..=14).contains(&level), "level {level}");
        }
        for lat in [37.4200, 37.4215, 37.4240] {
            for lng in [-122.0860, -122.0841, -122.0820] {
                assert!(covered(&cells, GeoPoint::new(lat, lng)), "({lat}, {lng})");
            }
        }
    }

    #[test]
    fn output_is_sorted_unique_and_deterministic() {
        let lo = GeoPoint::new(48.85, 2.29);
        let hi = GeoPoint::new(48.87, 2.35);
        let first = coverer().cover(lo, hi).unwrap();
        let second = coverer().cover(lo, hi).unwrap();
        assert_eq!(first, second);

        let raw: Vec<u64> = first.iter().map(|cell| cell.raw().unwrap()).collect();
        let mut sorted = raw.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(raw, sorted);
    }

    #[test]
    fn wraps_across_the_antimeridian() {
        let lo = GeoPoint::new(-17.80, 179.98);
        let hi = GeoPoint::new(-17.78, -179.98);
        let cells = coverer().cover(lo, hi).unwrap();
        assert!(covered(&cells, GeoPoint::new(-17.79, 179.99)));
        assert!(covered(&cells, GeoPoint::new(-17.79, -179.99)));
        assert!(covered(&cells, GeoPoint::new(-17.79, 180.0)));
    }

    #[test]
    fn degenerate_point_viewport_is_covered() {
        let point = GeoPoint::new(1.3521, 103.8198);
        let cells = coverer().cover(point, point).unwrap();
        assert!(!cells.is_empty());
        assert!(covered(&cells, point));
    }

    #[test]
    fn rejects_bad_viewports() {
        let c = coverer();
        let ok = GeoPoint::new(0.0, 0.0);
        for bad in [
            GeoPoint::new(91.0, 0.0),
            GeoPoint::new(0.0, -180.5),
            GeoPoint::new(f64::NAN, 0.0),
            GeoPoint::new(0.0, f64::INFINITY),
        ] {
            assert!(matches!(c.cover(bad, ok), Err(NetError::InvalidRegion { .. })));
        }
        let south = GeoPoint::new(-1.0, 0.0);
        let north = GeoPoint::new(1.0, 0.0);
        assert!(matches!(c.cover(north, south), Err(NetError::InvalidRegion { .. })));
    }

    #[test]
    fn oversized_viewport_is_refused() {
        let lo = GeoPoint::new(-60.0, -170.0);
        let hi = GeoPoint::new(60.0, 170.0);
        assert!(matches!(
            coverer().cover(lo, hi),
            Err(NetError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn rejects_inverted_level_range() {
        let config = CoverageConfig {
            min_level: 15,
            max_level: 12,
            ..CoverageConfig::default()
        };
        assert!(CellCoverer::new(config).is_err());
    }
}
