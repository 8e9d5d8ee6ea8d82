//! Geographic value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside the usual degree ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Identifier of a hierarchical geographic cell.
///
/// Rendered as the unsigned decimal form of the 64-bit cell id, which is also
/// what the points-of-interest provider expects in its area filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn from_raw(id: u64) -> Self {
        Self(id.to_string())
    }

    /// Wrap an already-rendered token, e.g. one read back from storage.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 64-bit id, when the token is a decimal cell id.
    pub fn raw(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_id_round_trips_raw_value() {
        let cell = CellId::from_raw(9_749_618_446_378_729_472);
        assert_eq!(cell.as_str(), "9749618446378729472");
        assert_eq!(cell.raw(), Some(9_749_618_446_378_729_472));
        assert_eq!(CellId::from_token("not-a-cell").raw(), None);
    }

    #[test]
    fn point_validity() {
        assert!(GeoPoint::new(48.8584, 2.2945).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::NAN).is_valid());
    }
}
