//! Offline points-of-interest provider
//!
//! Answers every cell with a fixed number of points scattered inside it.
//! The scatter is seeded by the cell id, so the same cell always yields the
//! same points.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roam_net::{Cell, PoiRequest, PoiTransport, TransportError};
use roam_services::settings::SyntheticSettings;
use serde_json::json;

pub struct SyntheticTransport {
    points_per_cell: u32,
    ttl_seconds: i64,
}

impl SyntheticTransport {
    pub fn new(settings: &SyntheticSettings) -> Self {
        Self {
            points_per_cell: settings.points_per_cell,
            ttl_seconds: settings.ttl_seconds,
        }
    }
}

impl PoiTransport for SyntheticTransport {
    fn send(&self, request: &PoiRequest) -> Result<String, TransportError> {
        let cell = Cell::from_cell_id(&request.cell_id()).ok_or_else(|| {
            TransportError::status(400, format!("not a cell id: {}", request.area_filter.cell_id))
        })?;
        let object_type = request
            .criteria
            .first()
            .map_or(0, |criterion| criterion.object_type);
        let limit = request
            .criteria
            .first()
            .map_or(self.points_per_cell, |criterion| {
                criterion.filter.max_count.min(self.points_per_cell)
            });

        let mut rng = StdRng::seed_from_u64(cell.raw());
        let locations: Vec<_> = (0..limit)
            .map(|k| {
                let point = cell.point_at(rng.gen(), rng.gen());
                json!({
                    "name": format!("syntheticLocations/{}-{k}", cell.raw()),
                    "types": ["synthetic"],
                    "centerPoint": { "latitude": point.latitude, "longitude": point.longitude },
                    "snappedPoint": { "latitude": point.latitude, "longitude": point.longitude }
                })
            })
            .collect();

        tracing::trace!(cell = %cell.cell_id(), points = locations.len(), "Synthetic cell served");
        Ok(json!({
            "locationsPerObjectType": { (object_type.to_string()): { "locations": locations } },
            "ttl": format!("{}s", self.ttl_seconds)
        })
        .to_string())
    }
}
