//! Points-of-interest query gateway
//!
//! One provider request per stale cell. The HTTP client itself lives behind
//! [`PoiTransport`]; this module owns the wire format and its validation.

use crate::error::{NetError, NetResult};
use chrono::Duration;
use roam_core::duration::parse_wire_seconds;
use roam_core::{CellId, GeoPoint, RawPointOfInterest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What to ask the provider for, per cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub object_type: u32,
    pub max_location_count: u32,
    pub included_types: Vec<String>,
    pub fields_to_return: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            object_type: 0,
            max_location_count: 50,
            included_types: Vec::new(),
            fields_to_return: vec![
                "snapped_point".into(),
                "place_id".into(),
                "types".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiRequest {
    pub area_filter: AreaFilter,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaFilter {
    pub cell_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub object_type: u32,
    pub filter: CriterionFilter,
    pub fields_to_return: FieldMask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionFilter {
    pub max_count: u32,
    #[serde(default)]
    pub included_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMask {
    pub paths: Vec<String>,
}

impl PoiRequest {
    pub fn for_cell(cell: &CellId, config: &ProviderConfig) -> Self {
        Self {
            area_filter: AreaFilter {
                cell_id: cell.as_str().to_string(),
            },
            criteria: vec![Criterion {
                object_type: config.object_type,
                filter: CriterionFilter {
                    max_count: config.max_location_count,
                    included_types: config.included_types.clone(),
                },
                fields_to_return: FieldMask {
                    paths: config.fields_to_return.clone(),
                },
            }],
        }
    }

    /// The cell this request targets.
    pub fn cell_id(&self) -> CellId {
        CellId::from_token(self.area_filter.cell_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoiResponse {
    #[serde(default, alias = "locationsPerGameObjectType")]
    pub locations_per_object_type: BTreeMap<String, LocationBucket>,
    #[serde(default)]
    pub ttl: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationBucket {
    #[serde(default)]
    pub locations: Vec<WireLocation>,
}

/// A point as the provider sends it, before it is tagged with its cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireLocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_code: Option<String>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_point: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapped_point: Option<GeoPoint>,
}

impl WireLocation {
    fn into_raw(self, cell: &CellId) -> RawPointOfInterest {
        RawPointOfInterest {
            name: self.name,
            place_id: self.place_id,
            plus_code: self.plus_code,
            center_point: self.center_point,
            snapped_point: self.snapped_point,
            types: self.types,
            cell_id: cell.clone(),
        }
    }
}

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "status {status}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Sends one request to the provider and returns the raw response body.
/// Non-success statuses are returned as errors.
pub trait PoiTransport: Send + Sync {
    fn send(&self, request: &PoiRequest) -> Result<String, TransportError>;
}

impl<T: PoiTransport + ?Sized> PoiTransport for std::sync::Arc<T> {
    fn send(&self, request: &PoiRequest) -> Result<String, TransportError> {
        (**self).send(request)
    }
}

/// Points and time-to-live for one queried cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFetch {
    pub cell_id: CellId,
    pub points: Vec<RawPointOfInterest>,
    pub ttl: Duration,
}

pub struct PoiGateway<T> {
    transport: T,
    config: ProviderConfig,
}

impl<T: PoiTransport> PoiGateway<T> {
    pub fn new(transport: T, config: ProviderConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Query one cell. No retries; failures go straight to the caller.
    pub fn fetch(&self, cell: &CellId) -> NetResult<CellFetch> {
        let request = PoiRequest::for_cell(cell, &self.config);
        let body = self.transport.send(&request).map_err(|err| {
            tracing::warn!(cell = %cell, error = %err, "Provider request failed");
            NetError::ProviderUnavailable {
                reason: err.to_string(),
            }
        })?;
        self.parse(cell, &body)
    }

    fn parse(&self, cell: &CellId, body: &str) -> NetResult<CellFetch> {
        let response: PoiResponse =
            serde_json::from_str(body).map_err(|err| NetError::MalformedResponse {
                reason: format!("cell {cell}: {err}"),
            })?;

        let bucket_key = self.config.object_type.to_string();
        let PoiResponse {
            mut locations_per_object_type,
            ttl,
        } = response;
        let bucket = locations_per_object_type
            .remove(&bucket_key)
            .ok_or_else(|| NetError::MalformedResponse {
                reason: format!("cell {cell}: no locations for object type {bucket_key}"),
            })?;

        let ttl = ttl.ok_or_else(|| NetError::MalformedResponse {
            reason: format!("cell {cell}: response carries no ttl"),
        })?;
        let ttl = parse_wire_seconds(&ttl).map_err(|err| NetError::MalformedResponse {
            reason: format!("cell {cell}: {err}"),
        })?;

        let points: Vec<_> = bucket
            .locations
            .into_iter()
            .map(|location| location.into_raw(cell))
            .collect();
        tracing::debug!(
            cell = %cell,
            points = points.len(),
            ttl_secs = ttl.num_seconds(),
            "Cell fetched"
        );
        Ok(CellFetch {
            cell_id: cell.clone(),
            points,
            ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Canned {
        reply: Result<String, TransportError>,
        seen: Mutex<Vec<PoiRequest>>,
    }

    impl Canned {
        fn new(reply: Result<String, TransportError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PoiTransport for Canned {
        fn send(&self, request: &PoiRequest) -> Result<String, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn cell() -> CellId {
        CellId::from_raw(9_749_618_446_378_729_472)
    }

    #[test]
    fn request_matches_provider_shape() {
        let request = PoiRequest::for_cell(&cell(), &ProviderConfig::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "areaFilter": { "cellId": "9749618446378729472" },
                "criteria": [{
                    "objectType": 0,
                    "filter": { "maxCount": 50, "includedTypes": [] },
                    "fieldsToReturn": { "paths": ["snapped_point", "place_id", "types"] }
                }]
            })
        );
    }

    #[test]
    fn fetch_tags_points_with_cell_and_converts_ttl() {
        let body = json!({
            "locationsPerGameObjectType": {
                "0": { "locations": [
                    {
                        "name": "curatedPlayableLocations/abc",
                        "placeId": "ChIJ1",
                        "types": ["cafe"],
                        "centerPoint": { "latitude": 1.0, "longitude": 2.0 },
                        "snappedPoint": { "latitude": 1.1, "longitude": 2.1 }
                    },
                    { "name": "curatedPlayableLocations/def" }
                ]}
            },
            "ttl": "86400s"
        })
        .to_string();
        let gateway = PoiGateway::new(Canned::new(Ok(body)), ProviderConfig::default());

        let fetched = gateway.fetch(&cell()).unwrap();
        assert_eq!(fetched.ttl, Duration::seconds(86_400));
        assert_eq!(fetched.points.len(), 2);
        assert!(fetched.points.iter().all(|p| p.cell_id == cell()));
        assert_eq!(fetched.points[0].snapped_point, Some(GeoPoint::new(1.1, 2.1)));
        assert_eq!(fetched.points[1].center_point, None);

        let seen = gateway.transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].cell_id(), cell());
    }

    #[test]
    fn transport_failure_is_provider_unavailable() {
        let gateway = PoiGateway::new(
            Canned::new(Err(TransportError::status(503, "busy"))),
            ProviderConfig::default(),
        );
        assert!(matches!(
            gateway.fetch(&cell()),
            Err(NetError::ProviderUnavailable { .. })
        ));
    }

    #[test]
    fn missing_bucket_or_ttl_is_malformed() {
        let cases = [
            "not json".to_string(),
            json!({ "locationsPerObjectType": { "1": { "locations": [] } }, "ttl": "60s" }).to_string(),
            json!({ "locationsPerObjectType": { "0": { "locations": [] } } }).to_string(),
            json!({ "locationsPerObjectType": { "0": { "locations": [] } }, "ttl": "soon" }).to_string(),
            json!({ "locationsPerObjectType": { "0": { "locations": [] } }, "ttl": "-1e300s" }).to_string(),
        ];
        for body in cases {
            let gateway = PoiGateway::new(Canned::new(Ok(body.clone())), ProviderConfig::default());
            let err = gateway.fetch(&cell()).unwrap_err();
            assert!(matches!(err, NetError::MalformedResponse { .. }), "{body}");
            assert!(err.is_transient());
        }
    }

    #[test]
    fn empty_bucket_is_a_valid_answer() {
        let body = json!({ "locationsPerObjectType": { "0": {} }, "ttl": "0s" }).to_string();
        let gateway = PoiGateway::new(Canned::new(Ok(body)), ProviderConfig::default());
        let fetched = gateway.fetch(&cell()).unwrap();
        assert!(fetched.points.is_empty());
        assert_eq!(fetched.ttl, Duration::zero());
    }
}
