//! Roam Network Layer
//!
//! Hierarchical sphere cells, viewport coverage, and the boundary to the
//! external points-of-interest provider.

pub mod cell;
pub mod coverage;
pub mod error;
pub mod http;
pub mod poi;

pub use cell::Cell;
pub use coverage::{CellCoverer, CoverageConfig, Viewport};
pub use error::{NetError, NetResult};
pub use http::{HttpConfig, HttpTransport};
pub use poi::{
    CellFetch, PoiGateway, PoiRequest, PoiResponse, PoiTransport, ProviderConfig, TransportError,
};
