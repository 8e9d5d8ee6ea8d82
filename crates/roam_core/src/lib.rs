//! Roam Core
//!
//! Domain layer of the location game server:
//! - Geographic points, cell ids, durations and clocks
//! - Items, inventories and static reference data
//! - Spawn generation and the spawn location lifecycle
//! - Weighted loot sampling
//! - Per-player world state and its spatial TTL cache

pub mod cache;
pub mod duration;
pub mod error;
pub mod geo;
pub mod items;
pub mod lifecycle;
pub mod loot;
pub mod outcome;
pub mod reference;
pub mod spawn;
pub mod time;
pub mod world;

pub use cache::CellTtlCache;
pub use error::{CoreError, CoreResult};
pub use geo::{CellId, GeoPoint};
pub use items::{Inventory, Item, ItemId};
pub use lifecycle::LocationState;
pub use loot::{LootRefItem, LootTable, LootTables};
pub use outcome::{Outcome, Rejection};
pub use reference::{ReferenceData, ReferenceItem};
pub use spawn::{RawPointOfInterest, SpawnKind};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use world::{SpawnLocation, WorldState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
