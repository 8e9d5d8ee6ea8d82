//! Spatial TTL cache
//!
//! Remembers, per covering cell, the time-to-live the provider returned when
//! the cell was last queried. Entries are stored as ISO 8601 durations and are
//! never decremented locally: a cell is re-queried only when its stored TTL
//! is zero, negative or unreadable.

use crate::duration::{format_iso8601, parse_iso8601};
use crate::geo::CellId;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellTtlCache {
    entries: BTreeMap<CellId, String>,
}

impl CellTtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `cell` must be fetched from the provider.
    pub fn should_query(&self, cell: &CellId) -> bool {
        match self.entries.get(cell) {
            None => true,
            Some(raw) => !Self::is_fresh(cell, raw),
        }
    }

    /// Parsed TTL of a cell, if present and readable.
    pub fn ttl(&self, cell: &CellId) -> Option<Duration> {
        self.entries
            .get(cell)
            .and_then(|raw| parse_iso8601(raw).ok())
    }

    /// Store the provider TTL for a freshly queried cell.
    ///
    /// A fresh entry is kept as is, so within one batch the first writer
    /// wins. Returns whether the entry was written.
    pub fn record_fresh(&mut self, cell: CellId, ttl: Duration) -> bool {
        if let Some(raw) = self.entries.get(&cell) {
            if Self::is_fresh(&cell, raw) {
                return false;
            }
        }
        self.entries.insert(cell, format_iso8601(ttl));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &str)> {
        self.entries.iter().map(|(cell, raw)| (cell, raw.as_str()))
    }

    fn is_fresh(cell: &CellId, raw: &str) -> bool {
        match parse_iso8601(raw) {
            Ok(ttl) => ttl.num_seconds() > 0,
            Err(_) => {
                tracing::warn!(cell = %cell, ttl = raw, "Unreadable cell TTL, treating as stale");
                false
            }
        }
    }
}
