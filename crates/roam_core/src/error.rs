//! Core error taxonomy

use crate::items::ItemId;
use thiserror::Error;

/// Errors raised by the domain layer.
///
/// Expected gameplay rejections (a location still respawning, a player
/// short on keys) are not errors; see [`crate::outcome::Rejection`].
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid point of interest: {reason}")]
    InvalidPoint { reason: String },

    #[error("loot table '{table}' is malformed: {reason}")]
    MalformedLootTable { table: String, reason: String },

    #[error("invalid duration '{input}'")]
    InvalidDuration { input: String },

    #[error("reference item {item} not found")]
    MissingReference { item: ItemId },

    #[error("{item} respawns but declares no respawn duration")]
    MissingRespawnDuration { item: ItemId },

    #[error("{item} never respawns but declares a respawn duration")]
    UnexpectedRespawnDuration { item: ItemId },

    #[error("location '{location_id}' requires {keys_required} keys but names no key type")]
    InvalidLock {
        location_id: String,
        keys_required: u32,
    },

    #[error("location '{location_id}' not found")]
    NotFound { location_id: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
