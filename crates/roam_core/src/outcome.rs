//! Gameplay outcomes
//!
//! Gameplay actions either complete or are turned down by a game rule.
//! Operations return `Result<Outcome<T>, E>` so callers must tell "not yet"
//! apart from "something broke".

use crate::items::ItemId;
use crate::time::Timestamp;
use serde::Serialize;
use std::fmt;

/// Result of a gameplay action that did not fail.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Completed(_) => None,
        }
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}

impl<T> From<Rejection> for Outcome<T> {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Why a game rule turned an action down.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Rejection {
    /// The location was consumed and its timer has not run out.
    #[serde(rename_all = "camelCase")]
    StillRespawning {
        location_id: String,
        respawn_time: Timestamp,
    },
    /// The player does not hold enough of the required item.
    #[serde(rename_all = "camelCase")]
    InsufficientResources {
        item: ItemId,
        required: u32,
        available: u32,
    },
    /// The location was consumed for good.
    #[serde(rename_all = "camelCase")]
    Spent { location_id: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StillRespawning {
                location_id,
                respawn_time,
            } => write!(f, "location {location_id} respawns at {respawn_time}"),
            Self::InsufficientResources {
                item,
                required,
                available,
            } => write!(f, "needs {required} {item}, holds {available}"),
            Self::Spent { location_id } => write!(f, "location {location_id} is spent"),
        }
    }
}
