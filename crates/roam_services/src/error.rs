//! Service layer errors

use roam_assets::AssetError;
use roam_core::{CoreError, SpawnKind};
use roam_net::NetError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Someone else wrote the document since it was read.
    #[error("revision conflict on {collection}/{key}: expected {expected:?}, found {found:?}")]
    Conflict {
        collection: String,
        key: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    #[error("storage i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("document {collection}/{key} is unreadable: {source}")]
    Corrupt {
        collection: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{action} is not possible at location '{location_id}' ({kind:?})")]
    UnsupportedAction {
        location_id: String,
        kind: SpawnKind,
        action: &'static str,
    },

    #[error("settings {path}: {reason}")]
    Settings { path: PathBuf, reason: String },
}

impl ServiceError {
    /// Failures at the provider boundary that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Net(err) => err.is_transient(),
            Self::Storage(StorageError::Conflict { .. }) => true,
            _ => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
