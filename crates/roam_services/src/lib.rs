//! Roam Services Layer
//!
//! Settings, document storage, world assembly and the gameplay operations
//! built on top of them.

pub mod assembler;
pub mod error;
pub mod game;
pub mod player;
pub mod settings;
pub mod storage;

pub use assembler::{AssemblyStats, WorldAssembler};
pub use error::{ServiceError, ServiceResult, StorageError};
pub use game::{BattleData, BattleSummary, EnergyRestored, GameService, Rewards};
pub use player::PlayerData;
pub use settings::Settings;
pub use storage::{DocumentStore, JsonDirStore, MemoryStore, Versioned};

use std::sync::Arc;

/// Open the store named by the settings: a JSON directory when one is
/// configured, memory otherwise.
pub fn open_store(settings: &settings::StorageSettings) -> ServiceResult<Arc<dyn DocumentStore>> {
    match &settings.data_dir {
        Some(dir) => Ok(Arc::new(JsonDirStore::open(dir)?)),
        None => {
            tracing::warn!("No data directory configured, state will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
