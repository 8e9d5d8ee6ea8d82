//! Settings management
//!
//! One JSON file, every section optional. Missing fields take the defaults
//! below.

use crate::error::{ServiceError, ServiceResult};
use roam_assets::AssetPaths;
use roam_net::{CoverageConfig, HttpConfig, ProviderConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "ROAM_SETTINGS";

/// Server settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub coverage: CoverageConfig,
    pub provider: ProviderSettings,
    pub gameplay: GameplaySettings,
    pub storage: StorageSettings,
    pub assets: AssetPaths,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    #[serde(flatten)]
    pub query: ProviderConfig,
    #[serde(flatten)]
    pub http: HttpConfig,
    /// Serve generated points instead of calling the provider.
    pub offline: bool,
    pub synthetic: SyntheticSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSettings {
    pub points_per_cell: u32,
    pub ttl_seconds: i64,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            points_per_cell: 6,
            ttl_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    pub default_player_name: String,
    pub default_energy: i32,
    pub freed_leaders_to_win: u32,
    pub minion_energy: i32,
    pub general_energy: i32,
    pub minion_attack_bonus: i32,
    pub minion_defense_bonus: i32,
    pub general_attack_bonus: i32,
    pub general_defense_bonus: i32,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            default_player_name: "Jordyen".into(),
            default_energy: 80,
            freed_leaders_to_win: 3,
            minion_energy: 100,
            general_energy: 200,
            minion_attack_bonus: 5,
            minion_defense_bonus: 5,
            general_attack_bonus: 15,
            general_defense_bonus: 15,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for JSON documents. In-memory storage when absent.
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_file(path: &Path) -> ServiceResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| ServiceError::Settings {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|err| ServiceError::Settings {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Settings from `explicit`, else from `$ROAM_SETTINGS`, else defaults.
    pub fn load(explicit: Option<&Path>) -> ServiceResult<Self> {
        let from_env = std::env::var_os(SETTINGS_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading settings");
                Self::from_file(&path)
            }
            None => {
                tracing::info!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }
}
