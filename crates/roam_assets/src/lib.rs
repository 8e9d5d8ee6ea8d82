//! Roam Asset Pipeline
//!
//! Static game configuration: reference items and the three loot tables.
//! Defaults are compiled in; each can be replaced by a JSON file. Everything
//! is validated once at startup and handed out as immutable values.

pub mod error;

pub use error::{AssetError, AssetResult};

use roam_core::{LootRefItem, LootTable, LootTables, ReferenceData, ReferenceItem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const REFERENCE_DATA: &str = include_str!("../assets/reference_data.json");
const LOOT_TABLES: &str = include_str!("../assets/loot_tables.json");

/// Optional replacement files for the embedded defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub reference_data: Option<PathBuf>,
    pub loot_tables: Option<PathBuf>,
}

/// Where an asset came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Embedded(&'static str),
    File(PathBuf),
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded(name) => write!(f, "embedded {name}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// On-disk shape of the loot table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LootTablesFile {
    minion_battle: Vec<LootRefItem>,
    general_battle: Vec<LootRefItem>,
    chest: Vec<LootRefItem>,
}

/// Validated static configuration shared by every request.
#[derive(Debug, Clone)]
pub struct GameAssets {
    pub reference: ReferenceData,
    pub loot: LootTables,
}

impl GameAssets {
    /// The compiled-in defaults.
    pub fn embedded() -> AssetResult<Self> {
        Self::load(&AssetPaths::default())
    }

    /// Load defaults, replacing any asset named in `paths`.
    pub fn load(paths: &AssetPaths) -> AssetResult<Self> {
        let (reference_source, reference_text) =
            read_source(paths.reference_data.as_deref(), "reference_data.json", REFERENCE_DATA)?;
        let (loot_source, loot_text) =
            read_source(paths.loot_tables.as_deref(), "loot_tables.json", LOOT_TABLES)?;

        let reference = parse_reference(&reference_source, &reference_text)?;
        let loot = parse_loot(&loot_source, &loot_text)?;

        tracing::info!(
            reference = %reference_source,
            items = reference.len(),
            loot = %loot_source,
            "Game assets loaded"
        );
        Ok(Self { reference, loot })
    }
}

fn read_source(
    path: Option<&Path>,
    name: &'static str,
    embedded: &'static str,
) -> AssetResult<(AssetSource, String)> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((AssetSource::File(path.to_path_buf()), text))
        }
        None => Ok((AssetSource::Embedded(name), embedded.to_string())),
    }
}

fn parse_reference(source: &AssetSource, text: &str) -> AssetResult<ReferenceData> {
    let items: Vec<ReferenceItem> = serde_json::from_str(text).map_err(|err| AssetError::Json {
        origin: source.to_string(),
        source: err,
    })?;
    ReferenceData::from_items(items).map_err(|err| AssetError::Invalid {
        origin: source.to_string(),
        source: err,
    })
}

fn parse_loot(source: &AssetSource, text: &str) -> AssetResult<LootTables> {
    let file: LootTablesFile = serde_json::from_str(text).map_err(|err| AssetError::Json {
        origin: source.to_string(),
        source: err,
    })?;
    let invalid = |err| AssetError::Invalid {
        origin: source.to_string(),
        source: err,
    };
    Ok(LootTables {
        minion_battle: LootTable::new("minionBattle", file.minion_battle).map_err(invalid)?,
        general_battle: LootTable::new("generalBattle", file.general_battle).map_err(invalid)?,
        chest: LootTable::new("chest", file.chest).map_err(invalid)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use roam_core::loot::WEIGHT_TOLERANCE;
    use roam_core::{CoreError, ItemId};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("roam-assets-{nanos}-{name}"));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn embedded_assets_are_valid() {
        let assets = GameAssets::embedded().unwrap();
        assert!(assets.reference.get(ItemId::Minion).unwrap().cooldown.is_some());
        assert!(assets.reference.respawn_duration(ItemId::Tower).is_none());
        assert!(assets.reference.respawn_duration(ItemId::Chest).is_some());
    }

    #[test]
    fn production_loot_tables_sum_to_one() {
        let assets = GameAssets::embedded().unwrap();
        for table in [
            &assets.loot.minion_battle,
            &assets.loot.general_battle,
            &assets.loot.chest,
        ] {
            assert!(
                (table.total_weight() - 1.0).abs() <= WEIGHT_TOLERANCE,
                "{} sums to {}",
                table.name(),
                table.total_weight()
            );
            assert!(table
                .entries()
                .iter()
                .all(|entry| entry.min_quantity == 1 && entry.max_quantity == 1));
        }
        assert_eq!(assets.loot.chest.entries().len(), 12);
        assert_eq!(assets.loot.general_battle.entries()[0].item_id, ItemId::GoldKey);
    }

    #[test]
    fn file_override_replaces_embedded_table() {
        let loot = serde_json::json!({
            "minionBattle": [{ "itemId": "WEAPON_TYPE_3", "weight": 1.0, "minQuantity": 2, "maxQuantity": 5 }],
            "generalBattle": [{ "itemId": "GOLD_KEY", "weight": 1.0, "minQuantity": 1, "maxQuantity": 1 }],
            "chest": [{ "itemId": "SHIELD_TYPE_1", "weight": 1.0, "minQuantity": 1, "maxQuantity": 1 }]
        });
        let path = scratch_file("loot.json", &loot.to_string());
        let assets = GameAssets::load(&AssetPaths {
            reference_data: None,
            loot_tables: Some(path.clone()),
        })
        .unwrap();
        std::fs::remove_file(path).ok();

        assert_eq!(assets.loot.minion_battle.entries().len(), 1);
        assert_eq!(assets.loot.minion_battle.entries()[0].min_quantity, 2);
    }

    #[test]
    fn short_table_is_rejected_at_load() {
        let loot = serde_json::json!({
            "minionBattle": [{ "itemId": "WEAPON_TYPE_1", "weight": 0.5, "minQuantity": 1, "maxQuantity": 1 }],
            "generalBattle": [{ "itemId": "GOLD_KEY", "weight": 1.0, "minQuantity": 1, "maxQuantity": 1 }],
            "chest": [{ "itemId": "SHIELD_TYPE_1", "weight": 1.0, "minQuantity": 1, "maxQuantity": 1 }]
        });
        let path = scratch_file("short.json", &loot.to_string());
        let result = GameAssets::load(&AssetPaths {
            reference_data: None,
            loot_tables: Some(path.clone()),
        });
        std::fs::remove_file(path).ok();

        assert!(matches!(
            result,
            Err(AssetError::Invalid {
                source: CoreError::MalformedLootTable { .. },
                ..
            })
        ));
    }

    #[test]
    fn missing_override_file_is_an_io_error() {
        let result = GameAssets::load(&AssetPaths {
            reference_data: Some(PathBuf::from("/nonexistent/roam/reference.json")),
            loot_tables: None,
        });
        assert!(matches!(result, Err(AssetError::Io { .. })));
    }
}
