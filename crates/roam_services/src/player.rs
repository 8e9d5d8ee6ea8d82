//! Player records

use crate::settings::GameplaySettings;
use roam_core::{Inventory, Item, ItemId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub name: String,
    pub character_type: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_weapon: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_shield: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_helmet: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_body_armor: Option<ItemId>,
    pub energy_level: i32,
    pub max_energy_level: i32,
    #[serde(default)]
    pub inventory: Inventory,
}

impl PlayerData {
    /// A new player: starter armor and weapon equipped, every character
    /// type unlocked, energy full.
    pub fn starter(settings: &GameplaySettings) -> Self {
        let inventory = Inventory::from_items([
            Item::new(ItemId::BodyArmorType1, 1),
            Item::new(ItemId::WeaponType1, 1),
            Item::new(ItemId::CharacterType1, 1),
            Item::new(ItemId::CharacterType2, 1),
            Item::new(ItemId::CharacterType3, 1),
            Item::new(ItemId::CharacterType4, 1),
        ]);
        Self {
            name: settings.default_player_name.clone(),
            character_type: ItemId::CharacterType1,
            equipped_weapon: Some(ItemId::WeaponType1),
            equipped_shield: None,
            equipped_helmet: None,
            equipped_body_armor: Some(ItemId::BodyArmorType1),
            energy_level: settings.default_energy,
            max_energy_level: settings.default_energy,
            inventory,
        }
    }

    /// Top energy back up to the maximum; returns the amount restored.
    pub fn restore_energy(&mut self) -> i32 {
        let restored = (self.max_energy_level - self.energy_level).max(0);
        self.energy_level = self.max_energy_level;
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_player_matches_defaults() {
        let player = PlayerData::starter(&GameplaySettings::default());
        assert_eq!(player.energy_level, 80);
        assert_eq!(player.max_energy_level, 80);
        assert_eq!(player.inventory.len(), 6);
        assert!(player.inventory.contains(ItemId::CharacterType4));
        assert_eq!(player.equipped_body_armor, Some(ItemId::BodyArmorType1));
        assert_eq!(player.equipped_helmet, None);
    }

    #[test]
    fn restore_energy_reports_the_difference() {
        let mut player = PlayerData::starter(&GameplaySettings::default());
        player.energy_level = 35;
        assert_eq!(player.restore_energy(), 45);
        assert_eq!(player.energy_level, 80);
        assert_eq!(player.restore_energy(), 0);
    }

    #[test]
    fn serializes_camel_case() {
        let player = PlayerData::starter(&GameplaySettings::default());
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["maxEnergyLevel"], 80);
        assert_eq!(json["equippedWeapon"], "WEAPON_TYPE_1");
        assert_eq!(json["inventory"][0]["itemId"], "BODY_ARMOR_TYPE_1");
        assert!(json.get("equippedShield").is_none());
    }
}
