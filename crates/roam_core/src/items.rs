//! Item identifiers and player inventories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every item type the game knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemId {
    #[serde(rename = "CHARACTER_TYPE_1")]
    CharacterType1,
    #[serde(rename = "CHARACTER_TYPE_2")]
    CharacterType2,
    #[serde(rename = "CHARACTER_TYPE_3")]
    CharacterType3,
    #[serde(rename = "CHARACTER_TYPE_4")]
    CharacterType4,

    #[serde(rename = "FREED_LEADERS")]
    FreedLeaders,
    #[serde(rename = "GOLD_KEY")]
    GoldKey,
    #[serde(rename = "DIAMOND_KEY")]
    DiamondKey,
    #[serde(rename = "CHEST")]
    Chest,
    #[serde(rename = "TOWER")]
    Tower,
    #[serde(rename = "ENERGY_STATION")]
    EnergyStation,

    #[serde(rename = "MINION")]
    Minion,
    #[serde(rename = "GENERAL")]
    General,

    #[serde(rename = "WEAPON_TYPE_1")]
    WeaponType1,
    #[serde(rename = "WEAPON_TYPE_2")]
    WeaponType2,
    #[serde(rename = "WEAPON_TYPE_3")]
    WeaponType3,

    #[serde(rename = "BODY_ARMOR_TYPE_1")]
    BodyArmorType1,
    #[serde(rename = "BODY_ARMOR_TYPE_2")]
    BodyArmorType2,
    #[serde(rename = "BODY_ARMOR_TYPE_3")]
    BodyArmorType3,

    #[serde(rename = "HELMET_TYPE_1")]
    HelmetType1,
    #[serde(rename = "HELMET_TYPE_2")]
    HelmetType2,
    #[serde(rename = "HELMET_TYPE_3")]
    HelmetType3,

    #[serde(rename = "SHIELD_TYPE_1")]
    ShieldType1,
    #[serde(rename = "SHIELD_TYPE_2")]
    ShieldType2,
    #[serde(rename = "SHIELD_TYPE_3")]
    ShieldType3,
}

impl ItemId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CharacterType1 => "CHARACTER_TYPE_1",
            Self::CharacterType2 => "CHARACTER_TYPE_2",
            Self::CharacterType3 => "CHARACTER_TYPE_3",
            Self::CharacterType4 => "CHARACTER_TYPE_4",
            Self::FreedLeaders => "FREED_LEADERS",
            Self::GoldKey => "GOLD_KEY",
            Self::DiamondKey => "DIAMOND_KEY",
            Self::Chest => "CHEST",
            Self::Tower => "TOWER",
            Self::EnergyStation => "ENERGY_STATION",
            Self::Minion => "MINION",
            Self::General => "GENERAL",
            Self::WeaponType1 => "WEAPON_TYPE_1",
            Self::WeaponType2 => "WEAPON_TYPE_2",
            Self::WeaponType3 => "WEAPON_TYPE_3",
            Self::BodyArmorType1 => "BODY_ARMOR_TYPE_1",
            Self::BodyArmorType2 => "BODY_ARMOR_TYPE_2",
            Self::BodyArmorType3 => "BODY_ARMOR_TYPE_3",
            Self::HelmetType1 => "HELMET_TYPE_1",
            Self::HelmetType2 => "HELMET_TYPE_2",
            Self::HelmetType3 => "HELMET_TYPE_3",
            Self::ShieldType1 => "SHIELD_TYPE_1",
            Self::ShieldType2 => "SHIELD_TYPE_2",
            Self::ShieldType3 => "SHIELD_TYPE_3",
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stack of one item type.
///
/// Quantities are signed so reward summaries can report losses (`-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub item_id: ItemId,
    pub quantity: i32,
}

impl Item {
    pub const fn new(item_id: ItemId, quantity: i32) -> Self {
        Self { item_id, quantity }
    }
}

/// A player's item stacks, one entry per item type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<Item>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut inventory = Self::new();
        for item in items {
            inventory.add(item);
        }
        inventory
    }

    pub fn quantity_of(&self, item_id: ItemId) -> u32 {
        self.items
            .iter()
            .find(|item| item.item_id == item_id)
            .map(|item| item.quantity.max(0) as u32)
            .unwrap_or(0)
    }

    pub fn contains(&self, item_id: ItemId) -> bool {
        self.quantity_of(item_id) > 0
    }

    /// Merge a stack into the inventory.
    pub fn add(&mut self, item: Item) {
        match self.items.iter_mut().find(|held| held.item_id == item.item_id) {
            Some(held) => held.quantity += item.quantity,
            None => self.items.push(item),
        }
        self.items.retain(|held| held.quantity > 0);
    }

    /// Remove `quantity` of an item. Returns false, leaving the inventory
    /// untouched, when not enough is held.
    pub fn debit(&mut self, item_id: ItemId, quantity: u32) -> bool {
        if quantity == 0 {
            return true;
        }
        if self.quantity_of(item_id) < quantity {
            return false;
        }
        self.add(Item::new(item_id, -(quantity as i32)));
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_use_wire_names() {
        let json = serde_json::to_string(&ItemId::BodyArmorType2).unwrap();
        assert_eq!(json, "\"BODY_ARMOR_TYPE_2\"");
        let back: ItemId = serde_json::from_str("\"ENERGY_STATION\"").unwrap();
        assert_eq!(back, ItemId::EnergyStation);
        assert_eq!(ItemId::GoldKey.to_string(), "GOLD_KEY");
    }

    #[test]
    fn inventory_merges_and_debits() {
        let mut inventory = Inventory::from_items([
            Item::new(ItemId::GoldKey, 2),
            Item::new(ItemId::GoldKey, 3),
        ]);
        assert_eq!(inventory.quantity_of(ItemId::GoldKey), 5);
        assert_eq!(inventory.len(), 1);

        assert!(!inventory.debit(ItemId::GoldKey, 6));
        assert_eq!(inventory.quantity_of(ItemId::GoldKey), 5);

        assert!(inventory.debit(ItemId::GoldKey, 5));
        assert!(!inventory.contains(ItemId::GoldKey));
        assert!(inventory.is_empty());
    }
}
