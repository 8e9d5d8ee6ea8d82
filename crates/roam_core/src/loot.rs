//! Weighted loot sampling
//!
//! A table is walked in declared order, accumulating weights; the first
//! entry whose running total reaches the draw wins. Tables are validated
//! when built, so a draw can only fail if floating point leaves the last
//! running total short of the draw.

use crate::error::{CoreError, CoreResult};
use crate::items::{Item, ItemId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Allowed distance between a table's total weight and 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LootRefItem {
    pub item_id: ItemId,
    pub weight: f64,
    pub min_quantity: i32,
    pub max_quantity: i32,
}

impl LootRefItem {
    pub const fn new(item_id: ItemId, weight: f64, min_quantity: i32, max_quantity: i32) -> Self {
        Self {
            item_id,
            weight,
            min_quantity,
            max_quantity,
        }
    }
}

/// A validated, immutable loot table.
#[derive(Debug, Clone, PartialEq)]
pub struct LootTable {
    name: String,
    entries: Vec<LootRefItem>,
}

impl LootTable {
    pub fn new(name: impl Into<String>, entries: Vec<LootRefItem>) -> CoreResult<Self> {
        let name = name.into();
        let malformed = |reason: String| CoreError::MalformedLootTable {
            table: name.clone(),
            reason,
        };

        if entries.is_empty() {
            return Err(malformed("table is empty".into()));
        }
        for entry in &entries {
            if !(0.0..=1.0).contains(&entry.weight) {
                return Err(malformed(format!(
                    "{} has weight {} outside [0, 1]",
                    entry.item_id, entry.weight
                )));
            }
            if entry.min_quantity < 0 || entry.min_quantity > entry.max_quantity {
                return Err(malformed(format!(
                    "{} has quantity range {}..={}",
                    entry.item_id, entry.min_quantity, entry.max_quantity
                )));
            }
        }
        let total: f64 = entries.iter().map(|entry| entry.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(malformed(format!("weights sum to {total}, expected 1")));
        }

        Ok(Self { name, entries })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[LootRefItem] {
        &self.entries
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }

    /// Entry selected by `roll`, a value in `[0, 1)`.
    pub fn select(&self, roll: f64) -> CoreResult<&LootRefItem> {
        let mut cumulative = 0.0;
        for entry in &self.entries {
            cumulative += entry.weight;
            if roll <= cumulative {
                return Ok(entry);
            }
        }
        // Rounding can leave the final sum a hair below the draw.
        match self.entries.last() {
            Some(last) if roll - cumulative <= WEIGHT_TOLERANCE => Ok(last),
            _ => Err(CoreError::MalformedLootTable {
                table: self.name.clone(),
                reason: format!("cumulative weight {cumulative} never reached draw {roll}"),
            }),
        }
    }

    /// Draw one reward. The quantity awarded is the entry's minimum.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> CoreResult<Item> {
        let roll: f64 = rng.gen();
        let entry = self.select(roll)?;
        tracing::debug!(table = %self.name, roll, item = %entry.item_id, "Loot drawn");
        Ok(Item::new(entry.item_id, entry.min_quantity))
    }

    pub fn draw_many<R: Rng>(&self, count: usize, rng: &mut R) -> CoreResult<Vec<Item>> {
        (0..count).map(|_| self.draw(rng)).collect()
    }
}

/// The three reward tables, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct LootTables {
    pub minion_battle: LootTable,
    pub general_battle: LootTable,
    pub chest: LootTable,
}

impl LootTables {
    /// Gold key plus one minion-table item.
    pub fn minion_battle_rewards<R: Rng>(&self, rng: &mut R) -> CoreResult<Vec<Item>> {
        let mut items = vec![Item::new(ItemId::GoldKey, 1)];
        items.extend(self.minion_battle.draw_many(1, rng)?);
        Ok(items)
    }

    /// A freed leader plus two general-table items.
    pub fn general_battle_rewards<R: Rng>(&self, rng: &mut R) -> CoreResult<Vec<Item>> {
        let mut items = vec![Item::new(ItemId::FreedLeaders, 1)];
        items.extend(self.general_battle.draw_many(2, rng)?);
        Ok(items)
    }

    /// A diamond key plus two chest-table items.
    pub fn chest_rewards<R: Rng>(&self, rng: &mut R) -> CoreResult<Vec<Item>> {
        let mut items = vec![Item::new(ItemId::DiamondKey, 1)];
        items.extend(self.chest.draw_many(2, rng)?);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table() -> LootTable {
        LootTable::new(
            "test",
            vec![
                LootRefItem::new(ItemId::HelmetType1, 0.5, 1, 1),
                LootRefItem::new(ItemId::ShieldType1, 0.3, 2, 4),
                LootRefItem::new(ItemId::WeaponType1, 0.2, 1, 1),
            ],
        )
        .unwrap()
    }

    #[test]
    fn select_walks_cumulative_weights() {
        let table = table();
        assert_eq!(table.select(0.0).unwrap().item_id, ItemId::HelmetType1);
        assert_eq!(table.select(0.5).unwrap().item_id, ItemId::HelmetType1);
        assert_eq!(table.select(0.51).unwrap().item_id, ItemId::ShieldType1);
        assert_eq!(table.select(0.8).unwrap().item_id, ItemId::ShieldType1);
        assert_eq!(table.select(0.999_999).unwrap().item_id, ItemId::WeaponType1);
    }

    #[test]
    fn draw_awards_minimum_quantity() {
        let table = table();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let item = table.draw(&mut rng).unwrap();
            let entry = table
                .entries()
                .iter()
                .find(|entry| entry.item_id == item.item_id)
                .unwrap();
            assert_eq!(item.quantity, entry.min_quantity);
        }
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let short = vec![
            LootRefItem::new(ItemId::HelmetType1, 0.5, 1, 1),
            LootRefItem::new(ItemId::ShieldType1, 0.3, 1, 1),
        ];
        assert!(matches!(
            LootTable::new("short", short),
            Err(CoreError::MalformedLootTable { .. })
        ));
    }

    #[test]
    fn rejects_bad_entries() {
        let negative = vec![
            LootRefItem::new(ItemId::HelmetType1, 1.2, 1, 1),
            LootRefItem::new(ItemId::ShieldType1, -0.2, 1, 1),
        ];
        assert!(LootTable::new("negative", negative).is_err());

        let inverted = vec![LootRefItem::new(ItemId::HelmetType1, 1.0, 3, 1)];
        assert!(LootTable::new("inverted", inverted).is_err());

        assert!(LootTable::new("empty", Vec::new()).is_err());
    }

    #[test]
    fn rounding_shortfall_falls_back_to_last_entry() {
        let table = LootTable::new(
            "thirds",
            vec![
                LootRefItem::new(ItemId::HelmetType1, 1.0 / 3.0, 1, 1),
                LootRefItem::new(ItemId::ShieldType1, 1.0 / 3.0, 1, 1),
                LootRefItem::new(ItemId::WeaponType1, 1.0 / 3.0 - 1e-9, 1, 1),
            ],
        )
        .unwrap();
        assert_eq!(table.select(0.999_999_999_9).unwrap().item_id, ItemId::WeaponType1);
        assert!(table.select(1.5).is_err());
    }

    #[test]
    fn reward_bundles_have_fixed_heads() {
        let tables = LootTables {
            minion_battle: table(),
            general_battle: table(),
            chest: table(),
        };
        let mut rng = StdRng::seed_from_u64(3);

        let minion = tables.minion_battle_rewards(&mut rng).unwrap();
        assert_eq!(minion.len(), 2);
        assert_eq!(minion[0], Item::new(ItemId::GoldKey, 1));

        let general = tables.general_battle_rewards(&mut rng).unwrap();
        assert_eq!(general.len(), 3);
        assert_eq!(general[0], Item::new(ItemId::FreedLeaders, 1));

        let chest = tables.chest_rewards(&mut rng).unwrap();
        assert_eq!(chest.len(), 3);
        assert_eq!(chest[0], Item::new(ItemId::DiamondKey, 1));
    }
}
