use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A nutrition figure as reported by the food database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NutrimentValue {
    Number(f64),
    Text(String),
}

pub type Nutrition = BTreeMap<String, NutrimentValue>;

pub const ENERGY_KCAL_100G: &str = "energy-kcal_100g";

/// One entry of the persisted fridge inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FridgeItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
}

impl FridgeItem {
    pub fn manual(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nutrition: None,
        }
    }

    pub fn energy_kcal_per_100g(&self) -> Option<f64> {
        match self.nutrition.as_ref()?.get(ENERGY_KCAL_100G)? {
            NutrimentValue::Number(n) => Some(*n),
            NutrimentValue::Text(s) => s.trim().parse().ok(),
        }
    }
}
