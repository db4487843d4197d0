use serde::{Deserialize, Serialize};

use super::repo_types::{FridgeItem, Nutrition};
use super::services::{Fridge, MIN_FRIDGE_SELECTION};

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct FridgeItemView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<Nutrition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_kcal_per_100g: Option<f64>,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct FridgeView {
    pub items: Vec<FridgeItemView>,
    pub selected: Vec<String>,
    pub ready: bool,
    pub min_selection: usize,
}

impl From<Fridge> for FridgeView {
    fn from(fridge: Fridge) -> Self {
        let items = fridge
            .items()
            .iter()
            .map(|item: &FridgeItem| FridgeItemView {
                name: item.name.clone(),
                nutrition: item.nutrition.clone(),
                energy_kcal_per_100g: item.energy_kcal_per_100g(),
                selected: fridge.is_selected(&item.name),
            })
            .collect();
        Self {
            items,
            selected: fridge.selected().to_vec(),
            ready: fridge.ready(),
            min_selection: MIN_FRIDGE_SELECTION,
        }
    }
}
