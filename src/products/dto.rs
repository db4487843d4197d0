use serde::{Deserialize, Serialize};

use crate::fridge::repo_types::Nutrition;

/// A food-database product as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub code: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub nutrition_grades: String,
    #[serde(default)]
    pub nutriments: Nutrition,
}

impl Product {
    /// The product name, or its code when the database has no name.
    pub fn display_name(&self) -> &str {
        let name = self.product_name.trim();
        if name.is_empty() {
            self.code.trim()
        } else {
            name
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}
