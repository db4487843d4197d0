use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MAX_TAGS: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 90;

/// Generates a closed wire vocabulary: the enum, its spellings and a lookup.
macro_rules! vocabulary {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn from_wire(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Every spelling, quoted and comma separated, for prompts and errors.
            pub fn vocabulary() -> String {
                Self::ALL
                    .iter()
                    .map(|v| format!("\"{}\"", v.as_str()))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary! {
    /// Measurement unit for ingredients and serving sizes.
    Unit {
        Grams => "g",
        Milliliters => "ml",
        Ounces => "oz",
        FluidOunces => "fl oz",
        Tablespoons => "tbsp",
        Teaspoons => "tsp",
        Pieces => "pcs",
        Cups => "cups",
    }
}

impl Unit {
    /// Units that scale continuously; the only ones allowed for a serving size.
    pub const CONTINUOUS: &'static [Unit] =
        &[Unit::Grams, Unit::Milliliters, Unit::Ounces, Unit::FluidOunces];

    pub fn is_continuous(self) -> bool {
        Self::CONTINUOUS.contains(&self)
    }
}

vocabulary! {
    Category {
        Produce => "produce",
        Meat => "meat",
        Dairy => "dairy",
        Grain => "grain",
        Spices => "spices",
        Bakery => "bakery",
        Beverages => "beverages",
        Frozen => "frozen",
        Canned => "canned",
        Seafood => "seafood",
        Snacks => "snacks",
        Other => "other",
    }
}

vocabulary! {
    MealType {
        Breakfast => "breakfast",
        Lunch => "lunch",
        Dinner => "dinner",
        Snack => "snack",
    }
}

vocabulary! {
    MealKind {
        Soup => "soup",
        Salad => "salad",
        Main => "main",
        Dessert => "dessert",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Ingredient {
    pub name: String,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub quantity: f64,
    pub unit: Unit,
    pub category: Category,
}

/// A validated meal produced by the generator.
///
/// The `validate` bounds mirror the limits stated in the system contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub name: String,
    pub types: BTreeSet<MealType>,
    pub kinds: BTreeSet<MealKind>,
    #[validate(length(max = 90, message = "must be at most 90 characters"))]
    pub description: String,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub calories_per_serving: f64,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub protein_per_serving: f64,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub carbs_per_serving: f64,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub fat_per_serving: f64,
    #[validate(range(min = 0.0, message = "must be >= 0"))]
    pub preparation_minutes: f64,
    #[validate(range(exclusive_min = 0.0, message = "must be > 0"))]
    pub serving_size: f64,
    #[validate(custom(function = "continuous_unit"))]
    pub serving_size_unit: Unit,
    #[validate(length(max = 10, message = "must have at most 10 entries"))]
    pub tags: Vec<String>,
    #[validate(nested)]
    pub ingredients_per_serving: Vec<Ingredient>,
    #[validate(length(min = 1, message = "must contain at least one step"))]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal_prep_instructions: Option<Vec<String>>,
}

fn continuous_unit(unit: &Unit) -> Result<(), ValidationError> {
    if unit.is_continuous() {
        return Ok(());
    }
    let expected = Unit::CONTINUOUS
        .iter()
        .map(|u| format!("\"{u}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let mut err = ValidationError::new("continuous_unit");
    err.message = Some(format!("\"{unit}\" is not a continuous unit; expected one of {expected}").into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_wire_spellings() {
        assert_eq!(Unit::from_wire("fl oz"), Some(Unit::FluidOunces));
        assert_eq!(Unit::from_wire("cups"), Some(Unit::Cups));
        assert_eq!(Unit::from_wire("servings"), None);
        assert_eq!(
            serde_json::to_string(&Unit::FluidOunces).unwrap(),
            "\"fl oz\""
        );
    }

    #[test]
    fn only_mass_and_volume_units_are_continuous() {
        let continuous: Vec<_> = Unit::ALL.iter().filter(|u| u.is_continuous()).collect();
        assert_eq!(
            continuous,
            vec![&Unit::Grams, &Unit::Milliliters, &Unit::Ounces, &Unit::FluidOunces]
        );
        assert!(!Unit::Cups.is_continuous());
        assert!(!Unit::Pieces.is_continuous());
    }

    #[test]
    fn contract_limits_match_derived_bounds() {
        assert_eq!(MAX_TAGS, 10);
        assert_eq!(MAX_DESCRIPTION_CHARS, 90);
        assert!(continuous_unit(&Unit::Ounces).is_ok());
        let err = continuous_unit(&Unit::Pieces).unwrap_err();
        assert!(err.message.unwrap().contains("\"pcs\" is not a continuous unit"));
    }

    #[test]
    fn vocabulary_lists_every_value() {
        assert_eq!(
            MealKind::vocabulary(),
            "\"soup\", \"salad\", \"main\", \"dessert\""
        );
        assert_eq!(Category::ALL.len(), 12);
    }
}
