//! Turns user input into a generation request.
//!
//! The system instruction is a fixed contract and never sees user data; only
//! the user instruction reflects the request.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::{Category, MealKind, MealType, Unit, MAX_DESCRIPTION_CHARS, MAX_TAGS};

pub const PROMPT_VERSION: &str = "meal-plan-contract/v1";

pub const NO_DESCRIPTION: &str = "no description provided";
pub const NONE_PLACEHOLDER: &str = "none";

/// Loosely structured input from any of the generation triggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub selection: Vec<String>,
}

impl MealRequest {
    /// True when nothing but (possibly) a description was supplied.
    pub fn is_description_only(&self) -> bool {
        [&self.ingredients, &self.allergies, &self.preferences, &self.selection]
            .iter()
            .all(|list| clean_list(list).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_instruction: String,
}

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref SYSTEM_INSTRUCTION: String = render_contract();
}

/// The contract text; identical for every request.
pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION.as_str()
}

pub fn build_request(req: &MealRequest) -> GenerationRequest {
    GenerationRequest {
        system_instruction: system_instruction().to_string(),
        user_instruction: user_instruction(req),
    }
}

fn user_instruction(req: &MealRequest) -> String {
    let description = req
        .description
        .as_deref()
        .map(normalize)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    format!(
        "Generate a meal idea based on the following:
- Description: {description}
- Preferred ingredients: {ingredients}
- Dietary preferences: {preferences}
- Allergies: {allergies}
- Fridge selection: {selection}",
        description = description,
        ingredients = joined_or_none(&req.ingredients),
        preferences = joined_or_none(&req.preferences),
        allergies = joined_or_none(&req.allergies),
        selection = joined_or_none(&req.selection),
    )
}

fn normalize(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

/// Trims entries, collapses inner whitespace and drops blanks; order is kept.
pub fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect()
}

fn joined_or_none(items: &[String]) -> String {
    let cleaned = clean_list(items);
    if cleaned.is_empty() {
        NONE_PLACEHOLDER.to_string()
    } else {
        cleaned.join(", ")
    }
}

fn render_contract() -> String {
    let continuous = Unit::CONTINUOUS
        .iter()
        .map(|u| format!("\"{}\"", u.as_str()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"You are a meal planning assistant. Contract version: {version}.

Reply with exactly one JSON object and nothing else: no markdown, no code fences, no commentary.
The object maps a meal type ({meal_types}) to one meal plan, for example {{"lunch": {{ ... }}}}.

Every meal plan MUST have these fields:
- "name": string
- "types": array of distinct values from [{meal_types}]
- "kinds": array of distinct values from [{meal_kinds}]
- "description": string, at most {max_description} characters
- "caloriesPerServing": number >= 0 (kcal)
- "proteinPerServing": number >= 0 (grams)
- "carbsPerServing": number >= 0 (grams)
- "fatPerServing": number >= 0 (grams)
- "preparationMinutes": number >= 0
- "servingSize": number > 0
- "servingSizeUnit": one of [{continuous}]
- "tags": array of at most {max_tags} strings
- "ingredientsPerServing": array of objects with
    - "name": string, lowercase, singular (e.g. "tomato", not "Tomatoes")
    - "quantity": number >= 0
    - "unit": one of [{units}]
    - "category": one of [{categories}]
- "instructions": non-empty array of strings, one step per entry
Optional field:
- "mealPrepInstructions": array of strings for preparing the meal ahead of time

Serving size rules:
- "servingSizeUnit" must be one of [{continuous}].
- Never use discrete units such as "cups", "pcs", "tbsp", "tsp", "servings" or "portions" for the serving size; those are only valid for ingredient quantities.

Generation policy:
- Maximize variety; do not repeat the same meal for similar requests.
- Strictly respect every stated allergy and dietary restriction.
- Treat preferred ingredients as suggestions. Do not overuse a provided favorite-ingredient list; combine it with other suitable ingredients.
- When fridge items are listed, build the meal around them and take any given nutrition data into account.
- Macros are per serving and must be consistent with the ingredients."#,
        version = PROMPT_VERSION,
        meal_types = MealType::vocabulary(),
        meal_kinds = MealKind::vocabulary(),
        max_description = MAX_DESCRIPTION_CHARS,
        continuous = continuous,
        max_tags = MAX_TAGS,
        units = Unit::vocabulary(),
        categories = Category::vocabulary(),
    )
}
