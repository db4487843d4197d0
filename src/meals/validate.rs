//! Checks a raw generator reply against the meal plan contract.
//!
//! The reply must be a JSON object whose values are candidate meal plans keyed
//! by meal type. Candidates are tried in [`CANDIDATE_PRIORITY`] order, then any
//! remaining keys alphabetically; the first one passing every check wins.
//!
//! Each candidate is checked in two passes. A walk over the raw value reports
//! missing fields, wrong JSON types and unknown vocabulary; once the shape is
//! right the candidate is deserialized and the bounds derived on [`MealPlan`]
//! are checked with `validator`.

use std::borrow::Cow;

use serde_json::{Map, Value};
use tracing::debug;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::errors::{GenerationError, GenerationResult};
use super::types::{Category, MealKind, MealPlan, MealType, Unit};

pub const CANDIDATE_PRIORITY: &[&str] = &["lunch", "dinner", "breakfast", "snack"];

pub fn validate_reply(raw: &str) -> GenerationResult {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| GenerationError::Parse(e.to_string()))?;

    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(GenerationError::Validation(format!(
                "expected a JSON object keyed by meal type, found {}",
                type_name(&other)
            )))
        }
    };

    // Closest failing candidate: objects before scalars, then fewest problems,
    // then earliest in preference order.
    let mut closest: Option<((bool, usize), &str, Vec<String>)> = None;
    for key in candidate_order(&map) {
        let candidate = &map[key];
        match check_meal_plan(candidate) {
            Ok(plan) => {
                debug!(candidate = %key, "meal candidate accepted");
                return Ok(plan);
            }
            Err(problems) => {
                debug!(candidate = %key, problems = problems.len(), "meal candidate rejected");
                let rank = (!candidate.is_object(), problems.len());
                if closest.as_ref().map_or(true, |(best, _, _)| rank < *best) {
                    closest = Some((rank, key, problems));
                }
            }
        }
    }

    match closest {
        Some((_, key, problems)) => Err(GenerationError::Validation(format!(
            "candidate \"{}\": {}",
            key,
            problems.join("; ")
        ))),
        None => Err(GenerationError::Empty(
            "the reply object has no meal-type keys".to_string(),
        )),
    }
}

fn candidate_order(map: &Map<String, Value>) -> Vec<&str> {
    let rank = |key: &str| {
        let key = key.trim().to_lowercase();
        CANDIDATE_PRIORITY
            .iter()
            .position(|p| *p == key)
            .unwrap_or(CANDIDATE_PRIORITY.len())
    };
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.cmp(b)));
    keys
}

/// Validates one candidate, returning every failing field on error.
pub fn check_meal_plan(candidate: &Value) -> Result<MealPlan, Vec<String>> {
    let Value::Object(obj) = candidate else {
        return Err(vec![format!(
            "expected a meal plan object, found {}",
            type_name(candidate)
        )]);
    };

    let mut p = Problems::default();
    check_shape(obj, &mut p);
    if !p.0.is_empty() {
        return Err(p.0);
    }

    let plan: MealPlan = serde_json::from_value(candidate.clone())
        .map_err(|e| vec![format!("does not match the meal plan shape: {e}")])?;

    match plan.validate() {
        Ok(()) => Ok(plan),
        Err(errors) => {
            collect_bounds("", &errors, &mut p);
            p.0.sort();
            Err(p.0)
        }
    }
}

fn check_shape(obj: &Map<String, Value>, p: &mut Problems) {
    if let Some(v) = required(obj, "", "name", p) {
        string(v, "name", p);
    }
    if let Some(v) = required(obj, "", "types", p) {
        vocab_list(v, "types", MealType::from_wire, MealType::vocabulary, p);
    }
    if let Some(v) = required(obj, "", "kinds", p) {
        vocab_list(v, "kinds", MealKind::from_wire, MealKind::vocabulary, p);
    }
    if let Some(v) = required(obj, "", "description", p) {
        string(v, "description", p);
    }
    for field in [
        "caloriesPerServing",
        "proteinPerServing",
        "carbsPerServing",
        "fatPerServing",
        "preparationMinutes",
        "servingSize",
    ] {
        if let Some(v) = required(obj, "", field, p) {
            number(v, field, p);
        }
    }
    if let Some(v) = required(obj, "", "servingSizeUnit", p) {
        vocab(v, "servingSizeUnit", Unit::from_wire, Unit::vocabulary, p);
    }
    if let Some(v) = required(obj, "", "tags", p) {
        string_list(v, "tags", p);
    }
    if let Some(v) = required(obj, "", "ingredientsPerServing", p) {
        ingredient_list(v, p);
    }
    if let Some(v) = required(obj, "", "instructions", p) {
        string_list(v, "instructions", p);
    }
    match obj.get("mealPrepInstructions") {
        None | Some(Value::Null) => {}
        Some(v) => string_list(v, "mealPrepInstructions", p),
    }
}

fn ingredient_list(v: &Value, p: &mut Problems) {
    const FIELD: &str = "ingredientsPerServing";
    let Some(items) = array(v, FIELD, p) else {
        return;
    };
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("{FIELD}[{i}]");
        let Value::Object(obj) = item else {
            p.push(&prefix, format!("must be an object, found {}", type_name(item)));
            continue;
        };
        if let Some(v) = required(obj, &prefix, "name", p) {
            string(v, &join_path(&prefix, "name"), p);
        }
        if let Some(v) = required(obj, &prefix, "quantity", p) {
            number(v, &join_path(&prefix, "quantity"), p);
        }
        if let Some(v) = required(obj, &prefix, "unit", p) {
            vocab(v, &join_path(&prefix, "unit"), Unit::from_wire, Unit::vocabulary, p);
        }
        if let Some(v) = required(obj, &prefix, "category", p) {
            vocab(
                v,
                &join_path(&prefix, "category"),
                Category::from_wire,
                Category::vocabulary,
                p,
            );
        }
    }
}

/// Flattens `validator` errors into wire-named problem lines.
fn collect_bounds(prefix: &str, errors: &ValidationErrors, p: &mut Problems) {
    for (field, kind) in errors.errors() {
        let path = join_path(prefix, &camel_case(field));
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    let msg = err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(format!("fails `{}`", err.code)));
                    match err.params.get("value").and_then(|v| found(&err.code, v)) {
                        Some(found) => p.push(&path, format!("{msg}, found {found}")),
                        None => p.push(&path, msg),
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_bounds(&path, inner, p),
            ValidationErrorsKind::List(items) => {
                for (i, inner) in items {
                    collect_bounds(&format!("{path}[{i}]"), inner, p);
                }
            }
        }
    }
}

/// What a failing value looked like: its length for length rules, else the value.
fn found(code: &str, value: &Value) -> Option<String> {
    match (code, value) {
        ("length", Value::Array(items)) => Some(items.len().to_string()),
        ("length", Value::String(s)) => Some(s.chars().count().to_string()),
        (_, Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, path: &str, msg: impl std::fmt::Display) {
        self.0.push(format!("`{path}` {msg}"));
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn required<'v>(
    obj: &'v Map<String, Value>,
    prefix: &str,
    field: &str,
    p: &mut Problems,
) -> Option<&'v Value> {
    match obj.get(field) {
        None | Some(Value::Null) => {
            p.push(&join_path(prefix, field), "is missing");
            None
        }
        Some(v) => Some(v),
    }
}

fn string(v: &Value, path: &str, p: &mut Problems) {
    if !v.is_string() {
        p.push(path, format!("must be a string, found {}", type_name(v)));
    }
}

fn number(v: &Value, path: &str, p: &mut Problems) {
    if !v.is_number() {
        p.push(path, format!("must be a number, found {}", type_name(v)));
    }
}

fn array<'v>(v: &'v Value, path: &str, p: &mut Problems) -> Option<&'v Vec<Value>> {
    match v {
        Value::Array(items) => Some(items),
        other => {
            p.push(path, format!("must be an array, found {}", type_name(other)));
            None
        }
    }
}

fn string_list(v: &Value, path: &str, p: &mut Problems) {
    if let Some(items) = array(v, path, p) {
        for (i, item) in items.iter().enumerate() {
            string(item, &format!("{path}[{i}]"), p);
        }
    }
}

fn vocab<T>(
    v: &Value,
    path: &str,
    from_wire: fn(&str) -> Option<T>,
    vocabulary: fn() -> String,
    p: &mut Problems,
) {
    match v.as_str() {
        Some(s) if from_wire(s).is_none() => {
            p.push(path, format!("\"{s}\" is not one of {}", vocabulary()));
        }
        Some(_) => {}
        None => string(v, path, p),
    }
}

fn vocab_list<T>(
    v: &Value,
    path: &str,
    from_wire: fn(&str) -> Option<T>,
    vocabulary: fn() -> String,
    p: &mut Problems,
) {
    if let Some(items) = array(v, path, p) {
        for (i, item) in items.iter().enumerate() {
            vocab(item, &format!("{path}[{i}]"), from_wire, vocabulary, p);
        }
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
