use anyhow::Context;
use serde::Deserialize;

/// Settings for the text-generation backend.
#[derive(Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub json_mode: bool,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .field("json_mode", &self.json_mode)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Without it the fridge inventory lives in memory for the life of the process.
    pub database_url: Option<String>,
    pub llm: LlmConfig,
    pub food_db_base_url: String,
    pub fridge_slot: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        let llm = LlmConfig {
            api_key: lookup("OPENAI_API_KEY").context("OPENAI_API_KEY is not set")?,
            model: lookup("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            api_base: lookup("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".into()),
            timeout_secs: lookup("OPENAI_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60),
            json_mode: lookup("OPENAI_JSON_MODE")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        };
        Ok(Self {
            database_url,
            llm,
            food_db_base_url: lookup("FOOD_DB_BASE_URL")
                .unwrap_or_else(|| "https://world.openfoodfacts.org".into()),
            fridge_slot: lookup("FRIDGE_SLOT").unwrap_or_else(|| "fridgeIngredients".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/mealgen"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/mealgen"));
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.llm.api_base, "https://api.openai.com/v1");
        assert_eq!(cfg.llm.timeout_secs, 60);
        assert!(cfg.llm.json_mode);
        assert_eq!(cfg.food_db_base_url, "https://world.openfoodfacts.org");
        assert_eq!(cfg.fridge_slot, "fridgeIngredients");
    }

    #[test]
    fn overrides_are_honored() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/mealgen"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-3.5-turbo"),
            ("OPENAI_TIMEOUT_SECS", "5"),
            ("OPENAI_JSON_MODE", "false"),
            ("FRIDGE_SLOT", "kitchen"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
        assert_eq!(cfg.llm.timeout_secs, 5);
        assert!(!cfg.llm.json_mode);
        assert_eq!(cfg.fridge_slot, "kitchen");
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret-value")]))
            .expect("config should load");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("sk-secret-value"), "{debug}");
        assert!(debug.contains("gpt-4o-mini"));
    }

    #[test]
    fn database_url_is_optional() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_URL", "  "),
        ]))
        .expect("config should load");
        assert_eq!(cfg.database_url, None);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/mealgen",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
