use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, instrument};

use super::dto::Product;
use crate::fridge::repo_types::{NutrimentValue, Nutrition};

#[async_trait]
pub trait ProductSearch: Send + Sync {
    async fn search(&self, term: &str) -> anyhow::Result<Vec<Product>>;
}

/// Free-text search against the Open Food Facts v1 endpoint.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    endpoint: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("mealgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build food database http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/cgi/search.pl", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ProductSearch for OpenFoodFactsClient {
    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> anyhow::Result<Vec<Product>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("search_terms", term),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
            ])
            .send()
            .await
            .context("food database request")?;

        let status = resp.status();
        if !status.is_success() {
            error!(%status, "product search failed");
            return Err(anyhow!("Search request failed with {}", status.as_u16()));
        }

        let body: Value = resp.json().await.context("decode product search")?;
        let products = parse_search_response(&body);
        debug!(count = products.len(), "product search finished");
        Ok(products)
    }
}

/// Maps the raw search document; entries without a code or name are dropped.
pub fn parse_search_response(body: &Value) -> Vec<Product> {
    let Some(raw) = body.get("products").and_then(Value::as_array) else {
        return Vec::new();
    };
    raw.iter()
        .filter_map(|p| {
            let code = match p.get("code") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let product = Product {
                code,
                product_name: text(p, "product_name"),
                nutrition_grades: text(p, "nutrition_grades"),
                nutriments: nutriments(p.get("nutriments")),
            };
            (!product.display_name().is_empty()).then_some(product)
        })
        .collect()
}

fn text(p: &Value, field: &str) -> String {
    p.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn nutriments(raw: Option<&Value>) -> Nutrition {
    let Some(Value::Object(map)) = raw else {
        return Nutrition::new();
    };
    map.iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Value::Number(n) => NutrimentValue::Number(n.as_f64()?),
                Value::String(s) => NutrimentValue::Text(s.clone()),
                _ => return None,
            };
            Some((k.clone(), value))
        })
        .collect()
}
