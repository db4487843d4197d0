use std::sync::Arc;

use anyhow::Context;

use crate::config::AppConfig;
use crate::fridge::repo::{
    InventoryRepository, MemoryInventoryRepository, PgInventoryRepository,
};
use crate::fridge::services::FridgeService;
use crate::llm::{OpenAiClient, TextGenerator};
use crate::meals::services::GenerationLedger;
use crate::products::services::{OpenFoodFactsClient, ProductSearch};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub generator: Arc<dyn TextGenerator>,
    pub products: Arc<dyn ProductSearch>,
    pub fridge: Arc<FridgeService>,
    pub ledger: Arc<GenerationLedger>,
}

/// Postgres when a database is configured, otherwise a process-local slot.
async fn inventory_repo(config: &AppConfig) -> anyhow::Result<Arc<dyn InventoryRepository>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL is not set; fridge inventory will not survive a restart");
        return Ok(Arc::new(MemoryInventoryRepository::new()) as Arc<dyn InventoryRepository>);
    };

    let db = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("connect to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let repo = PgInventoryRepository::new(db, config.fridge_slot.clone());
    Ok(Arc::new(repo) as Arc<dyn InventoryRepository>)
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo = inventory_repo(&config).await?;
        let fridge = Arc::new(FridgeService::load(repo).await?);

        let generator = Arc::new(OpenAiClient::new(&config.llm)?) as Arc<dyn TextGenerator>;
        let products =
            Arc::new(OpenFoodFactsClient::new(&config.food_db_base_url)?) as Arc<dyn ProductSearch>;

        tracing::info!(model = %config.llm.model, slot = %config.fridge_slot, "state ready");
        Ok(Self {
            config,
            generator,
            products,
            fridge,
            ledger: Arc::new(GenerationLedger::new()),
        })
    }

    /// In-memory state around the given generator, for router tests.
    #[cfg(test)]
    pub async fn fake_with(generator: Arc<dyn TextGenerator>) -> Self {
        use crate::products::services::tests::{whole_milk, FixedProducts};

        let config = Arc::new(
            AppConfig::from_lookup(|key| match key {
                "OPENAI_API_KEY" => Some("test".into()),
                _ => None,
            })
            .expect("fake config"),
        );
        let repo = inventory_repo(&config).await.expect("memory inventory");
        let fridge = Arc::new(FridgeService::load(repo).await.expect("memory fridge"));

        Self {
            config,
            generator,
            products: Arc::new(FixedProducts(vec![whole_milk()])),
            fridge,
            ledger: Arc::new(GenerationLedger::new()),
        }
    }
}
