use anyhow::Context;
use axum::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

use super::repo_types::FridgeItem;

/// Storage for the fridge inventory snapshot. Last write wins.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn load(&self) -> anyhow::Result<Vec<FridgeItem>>;
    async fn save(&self, items: &[FridgeItem]) -> anyhow::Result<()>;
}

/// A slot that does not hold a list of items is ignored, not fatal.
fn decode_slot(slot: &str, payload: Value) -> Vec<FridgeItem> {
    match serde_json::from_value::<Vec<FridgeItem>>(payload) {
        Ok(items) => items,
        Err(e) => {
            warn!(slot, error = %e, "stored fridge inventory is malformed; starting empty");
            Vec::new()
        }
    }
}

/// Keeps the inventory as a JSONB document in one named row of `inventory_slots`.
#[derive(Clone)]
pub struct PgInventoryRepository {
    db: PgPool,
    slot: String,
}

impl PgInventoryRepository {
    pub fn new(db: PgPool, slot: impl Into<String>) -> Self {
        Self {
            db,
            slot: slot.into(),
        }
    }
}

#[async_trait]
impl InventoryRepository for PgInventoryRepository {
    async fn load(&self) -> anyhow::Result<Vec<FridgeItem>> {
        let row: Option<(Value,)> = sqlx::query_as(
            r#"
            SELECT payload
            FROM inventory_slots
            WHERE name = $1
            "#,
        )
        .bind(&self.slot)
        .fetch_optional(&self.db)
        .await
        .context("load inventory slot")?;

        Ok(row
            .map(|(payload,)| decode_slot(&self.slot, payload))
            .unwrap_or_default())
    }

    async fn save(&self, items: &[FridgeItem]) -> anyhow::Result<()> {
        let payload = serde_json::to_value(items).context("serialize inventory")?;
        sqlx::query(
            r#"
            INSERT INTO inventory_slots (name, payload, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (name)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = now()
            "#,
        )
        .bind(&self.slot)
        .bind(payload)
        .execute(&self.db)
        .await
        .context("save inventory slot")?;
        Ok(())
    }
}

/// Process-local slot holding the serialized inventory.
#[derive(Default)]
pub struct MemoryInventoryRepository {
    slot: RwLock<Option<Value>>,
}

impl MemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_payload(payload: Value) -> Self {
        Self {
            slot: RwLock::new(Some(payload)),
        }
    }

    #[cfg(test)]
    pub async fn payload(&self) -> Option<Value> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl InventoryRepository for MemoryInventoryRepository {
    async fn load(&self) -> anyhow::Result<Vec<FridgeItem>> {
        Ok(self
            .slot
            .read()
            .await
            .clone()
            .map(|payload| decode_slot("memory", payload))
            .unwrap_or_default())
    }

    async fn save(&self, items: &[FridgeItem]) -> anyhow::Result<()> {
        let payload = serde_json::to_value(items).context("serialize inventory")?;
        *self.slot.write().await = Some(payload);
        Ok(())
    }
}
