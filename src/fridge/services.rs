use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::repo::InventoryRepository;
use super::repo_types::FridgeItem;
use crate::meals::prompt::MealRequest;
use crate::products::dto::Product;

/// A fridge generation needs at least this many selected ingredients.
pub const MIN_FRIDGE_SELECTION: usize = 3;

#[derive(Debug, Error)]
pub enum FridgeError {
    #[error("ingredient name is empty")]
    EmptyName,
    #[error("\"{0}\" is already in the fridge")]
    Duplicate(String),
    #[error("no ingredient {0} in the fridge")]
    NotFound(String),
    #[error("select at least {MIN_FRIDGE_SELECTION} ingredients, {0} selected")]
    NotEnoughSelected(usize),
    #[error("could not save the fridge: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Inventory plus the current selection, in the order items were picked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fridge {
    items: Vec<FridgeItem>,
    selected: Vec<String>,
}

impl Fridge {
    pub fn new(items: Vec<FridgeItem>) -> Self {
        Self {
            items,
            selected: Vec::new(),
        }
    }

    pub fn items(&self) -> &[FridgeItem] {
        &self.items
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.iter().any(|s| s == name)
    }

    pub fn ready(&self) -> bool {
        self.selected.len() >= MIN_FRIDGE_SELECTION
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.name.eq_ignore_ascii_case(name))
    }

    fn push(&mut self, item: FridgeItem) -> Result<(), FridgeError> {
        if item.name.is_empty() {
            return Err(FridgeError::EmptyName);
        }
        if self.position(&item.name).is_some() {
            return Err(FridgeError::Duplicate(item.name));
        }
        self.items.push(item);
        Ok(())
    }

    pub fn add_manual(&mut self, name: &str) -> Result<(), FridgeError> {
        self.push(FridgeItem::manual(name.trim()))
    }

    pub fn add_product(&mut self, product: &Product) -> Result<(), FridgeError> {
        self.push(FridgeItem {
            name: product.display_name().to_string(),
            nutrition: Some(product.nutriments.clone()),
        })
    }

    /// Removes the item at `index` and drops it from the selection.
    pub fn remove(&mut self, index: usize) -> Result<FridgeItem, FridgeError> {
        if index >= self.items.len() {
            return Err(FridgeError::NotFound(format!("at position {index}")));
        }
        let item = self.items.remove(index);
        self.selected.retain(|s| s != &item.name);
        Ok(item)
    }

    pub fn toggle(&mut self, name: &str) -> Result<bool, FridgeError> {
        let idx = self
            .position(name.trim())
            .ok_or_else(|| FridgeError::NotFound(format!("\"{}\"", name.trim())))?;
        let name = self.items[idx].name.clone();
        if self.is_selected(&name) {
            self.selected.retain(|s| s != &name);
            Ok(false)
        } else {
            self.selected.push(name);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        for item in &self.items {
            if !self.selected.contains(&item.name) {
                self.selected.push(item.name.clone());
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Selected items as prompt entries, with energy content when known.
    pub fn selection_entries(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter_map(|name| self.items.iter().find(|i| &i.name == name))
            .map(|item| match item.energy_kcal_per_100g() {
                Some(kcal) => format!("{} ({} kcal per 100 g)", item.name, kcal),
                None => item.name.clone(),
            })
            .collect()
    }

    pub fn meal_request(&self) -> Result<MealRequest, FridgeError> {
        if !self.ready() {
            return Err(FridgeError::NotEnoughSelected(self.selected.len()));
        }
        Ok(MealRequest {
            selection: self.selection_entries(),
            ..Default::default()
        })
    }
}

/// Shared fridge state backed by an inventory repository.
///
/// Mutations run against a copy; the copy replaces the live state only after
/// the inventory was saved, so a failed save changes nothing.
pub struct FridgeService {
    repo: Arc<dyn InventoryRepository>,
    state: RwLock<Fridge>,
}

impl FridgeService {
    pub async fn load(repo: Arc<dyn InventoryRepository>) -> anyhow::Result<Self> {
        let items = repo.load().await?;
        info!(count = items.len(), "fridge inventory loaded");
        Ok(Self {
            repo,
            state: RwLock::new(Fridge::new(items)),
        })
    }

    pub async fn snapshot(&self) -> Fridge {
        self.state.read().await.clone()
    }

    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Fridge) -> Result<T, FridgeError>,
    ) -> Result<(T, Fridge), FridgeError> {
        let mut live = self.state.write().await;
        let mut next = live.clone();
        let out = op(&mut next)?;
        if next.items != live.items {
            self.repo.save(&next.items).await?;
            debug!(count = next.items.len(), "fridge inventory saved");
        }
        *live = next.clone();
        Ok((out, next))
    }

    pub async fn add_manual(&self, name: &str) -> Result<Fridge, FridgeError> {
        Ok(self.mutate(|f| f.add_manual(name)).await?.1)
    }

    pub async fn add_product(&self, product: &Product) -> Result<Fridge, FridgeError> {
        Ok(self.mutate(|f| f.add_product(product)).await?.1)
    }

    pub async fn remove(&self, index: usize) -> Result<Fridge, FridgeError> {
        Ok(self.mutate(|f| f.remove(index)).await?.1)
    }

    pub async fn toggle(&self, name: &str) -> Result<Fridge, FridgeError> {
        Ok(self.mutate(|f| f.toggle(name)).await?.1)
    }

    pub async fn select_all(&self) -> Fridge {
        let mut live = self.state.write().await;
        live.select_all();
        live.clone()
    }

    pub async fn clear_selection(&self) -> Fridge {
        let mut live = self.state.write().await;
        live.clear_selection();
        live.clone()
    }

    pub async fn meal_request(&self) -> Result<MealRequest, FridgeError> {
        self.state.read().await.meal_request()
    }
}
