use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::{Item, ItemCategory, ItemPatch},
    record_store::RecordStore,
};

/// Source of detected items. Detection and annotation workflows create and
/// edit items through this interface; the graph and sync code only read them.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn get(&self, item_id: &str) -> Result<Option<Item>>;

    async fn list(&self) -> Result<Vec<Item>>;

    async fn create(&self, category: ItemCategory, name: &str, fields: ItemPatch)
        -> Result<String>;

    /// Returns `false` when no item has `item_id`.
    async fn update(&self, item_id: &str, patch: ItemPatch) -> Result<bool>;
}

/// Catalog backed by the namespace's `items.jsonl`.
#[derive(Debug, Clone)]
pub struct StoreCatalog {
    items: RecordStore<Item>,
}

impl StoreCatalog {
    pub fn new(items: RecordStore<Item>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl ItemCatalog for StoreCatalog {
    async fn get(&self, item_id: &str) -> Result<Option<Item>> {
        let items = self.items.snapshot().await?;
        Ok(items.into_iter().find(|item| item.item_id == item_id))
    }

    async fn list(&self) -> Result<Vec<Item>> {
        Ok(self.items.snapshot().await?)
    }

    async fn create(
        &self,
        category: ItemCategory,
        name: &str,
        fields: ItemPatch,
    ) -> Result<String> {
        let item_id = Uuid::new_v4().to_string();
        let mut item = Item::new(item_id.clone(), category, name);
        fields.apply(&mut item);
        self.items.append(item).await?;
        Ok(item_id)
    }

    async fn update(&self, item_id: &str, patch: ItemPatch) -> Result<bool> {
        let item_id = item_id.to_string();
        let updated = self
            .items
            .mutate(move |items| match items.iter_mut().find(|i| i.item_id == item_id) {
                Some(item) => {
                    patch.apply(item);
                    true
                }
                None => false,
            })
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_update_roundtrips_through_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let catalog = StoreCatalog::new(RecordStore::open(dir.path().join("items.jsonl")));

        let id = catalog
            .create(ItemCategory::Panel, "Home", ItemPatch::default())
            .await
            .expect("create");
        let changed = catalog
            .update(
                &id,
                ItemPatch {
                    status: Some("reviewed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update");
        assert!(changed);

        let item = catalog.get(&id).await.expect("get").expect("present");
        assert_eq!(item.name, "Home");
        assert_eq!(item.status.as_deref(), Some("reviewed"));
        assert!(!catalog
            .update("missing", ItemPatch::default())
            .await
            .expect("update missing"));
    }
}
