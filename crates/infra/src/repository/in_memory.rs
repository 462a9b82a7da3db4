use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockroom_core::{ProductId, StoreError, StoreResult};
use stockroom_products::{Product, ProductDraft, ProductFilter, ProductPatch, ProductQuery, Target};

use super::{Page, ProductRepository};

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<ProductId, Product>,
    last_id: i64,
}

impl Table {
    fn targeted_ids(&self, target: &Target) -> Vec<ProductId> {
        match target {
            Target::Item(id) => self.rows.contains_key(id).then_some(*id).into_iter().collect(),
            Target::Collection(filter) => self
                .rows
                .values()
                .filter(|p| filter.matches(p))
                .map(|p| p.id)
                .collect(),
        }
    }
}

/// In-memory product table for tests/dev.
///
/// Ids come from a counter that only moves forward, so deleted ids are never
/// handed out again while the instance lives.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    table: RwLock<Table>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::storage("in-memory product table lock poisoned")
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, draft: &ProductDraft) -> StoreResult<ProductId> {
        let mut table = self.table.write().map_err(|_| Self::poisoned())?;

        table.last_id += 1;
        let id = ProductId::from_raw(table.last_id);
        let product = Product::from_draft(id, draft.clone());
        table.rows.insert(id, product);

        Ok(id)
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let table = self.table.read().map_err(|_| Self::poisoned())?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn list(&self, query: &ProductQuery, page: Option<Page>) -> StoreResult<Vec<Product>> {
        let table = self.table.read().map_err(|_| Self::poisoned())?;
        let rows = query.run(table.rows.values());

        Ok(match page {
            None => rows,
            Some(page) => rows
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
        })
    }

    async fn count(&self, filter: &ProductFilter) -> StoreResult<u64> {
        let table = self.table.read().map_err(|_| Self::poisoned())?;
        Ok(table.rows.values().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn update(&self, target: &Target, patch: &ProductPatch) -> StoreResult<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut table = self.table.write().map_err(|_| Self::poisoned())?;
        let ids = table.targeted_ids(target);

        for id in &ids {
            if let Some(row) = table.rows.get_mut(id) {
                patch.apply_to(row);
            }
        }

        Ok(ids.len() as u64)
    }

    async fn delete(&self, target: &Target) -> StoreResult<u64> {
        let mut table = self.table.write().map_err(|_| Self::poisoned())?;
        let ids = table.targeted_ids(target);

        for id in &ids {
            table.rows.remove(id);
        }

        Ok(ids.len() as u64)
    }
}
