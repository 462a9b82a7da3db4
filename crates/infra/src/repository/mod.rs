//! Storage boundary for product records.
//!
//! A repository is a dumb table: it persists what it is given and answers
//! queries. Validation, write serialization and change notification live one
//! layer up in [`crate::store::ProductStore`].

pub mod in_memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use stockroom_core::{ProductId, StoreResult};
use stockroom_products::{Product, ProductDraft, ProductFilter, ProductPatch, ProductQuery, Target};

pub use in_memory::InMemoryProductRepository;
pub use sqlite::SqliteProductRepository;

/// A window into an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }
}

/// Persistent table of products keyed by id.
///
/// Implementations must:
/// - assign ids that are never reused for the lifetime of the backing storage
/// - leave the table untouched when a call fails
/// - return the exact number of rows affected by `update` / `delete`
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert(&self, draft: &ProductDraft) -> StoreResult<ProductId>;

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Filtered, ordered rows; all of them when `page` is `None`.
    async fn list(&self, query: &ProductQuery, page: Option<Page>) -> StoreResult<Vec<Product>>;

    async fn count(&self, filter: &ProductFilter) -> StoreResult<u64>;

    /// Write the present fields of `patch` to every targeted row.
    async fn update(&self, target: &Target, patch: &ProductPatch) -> StoreResult<u64>;

    async fn delete(&self, target: &Target) -> StoreResult<u64>;
}

#[async_trait]
impl<R> ProductRepository for Arc<R>
where
    R: ProductRepository + ?Sized,
{
    async fn insert(&self, draft: &ProductDraft) -> StoreResult<ProductId> {
        (**self).insert(draft).await
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        (**self).get(id).await
    }

    async fn list(&self, query: &ProductQuery, page: Option<Page>) -> StoreResult<Vec<Product>> {
        (**self).list(query, page).await
    }

    async fn count(&self, filter: &ProductFilter) -> StoreResult<u64> {
        (**self).count(filter).await
    }

    async fn update(&self, target: &Target, patch: &ProductPatch) -> StoreResult<u64> {
        (**self).update(target, patch).await
    }

    async fn delete(&self, target: &Target) -> StoreResult<u64> {
        (**self).delete(target).await
    }
}
