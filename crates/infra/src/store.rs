//! The product store: validated CRUD over a repository, serialized writes,
//! change notifications.
//!
//! ```text
//! call
//!   ↓
//! 1. Validate input (nothing is written if this fails)
//!   ↓
//! 2. Take the write lock (record lock for one id, bulk lock for a filter)
//!   ↓
//! 3. Write through the repository
//!   ↓
//! 4. Publish `ProductsChanged` if any row was affected
//! ```
//!
//! Publishing happens after the repository returned, so a subscriber that
//! re-reads on notification always sees the write. A failed publish is logged
//! and never turns a successful write into an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stockroom_core::{ProductId, StoreError, StoreResult};
use stockroom_events::{ChangeKind, EventBus, InMemoryEventBus, ProductsChanged, Subscription};
use stockroom_products::{
    NewProduct, Product, ProductFilter, ProductPatch, ProductQuery, SaleOutcome, Target, restocked,
};

use crate::cursor::ProductCursor;
use crate::locks::RecordLocks;
use crate::repository::ProductRepository;

/// Default number of rows a [`ProductCursor`] pulls per batch.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Product store over repository `R`, publishing on bus `B`.
pub struct ProductStore<R, B = Arc<InMemoryEventBus<ProductsChanged>>> {
    repo: R,
    bus: B,
    locks: RecordLocks,
    page_size: u64,
}

impl<R> ProductStore<R>
where
    R: ProductRepository,
{
    /// Store with its own in-memory notification bus.
    pub fn new(repo: R) -> Self {
        Self::with_bus(repo, Arc::new(InMemoryEventBus::new()))
    }
}

impl<R, B> ProductStore<R, B>
where
    R: ProductRepository,
    B: EventBus<ProductsChanged>,
{
    pub fn with_bus(repo: R, bus: B) -> Self {
        Self {
            repo,
            bus,
            locks: RecordLocks::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Subscribe to change notifications published from now on.
    pub fn subscribe(&self) -> Subscription<ProductsChanged> {
        self.bus.subscribe()
    }

    /// Insert a new product and return its store-assigned id.
    pub async fn create(&self, candidate: &NewProduct) -> StoreResult<ProductId> {
        let draft = candidate.validate()?;

        let id = {
            let _guard = self.locks.shared().await;
            self.repo.insert(&draft).await?
        };

        info!(product_id = %id, name = draft.name(), "product created");
        self.notify(ChangeKind::Created, Some(id), 1);
        Ok(id)
    }

    pub async fn read(&self, id: ProductId) -> StoreResult<Product> {
        debug!(product_id = %id, "reading product");
        self.repo.get(id).await?.ok_or(StoreError::NotFound)
    }

    /// Every matching product, materialized.
    pub async fn list(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
        self.repo.list(query, None).await
    }

    /// Lazy, restartable listing that pulls one page at a time.
    pub fn cursor(&self, query: ProductQuery) -> ProductCursor<'_, R> {
        ProductCursor::new(&self.repo, query, self.page_size)
    }

    pub async fn count(&self, filter: &ProductFilter) -> StoreResult<u64> {
        self.repo.count(filter).await
    }

    /// Write the present fields of `patch` to the target. Returns rows affected.
    ///
    /// An empty patch is a no-op: storage is not touched and nothing is published.
    pub async fn update(&self, target: impl Into<Target>, patch: &ProductPatch) -> StoreResult<u64> {
        let target = target.into();
        patch.validate()?;
        if patch.is_empty() {
            return Ok(0);
        }

        let rows = match &target {
            Target::Item(id) => {
                let _guard = self.locks.record(*id).await;
                self.repo.update(&target, patch).await?
            }
            Target::Collection(_) => {
                let _guard = self.locks.bulk().await;
                self.repo.update(&target, patch).await?
            }
        };

        if rows > 0 {
            info!(scope = ?target, rows, "products updated");
            self.notify(ChangeKind::Updated, target.item_id(), rows);
        }
        Ok(rows)
    }

    /// Delete the target. A missing id deletes nothing and is not an error.
    pub async fn delete(&self, target: impl Into<Target>) -> StoreResult<u64> {
        let target = target.into();

        let rows = match &target {
            Target::Item(id) => {
                let _guard = self.locks.record(*id).await;
                self.repo.delete(&target).await?
            }
            Target::Collection(_) => {
                let _guard = self.locks.bulk().await;
                self.repo.delete(&target).await?
            }
        };

        if rows > 0 {
            info!(scope = ?target, rows, "products deleted");
            self.notify(ChangeKind::Deleted, target.item_id(), rows);
        }
        Ok(rows)
    }

    /// Sell one unit. Read and write happen inside one critical section for
    /// the record, so concurrent sales never lose a decrement or go negative.
    pub async fn decrement_quantity(&self, id: ProductId) -> StoreResult<SaleOutcome> {
        let outcome = {
            let _guard = self.locks.record(id).await;

            let current = self.repo.get(id).await?.ok_or(StoreError::NotFound)?;
            let outcome = SaleOutcome::sell_one(current.quantity);
            let rows = self
                .repo
                .update(&Target::Item(id), &ProductPatch::quantity(outcome.quantity))
                .await?;
            if rows == 0 {
                return Err(StoreError::NotFound);
            }
            outcome
        };

        if outcome.floored {
            warn!(product_id = %id, "sale on out-of-stock product; quantity held at zero");
        } else {
            debug!(product_id = %id, quantity = outcome.quantity, "sold one unit");
        }
        self.notify(ChangeKind::Updated, Some(id), 1);
        Ok(outcome)
    }

    /// Receive `amount` units. Returns the new quantity.
    pub async fn restock(&self, id: ProductId, amount: i64) -> StoreResult<i64> {
        let quantity = {
            let _guard = self.locks.record(id).await;

            let current = self.repo.get(id).await?.ok_or(StoreError::NotFound)?;
            let quantity = restocked(current.quantity, amount)?;
            let rows = self
                .repo
                .update(&Target::Item(id), &ProductPatch::quantity(quantity))
                .await?;
            if rows == 0 {
                return Err(StoreError::NotFound);
            }
            quantity
        };

        info!(product_id = %id, amount, quantity, "product restocked");
        self.notify(ChangeKind::Updated, Some(id), 1);
        Ok(quantity)
    }

    fn notify(&self, kind: ChangeKind, product_id: Option<ProductId>, rows: u64) {
        if let Err(err) = self.bus.publish(ProductsChanged::new(kind, product_id, rows)) {
            warn!(error = ?err, "failed to publish product change notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryProductRepository, SqliteProductRepository};

    fn store() -> ProductStore<InMemoryProductRepository> {
        ProductStore::new(InMemoryProductRepository::new())
    }

    fn mugs() -> NewProduct {
        NewProduct::named("Mugs").with_quantity(17).with_price(8)
    }

    #[tokio::test]
    async fn mugs_lifecycle() {
        let store = store();

        let id = store.create(&mugs()).await.unwrap();
        assert_eq!(id, ProductId::from_raw(1));

        let stored = store.read(id).await.unwrap();
        assert_eq!(
            stored,
            Product {
                id,
                name: "Mugs".to_string(),
                quantity: 17,
                price: 8,
                image_reference: None,
            }
        );

        let sale = store.decrement_quantity(id).await.unwrap();
        assert_eq!(sale, SaleOutcome { quantity: 16, floored: false });
        assert_eq!(store.read(id).await.unwrap().quantity, 16);

        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.read(id).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn create_rejects_empty_name_without_writing() {
        let store = store();
        let err = store.create(&NewProduct::named("")).await.unwrap_err();
        assert_eq!(err.field(), Some("name"));
        assert_eq!(store.count(&ProductFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_rejects_negative_quantity() {
        let store = store();
        let err = store
            .create(&NewProduct::named("Mugs").with_quantity(-1))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
    }

    #[tokio::test]
    async fn negative_price_update_leaves_record_unchanged() {
        let store = store();
        let id = store.create(&mugs()).await.unwrap();

        let err = store.update(id, &ProductPatch::price(-5)).await.unwrap_err();
        assert_eq!(err.field(), Some("price"));
        assert_eq!(store.read(id).await.unwrap().price, 8);
    }

    #[tokio::test]
    async fn negative_quantity_update_is_rejected() {
        let store = store();
        let id = store.create(&mugs()).await.unwrap();

        let err = store.update(id, &ProductPatch::quantity(-1)).await.unwrap_err();
        assert_eq!(err.field(), Some("quantity"));
        assert_eq!(store.read(id).await.unwrap().quantity, 17);
    }

    #[tokio::test]
    async fn empty_update_is_a_silent_noop() {
        let store = store();
        let id = store.create(&mugs()).await.unwrap();
        let before = store.read(id).await.unwrap();
        let sub = store.subscribe();

        assert_eq!(store.update(id, &ProductPatch::default()).await.unwrap(), 0);

        assert_eq!(store.read(id).await.unwrap(), before);
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_missing_id_is_zero_rows_and_silent() {
        let store = store();
        let sub = store.subscribe();

        assert_eq!(store.delete(ProductId::from_raw(404)).await.unwrap(), 0);
        assert!(sub.drain().is_empty());
    }

    #[tokio::test]
    async fn read_and_sale_on_missing_id_are_not_found() {
        let store = store();
        let missing = ProductId::from_raw(7);
        assert_eq!(store.read(missing).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(store.decrement_quantity(missing).await.unwrap_err(), StoreError::NotFound);
        assert_eq!(store.restock(missing, 1).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn sale_at_zero_floors_and_still_writes() {
        let store = store();
        let id = store.create(&NewProduct::named("Plates")).await.unwrap();
        let sub = store.subscribe();

        let sale = store.decrement_quantity(id).await.unwrap();
        assert_eq!(sale, SaleOutcome { quantity: 0, floored: true });
        assert_eq!(store.read(id).await.unwrap().quantity, 0);
        assert_eq!(sub.drain().len(), 1);
    }

    #[tokio::test]
    async fn restock_adds_units() {
        let store = store();
        let id = store.create(&mugs()).await.unwrap();
        assert_eq!(store.restock(id, 3).await.unwrap(), 20);
        assert_eq!(store.restock(id, 0).await.unwrap_err().field(), Some("amount"));
        assert_eq!(store.read(id).await.unwrap().quantity, 20);
    }

    #[tokio::test]
    async fn notifications_follow_each_mutation() {
        let store = store();
        let sub = store.subscribe();

        let id = store.create(&mugs()).await.unwrap();
        store.update(id, &ProductPatch::name("Big mugs")).await.unwrap();
        store.delete(id).await.unwrap();

        let kinds: Vec<ChangeKind> = sub.drain().into_iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Deleted]);
    }

    #[tokio::test]
    async fn bulk_writes_report_row_counts() {
        let store = store();
        store.create(&NewProduct::named("A")).await.unwrap();
        store.create(&NewProduct::named("B").with_quantity(2)).await.unwrap();
        store.create(&NewProduct::named("C")).await.unwrap();
        let sub = store.subscribe();

        let rows = store
            .update(ProductFilter::out_of_stock(), &ProductPatch::price(3))
            .await
            .unwrap();
        assert_eq!(rows, 2);

        assert_eq!(store.delete(Target::all()).await.unwrap(), 3);

        let changes = sub.drain();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].product_id, None);
        assert_eq!(changes[1].rows, 3);
    }

    #[tokio::test]
    async fn writes_to_missing_ids_leave_no_lock_slots_behind() {
        let store = store();
        let id = store.create(&mugs()).await.unwrap();

        for raw in 1_000..2_000 {
            let missing = ProductId::from_raw(raw);
            assert_eq!(store.update(missing, &ProductPatch::price(1)).await.unwrap(), 0);
            assert_eq!(store.decrement_quantity(missing).await.unwrap_err(), StoreError::NotFound);
        }
        store.decrement_quantity(id).await.unwrap();
        store.restock(id, 2).await.unwrap();

        assert_eq!(store.locks.tracked(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_never_go_negative() {
        let store = Arc::new(store());
        let id = store.create(&NewProduct::named("Last one").with_quantity(1)).await.unwrap();

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.decrement_quantity(id).await.unwrap() }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.decrement_quantity(id).await.unwrap() }
        });
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!([a.floored, b.floored].iter().filter(|f| **f).count(), 1);
        assert_eq!(a.quantity, 0);
        assert_eq!(b.quantity, 0);
        assert_eq!(store.read(id).await.unwrap().quantity, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_lose_no_decrements() {
        let store = Arc::new(ProductStore::new(SqliteProductRepository::in_memory().await.unwrap()));
        let id = store.create(&NewProduct::named("Mugs").with_quantity(50)).await.unwrap();

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.decrement_quantity(id).await.unwrap() })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.read(id).await.unwrap().quantity, 30);
    }

    #[tokio::test]
    async fn sqlite_backend_matches_the_scenario() {
        let store = ProductStore::new(SqliteProductRepository::in_memory().await.unwrap());

        let id = store.create(&mugs()).await.unwrap();
        assert_eq!(store.read(id).await.unwrap().quantity, 17);
        assert_eq!(store.decrement_quantity(id).await.unwrap().quantity, 16);
        assert!(store.update(id, &ProductPatch::price(-5)).await.is_err());
        assert_eq!(store.read(id).await.unwrap().price, 8);
        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.read(id).await.unwrap_err(), StoreError::NotFound);
    }
}
