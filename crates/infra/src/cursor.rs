//! Lazy, restartable listing.

use stockroom_core::StoreResult;
use stockroom_products::{Product, ProductQuery};

use crate::repository::{Page, ProductRepository};

/// Pulls a listing from the repository one page at a time.
///
/// Nothing is read until [`next_batch`](Self::next_batch) is called.
/// [`rewind`](Self::rewind) starts over from the first row; absent mutations in
/// between, the same rows come back in the same order.
pub struct ProductCursor<'a, R: ?Sized> {
    repo: &'a R,
    query: ProductQuery,
    start: Page,
    page: Page,
    exhausted: bool,
}

impl<'a, R> ProductCursor<'a, R>
where
    R: ProductRepository + ?Sized,
{
    pub fn new(repo: &'a R, query: ProductQuery, page_size: u64) -> Self {
        let start = Page::first(page_size.max(1));
        Self {
            repo,
            query,
            start,
            page: start,
            exhausted: false,
        }
    }

    /// Next page of rows, or `None` once the listing is exhausted.
    pub async fn next_batch(&mut self) -> StoreResult<Option<Vec<Product>>> {
        if self.exhausted {
            return Ok(None);
        }

        let rows = self.repo.list(&self.query, Some(self.page)).await?;
        if (rows.len() as u64) < self.page.limit {
            self.exhausted = true;
        }
        self.page = self.page.next();

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows))
        }
    }

    /// Restart from the first row.
    pub fn rewind(&mut self) {
        self.page = self.start;
        self.exhausted = false;
    }

    /// Drain the remaining pages into one vector.
    pub async fn collect_remaining(&mut self) -> StoreResult<Vec<Product>> {
        let mut out = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            out.extend(batch);
        }
        Ok(out)
    }
}
