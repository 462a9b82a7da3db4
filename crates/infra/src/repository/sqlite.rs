//! SQLite-backed product table.
//!
//! One table, keyed by an `AUTOINCREMENT` id so that SQLite itself guarantees
//! ids are never reused, even after the highest row is deleted. Field
//! constraints are repeated as `CHECK`s so no writer can bypass them.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

use stockroom_core::{ProductId, StoreError, StoreResult};
use stockroom_products::{Product, ProductDraft, ProductFilter, ProductPatch, ProductQuery, Target};

use super::{Page, ProductRepository};

const COLUMNS: &str = "id, name, quantity, price, image";

/// SQLite-backed product repository.
#[derive(Debug, Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    /// Open (creating if needed) the database at `database_url` and ensure the
    /// table exists.
    ///
    /// # Example URLs
    /// - `sqlite://stockroom.db?mode=rwc`
    /// - `sqlite::memory:`
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::storage)?
            .create_if_missing(true);

        // Every connection to `:memory:` is a separate database; keep exactly one
        // open for the lifetime of the pool.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(StoreError::storage)?;

        let repo = Self::from_pool(pool).await?;
        info!(database_url, "product table ready");
        Ok(repo)
    }

    /// Private in-memory database (for tests).
    pub async fn in_memory() -> StoreResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Reuse an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                name     TEXT    NOT NULL CHECK (length(trim(name)) > 0),
                quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                price    INTEGER NOT NULL DEFAULT 0 CHECK (price >= 0),
                image    TEXT    NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_check_violation() {
            return StoreError::invalid_field("row", db.message().to_string());
        }
    }
    StoreError::storage(err)
}

fn row_to_product(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::from_raw(row.try_get("id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        image_reference: row.try_get("image")?,
    })
}

/// `%` and `_` in user text must match literally.
fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(ids) = &filter.ids {
        if ids.is_empty() {
            qb.push(" AND 0 = 1");
        } else {
            qb.push(" AND id IN (");
            let mut list = qb.separated(", ");
            for id in ids {
                list.push_bind(id.get());
            }
            list.push_unseparated(")");
        }
    }
    if let Some(fragment) = &filter.name_contains {
        qb.push(" AND name LIKE ")
            .push_bind(like_pattern(fragment))
            .push(" ESCAPE '\\'");
    }
    if let Some(min) = filter.min_quantity {
        qb.push(" AND quantity >= ").push_bind(min);
    }
    if let Some(max) = filter.max_quantity {
        qb.push(" AND quantity <= ").push_bind(max);
    }
    match filter.in_stock {
        Some(true) => {
            qb.push(" AND quantity > 0");
        }
        Some(false) => {
            qb.push(" AND quantity = 0");
        }
        None => {}
    }
}

fn push_target(qb: &mut QueryBuilder<'_, Sqlite>, target: &Target) {
    match target {
        Target::Item(id) => {
            qb.push(" WHERE id = ").push_bind(id.get());
        }
        Target::Collection(filter) => push_filter(qb, filter),
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn insert(&self, draft: &ProductDraft) -> StoreResult<ProductId> {
        let result = sqlx::query(
            r#"
            INSERT INTO products (name, quantity, price, image)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(draft.name())
        .bind(draft.quantity())
        .bind(draft.price())
        .bind(draft.image_reference())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(ProductId::from_raw(result.last_insert_rowid()))
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM products WHERE id = ?1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref()
            .map(row_to_product)
            .transpose()
            .map_err(storage_error)
    }

    async fn list(&self, query: &ProductQuery, page: Option<Page>) -> StoreResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM products"));
        push_filter(&mut qb, &query.filter);

        let order = query.order;
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            order.key.column(),
            order.direction.keyword()
        ));

        if let Some(page) = page {
            qb.push(" LIMIT ")
                .push_bind(page.limit as i64)
                .push(" OFFSET ")
                .push_bind(page.offset as i64);
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        debug!(rows = rows.len(), "listed products");
        rows.iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage_error)
    }

    async fn count(&self, filter: &ProductFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS n FROM products");
        push_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await.map_err(storage_error)?;
        let n: i64 = row.try_get("n").map_err(storage_error)?;
        Ok(n as u64)
    }

    async fn update(&self, target: &Target, patch: &ProductPatch) -> StoreResult<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = &patch.name {
                set.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(quantity) = patch.quantity {
                set.push("quantity = ").push_bind_unseparated(quantity);
            }
            if let Some(price) = patch.price {
                set.push("price = ").push_bind_unseparated(price);
            }
            if let Some(image) = &patch.image_reference {
                set.push("image = ").push_bind_unseparated(image.clone());
            }
        }
        push_target(&mut qb, target);

        let result = qb.build().execute(&self.pool).await.map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, target: &Target) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM products");
        push_target(&mut qb, target);

        let result = qb.build().execute(&self.pool).await.map_err(storage_error)?;
        Ok(result.rows_affected())
    }
}
