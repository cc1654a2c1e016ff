//! # Product Repository
//!
//! Database operations for products, including the stock movements the sale
//! workflow depends on.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Conditional Stock Decrement                         │
//! │                                                                     │
//! │  ❌ WRONG: read-then-write                                          │
//! │     stock = SELECT quantity_stock …   (both writers read 5)         │
//! │     UPDATE products SET quantity_stock = 0                          │
//! │     (second writer silently drives stock negative)                  │
//! │                                                                     │
//! │  ✅ CORRECT: single conditional update with a floor check           │
//! │     UPDATE products                                                 │
//! │     SET quantity_stock = quantity_stock - ?                         │
//! │     WHERE id = ? AND quantity_stock >= ?                            │
//! │                                                                     │
//! │  Zero rows affected = conflict to report, never silent corruption.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{select_list, Entity, Repository, SqliteQuery};
use venda_core::filter::{Expr, FieldTable};
use venda_core::paging::{Page, PaginationParameters};
use venda_core::types::{ItemSale, Product};

// =============================================================================
// Entity Binding
// =============================================================================

/// Eager-load directives for products.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductInclude {
    /// Reverse lookup: sale items referencing the product.
    ItemSales,
}

#[async_trait]
impl Entity for Product {
    const TABLE: &'static str = "products";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "description",
        "price_cents",
        "quantity_stock",
        "code",
        "active",
        "created_at",
        "updated_at",
    ];
    type Include = ProductInclude;

    fn field_table() -> &'static FieldTable {
        Product::fields()
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = at;
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    fn bind_insert<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.description.as_str())
            .bind(self.price_cents)
            .bind(self.quantity_stock)
            .bind(self.code.as_str())
            .bind(self.active)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.name.as_str())
            .bind(self.description.as_str())
            .bind(self.price_cents)
            .bind(self.quantity_stock)
            .bind(self.code.as_str())
            .bind(self.active)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    async fn load_related(
        pool: &SqlitePool,
        rows: &mut [Self],
        includes: &[Self::Include],
    ) -> DbResult<()> {
        if rows.is_empty() || !includes.contains(&ProductInclude::ItemSales) {
            return Ok(());
        }

        let ids: Vec<String> = rows.iter().map(|product| product.id.clone()).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM sale_items WHERE product_id IN ({}) ORDER BY created_at",
            select_list::<ItemSale>(),
            placeholders
        );

        let mut query = sqlx::query_as::<_, ItemSale>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let items = query.fetch_all(pool).await?;

        let mut by_product: HashMap<String, Vec<ItemSale>> = HashMap::new();
        for item in items {
            by_product
                .entry(item.product_id.clone())
                .or_default()
                .push(item);
        }
        for product in rows.iter_mut() {
            product.item_sales = by_product.remove(&product.id).unwrap_or_default();
        }
        Ok(())
    }
}

// =============================================================================
// Outcome of a conditional stock movement
// =============================================================================

/// Result of a conditional stock decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    /// The decrement was applied.
    Applied,
    /// The floor check refused the decrement; `available` is the stock
    /// observed afterwards, for the conflict report.
    Insufficient { available: i64 },
    /// The product row no longer exists.
    Missing,
}

// =============================================================================
// Product Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let page = repo.get_paged(&params, None, &[]).await?;
/// let product = repo.get_by_code("CAB-HDMI").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    repo: Repository<Product>,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository {
            repo: Repository::new(pool),
        }
    }

    fn pool(&self) -> &SqlitePool {
        self.repo.pool()
    }

    /// The generic repository surface for this entity.
    pub fn base(&self) -> &Repository<Product> {
        &self.repo
    }

    /// Persists a new product.
    pub async fn create(&self, product: Product) -> DbResult<Product> {
        self.repo.create(product).await
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(
        &self,
        id: &str,
        includes: &[ProductInclude],
    ) -> DbResult<Option<Product>> {
        self.repo.get_by_id(id, includes).await
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let predicate: Expr = Product::fields().eq("code", code)?;
        self.repo.get(&predicate, &[]).await
    }

    /// Paged, filterable product listing.
    pub async fn get_paged(
        &self,
        params: &PaginationParameters,
        predicate: Option<&Expr>,
        includes: &[ProductInclude],
    ) -> DbResult<Page<Product>> {
        self.repo.get_paged(params, predicate, includes).await
    }

    /// Loads the existing product, replaces its mutable fields with the
    /// given values, and persists.
    ///
    /// Unlike the generic blind [`Repository::update`], this reports
    /// not-found when `id` does not exist.
    pub async fn update_by_id(&self, id: &str, changes: Product) -> DbResult<Product> {
        let existing = self
            .get_by_id(id, &[])
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let mut updated = Product {
            id: existing.id,
            created_at: existing.created_at,
            item_sales: Vec::new(),
            ..changes
        };
        self.repo.update(&mut updated).await?;
        Ok(updated)
    }

    /// Removes a product by ID. Returns whether a row was deleted.
    pub async fn delete_by_id(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attempts to decrement stock by `quantity`, guarded by the stock
    /// floor. A refused decrement reports the observed stock instead of
    /// mutating anything.
    pub async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<StockAdjustment> {
        debug!(id = %id, quantity = %quantity, "Decrementing stock");

        let result = sqlx::query(
            "UPDATE products SET quantity_stock = quantity_stock - ?, updated_at = ? \
             WHERE id = ? AND quantity_stock >= ?",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .bind(quantity)
        .execute(self.pool())
        .await?;

        if result.rows_affected() > 0 {
            return Ok(StockAdjustment::Applied);
        }
        match self.get_by_id(id, &[]).await? {
            Some(product) => Ok(StockAdjustment::Insufficient {
                available: product.quantity_stock,
            }),
            None => Ok(StockAdjustment::Missing),
        }
    }

    /// Restores (increments) stock by `quantity`, e.g. when a sale is
    /// cancelled.
    pub async fn restore_stock(&self, id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Restoring stock");

        let result = sqlx::query(
            "UPDATE products SET quantity_stock = quantity_stock + ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Counts products (for diagnostics and seeding).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
