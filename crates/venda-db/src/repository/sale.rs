//! # Sale Repository
//!
//! Database operations for sales and their items.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  sales ──< sale_items (ON DELETE CASCADE)                           │
//! │                                                                     │
//! │  A sale exclusively owns its items:                                 │
//! │   * created together in one transaction (create_with_items)         │
//! │   * loaded together via SaleInclude::Items                          │
//! │   * removed together when the sale row is deleted                   │
//! │                                                                     │
//! │  The sale total is never stored; it is derived from the items.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{insert_sql, select_list, Entity, NoInclude, Repository, SqliteQuery};
use venda_core::filter::{Expr, FieldTable};
use venda_core::paging::{Page, PaginationParameters};
use venda_core::types::{ItemSale, ProductRevenue, Sale, SaleStatus, SalesAnalysisResult};

// =============================================================================
// Entity Bindings
// =============================================================================

/// Eager-load directives for sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleInclude {
    /// The sale's owned line items.
    Items,
}

#[async_trait]
impl Entity for Sale {
    const TABLE: &'static str = "sales";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "customer_id",
        "status",
        "sale_date",
        "payment_method",
        "observations",
        "created_at",
        "updated_at",
    ];
    type Include = SaleInclude;

    fn field_table() -> &'static FieldTable {
        Sale::fields()
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
            .bind(self.customer_id.as_str())
            .bind(self.status)
            .bind(self.sale_date)
            .bind(self.payment_method)
            .bind(self.observations.as_str())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.customer_id.as_str())
            .bind(self.status)
            .bind(self.sale_date)
            .bind(self.payment_method)
            .bind(self.observations.as_str())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    async fn load_related(
        pool: &SqlitePool,
        rows: &mut [Self],
        includes: &[Self::Include],
    ) -> DbResult<()> {
        if rows.is_empty() || !includes.contains(&SaleInclude::Items) {
            return Ok(());
        }

        let ids: Vec<String> = rows.iter().map(|sale| sale.id.clone()).collect();
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM sale_items WHERE sale_id IN ({}) ORDER BY created_at",
            select_list::<ItemSale>(),
            placeholders
        );

        let mut query = sqlx::query_as::<_, ItemSale>(&sql);
        for id in &ids {
            query = query.bind(id.as_str());
        }
        let items = query.fetch_all(pool).await?;

        let mut by_sale: HashMap<String, Vec<ItemSale>> = HashMap::new();
        for item in items {
            by_sale.entry(item.sale_id.clone()).or_default().push(item);
        }
        for sale in rows.iter_mut() {
            sale.items = by_sale.remove(&sale.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl Entity for ItemSale {
    const TABLE: &'static str = "sale_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "sale_id",
        "product_id",
        "quantity",
        "unit_price_cents",
        "created_at",
        "updated_at",
    ];
    type Include = NoInclude;

    fn field_table() -> &'static FieldTable {
        ItemSale::fields()
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
            .bind(self.sale_id.as_str())
            .bind(self.product_id.as_str())
            .bind(self.quantity)
            .bind(self.unit_price_cents)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.sale_id.as_str())
            .bind(self.product_id.as_str())
            .bind(self.quantity)
            .bind(self.unit_price_cents)
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

// =============================================================================
// Sale Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    repo: Repository<Sale>,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository {
            repo: Repository::new(pool),
        }
    }

    fn pool(&self) -> &SqlitePool {
        self.repo.pool()
    }

    /// The generic repository surface for this entity.
    pub fn base(&self) -> &Repository<Sale> {
        &self.repo
    }

    /// Persists a sale together with its items as one unit.
    ///
    /// Assigns ids and audit timestamps to the sale and every item, points
    /// the items at the sale, and inserts all rows in a single transaction:
    /// either the whole sale exists or none of it does.
    pub async fn create_with_items(&self, mut sale: Sale) -> DbResult<Sale> {
        if sale.id.is_empty() {
            sale.id = Uuid::new_v4().to_string();
        }
        let now = Utc::now();
        sale.created_at = now;
        sale.updated_at = now;
        for item in &mut sale.items {
            if item.id.is_empty() {
                item.id = Uuid::new_v4().to_string();
            }
            item.sale_id = sale.id.clone();
            item.created_at = now;
            item.updated_at = now;
        }

        debug!(id = %sale.id, items = sale.items.len(), "Inserting sale with items");

        let sale_sql = insert_sql::<Sale>();
        let item_sql = insert_sql::<ItemSale>();

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sale.bind_insert(sqlx::query(&sale_sql))
            .execute(&mut *tx)
            .await?;
        for item in &sale.items {
            item.bind_insert(sqlx::query(&item_sql))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(sale)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str, includes: &[SaleInclude]) -> DbResult<Option<Sale>> {
        self.repo.get_by_id(id, includes).await
    }

    /// Gets a sale by ID with its items loaded.
    pub async fn get_with_items(&self, id: &str) -> DbResult<Option<Sale>> {
        self.repo.get_by_id(id, &[SaleInclude::Items]).await
    }

    /// Paged, filterable sale listing.
    pub async fn get_paged(
        &self,
        params: &PaginationParameters,
        predicate: Option<&Expr>,
        includes: &[SaleInclude],
    ) -> DbResult<Page<Sale>> {
        self.repo.get_paged(params, predicate, includes).await
    }

    /// Removes a sale by ID; the cascade removes its items. Returns whether
    /// a row was deleted.
    pub async fn delete_by_id(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Updates the sale's narrative field only.
    pub async fn update_observations(&self, id: &str, observations: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET observations = ?, updated_at = ? WHERE id = ?")
            .bind(observations)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }
        Ok(())
    }

    /// Moves a sale from `from` to `to`, guarded against concurrent
    /// transitions: the update only applies while the row still holds
    /// `from`.
    pub async fn set_status(&self, id: &str, from: SaleStatus, to: SaleStatus) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE sales SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to)
                .bind(Utc::now())
                .bind(id)
                .bind(from)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("Sale ({from})"), id));
        }
        Ok(())
    }

    /// Aggregates sales over an inclusive calendar-date range.
    ///
    /// The end date extends through the end of that day: the window is
    /// `[start 00:00, start of the day after end)` in UTC. Range validation
    /// (start ≤ end) is the caller's precondition, enforced in the
    /// workflow.
    pub async fn sales_analysis(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<SalesAnalysisResult> {
        let start_at = start.and_time(NaiveTime::MIN).and_utc();
        let end_at = end
            .succ_opt()
            .ok_or_else(|| DbError::Internal("analysis end date out of range".to_string()))?
            .and_time(NaiveTime::MIN)
            .and_utc();

        debug!(%start_at, %end_at, "Running sales analysis");

        let total_sales_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE sale_date >= ? AND sale_date < ?")
                .bind(start_at)
                .bind(end_at)
                .fetch_one(self.pool())
                .await?;

        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT i.product_id, p.name, SUM(i.quantity * i.unit_price_cents) \
             FROM sale_items i \
             JOIN sales s ON s.id = i.sale_id \
             JOIN products p ON p.id = i.product_id \
             WHERE s.sale_date >= ? AND s.sale_date < ? \
             GROUP BY i.product_id, p.name",
        )
        .bind(start_at)
        .bind(end_at)
        .fetch_all(self.pool())
        .await?;

        let product_revenues: Vec<ProductRevenue> = rows
            .into_iter()
            .map(|(product_id, product_name, revenue_cents)| ProductRevenue {
                product_id,
                product_name,
                revenue_cents,
            })
            .collect();
        let total_revenue_cents = product_revenues.iter().map(|r| r.revenue_cents).sum();

        Ok(SalesAnalysisResult {
            total_sales_count,
            total_revenue_cents,
            product_revenues,
        })
    }
}
