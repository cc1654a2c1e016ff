//! # Repository Module
//!
//! Generic and concrete repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 One Generic Core, One Instance Per Entity           │
//! │                                                                     │
//! │  Caller                                                             │
//! │    │  db.products().get_paged(params, None, &[])                    │
//! │    ▼                                                                │
//! │  ProductRepository / CustomerRepository / SaleRepository            │
//! │    │  domain lookups, guarded updates, stock movements              │
//! │    ▼                                                                │
//! │  Repository<E: Entity>          ← create / get / get_paged /        │
//! │    │                              update / delete                   │
//! │    ▼                                                                │
//! │  query::fetch_page + compiled predicates → SQLite                   │
//! │                                                                     │
//! │  Every operation commits independently; there is no caller-visible  │
//! │  batching across repository calls. Multi-step flows compensate      │
//! │  explicitly (see `workflow`).                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Closed-World Dynamic Access
//! The only dynamic-by-name field access in the crate goes through the
//! per-entity [`FieldTable`] allow-lists; the `Entity` trait is a plain
//! parametric interface with a static column list, no reflection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite, SqlitePool};
use std::marker::PhantomData;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::query::{self, bind_literal, compile_expr};
use venda_core::filter::{Expr, FieldTable};
use venda_core::paging::{Page, PaginationParameters};

pub mod customer;
pub mod product;
pub mod sale;

/// Shorthand for a runtime SQLite query being assembled.
pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

// =============================================================================
// Entity Trait
// =============================================================================

/// Eager-load directive type for entities with nothing to eager-load.
///
/// Uninhabited, so a `&[NoInclude]` can only ever be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoInclude {}

/// A persisted record with a stable identifier and audit timestamps.
///
/// Implemented once per entity type; the implementation is the closed-world
/// binding between the domain struct and its table: table name, column list,
/// dynamic-query allow-list, and parameter binders.
#[async_trait]
pub trait Entity:
    Clone + Send + Sync + Unpin + for<'r> FromRow<'r, SqliteRow> + 'static
{
    /// Backing table name.
    const TABLE: &'static str;

    /// Column list in binder order. `id` must be first.
    const COLUMNS: &'static [&'static str];

    /// Eager-load directives this entity supports.
    type Include: Send + Sync + Copy + 'static;

    /// The dynamic-query allow-list for this entity.
    fn field_table() -> &'static FieldTable;

    /// Identifier. Empty string means "not yet persisted".
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
    fn set_created_at(&mut self, at: DateTime<Utc>);
    fn set_updated_at(&mut self, at: DateTime<Utc>);

    /// Binds every column in [`Self::COLUMNS`] order.
    fn bind_insert<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Binds every column except `id`, in [`Self::COLUMNS`] order.
    /// The caller appends the `id` bind for the `WHERE` clause.
    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Loads related records for `rows` according to `includes`.
    ///
    /// Called after the page (or single row) is fetched, so related data is
    /// loaded for exactly the rows being returned.
    async fn load_related(
        _pool: &SqlitePool,
        _rows: &mut [Self],
        _includes: &[Self::Include],
    ) -> DbResult<()> {
        Ok(())
    }
}

/// `SELECT` column list for an entity.
pub(crate) fn select_list<E: Entity>() -> String {
    E::COLUMNS.join(", ")
}

/// `INSERT INTO <table> (<columns>) VALUES (?, …)` for an entity.
pub(crate) fn insert_sql<E: Entity>() -> String {
    let placeholders = vec!["?"; E::COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders
    )
}

/// `UPDATE <table> SET <non-id columns> WHERE id = ?` for an entity.
pub(crate) fn update_sql<E: Entity>() -> String {
    let assignments = E::COLUMNS[1..]
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {} SET {} WHERE id = ?", E::TABLE, assignments)
}

// =============================================================================
// Generic Repository
// =============================================================================

/// Per-entity-type CRUD plus the paged/filtered read operation.
///
/// One instantiation per entity, exposed through [`crate::Database`]
/// accessors. Each operation commits independently.
#[derive(Debug, Clone)]
pub struct Repository<E: Entity> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Repository<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Repository {
            pool,
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persists a new entity and returns the stored value.
    ///
    /// Assigns a fresh UUID when the entity has none, stamps both audit
    /// timestamps, and commits immediately.
    pub async fn create(&self, mut entity: E) -> DbResult<E> {
        if entity.id().is_empty() {
            entity.set_id(Uuid::new_v4().to_string());
        }
        let now = Utc::now();
        entity.set_created_at(now);
        entity.set_updated_at(now);

        debug!(table = E::TABLE, id = entity.id(), "Inserting row");

        let sql = insert_sql::<E>();
        entity
            .bind_insert(sqlx::query(&sql))
            .execute(&self.pool)
            .await?;

        Ok(entity)
    }

    /// Returns the first entity matching `predicate`, with `includes`
    /// loaded.
    ///
    /// No ordering guarantee beyond the store default; callers that need
    /// determinism go through [`get_paged`](Self::get_paged) with an order
    /// expression.
    pub async fn get(&self, predicate: &Expr, includes: &[E::Include]) -> DbResult<Option<E>> {
        let fragment = compile_expr(predicate);
        let sql = format!(
            "SELECT {} FROM {} WHERE {} LIMIT 1",
            select_list::<E>(),
            E::TABLE,
            fragment.sql
        );

        let mut query = sqlx::query_as::<_, E>(&sql);
        for literal in &fragment.binds {
            query = bind_literal(query, literal);
        }

        let row = query.fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let mut rows = [row];
                E::load_related(&self.pool, &mut rows, includes).await?;
                let [row] = rows;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Convenience lookup by identifier.
    pub async fn get_by_id(&self, id: &str, includes: &[E::Include]) -> DbResult<Option<E>> {
        let predicate = E::field_table().eq("id", id)?;
        self.get(&predicate, includes).await
    }

    /// Returns one page of entities per the pagination parameters, with the
    /// optional structural predicate and dynamic filter/order applied.
    pub async fn get_paged(
        &self,
        params: &PaginationParameters,
        predicate: Option<&Expr>,
        includes: &[E::Include],
    ) -> DbResult<Page<E>> {
        query::fetch_page::<E>(&self.pool, params, predicate, includes).await
    }

    /// Replaces the persisted column values with the entity's values and
    /// refreshes the modification timestamp.
    ///
    /// A blind write: updating a never-persisted entity affects zero rows
    /// and is *not* an error here. Concrete repositories expose
    /// `update_by_id`-style operations that load first and report not-found.
    pub async fn update(&self, entity: &mut E) -> DbResult<()> {
        entity.set_updated_at(Utc::now());

        let sql = update_sql::<E>();
        let result = entity
            .bind_update(sqlx::query(&sql))
            .bind(entity.id())
            .execute(&self.pool)
            .await?;

        debug!(
            table = E::TABLE,
            id = entity.id(),
            rows = result.rows_affected(),
            "Updated row"
        );
        Ok(())
    }

    /// Removes the entity's record. Removing an already-absent record is a
    /// no-op.
    pub async fn delete(&self, entity: &E) -> DbResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(entity.id())
            .execute(&self.pool)
            .await?;

        debug!(
            table = E::TABLE,
            id = entity.id(),
            rows = result.rows_affected(),
            "Deleted row"
        );
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use venda_core::types::{Customer, ItemSale, Product, Sale};

    #[test]
    fn test_sql_builders() {
        assert_eq!(
            insert_sql::<ItemSale>(),
            "INSERT INTO sale_items (id, sale_id, product_id, quantity, unit_price_cents, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        );
        assert_eq!(
            update_sql::<ItemSale>(),
            "UPDATE sale_items SET sale_id = ?, product_id = ?, quantity = ?, \
             unit_price_cents = ?, created_at = ?, updated_at = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_columns_match_field_tables() {
        // Every column except the include-only collections must be
        // resolvable for ordering; id must lead for the update builder.
        fn check<E: Entity>() {
            assert_eq!(E::COLUMNS[0], "id");
            for column in E::COLUMNS {
                // user_id is persisted but deliberately not filterable.
                if *column == "user_id" {
                    continue;
                }
                assert!(
                    E::field_table().resolve(column).is_some(),
                    "column {column} missing from {} allow-list",
                    E::field_table().entity()
                );
            }
        }
        check::<Product>();
        check::<Customer>();
        check::<Sale>();
        check::<ItemSale>();
    }
}
