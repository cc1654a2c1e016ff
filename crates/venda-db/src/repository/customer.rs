//! # Customer Repository
//!
//! Database operations for customers. Email and CPF are unique keys; the
//! UNIQUE constraints surface as [`DbError::UniqueViolation`] conflicts via
//! the shared sqlx error mapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DbError, DbResult};
use crate::repository::{Entity, NoInclude, Repository, SqliteQuery};
use venda_core::filter::{Expr, FieldTable};
use venda_core::paging::{Page, PaginationParameters};
use venda_core::types::Customer;

// =============================================================================
// Entity Binding
// =============================================================================

#[async_trait]
impl Entity for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "cpf",
        "phone",
        "address",
        "user_id",
        "created_at",
        "updated_at",
    ];
    type Include = NoInclude;

    fn field_table() -> &'static FieldTable {
        Customer::fields()
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
            .bind(self.email.as_str())
            .bind(self.cpf.as_str())
            .bind(self.phone.as_str())
            .bind(self.address.as_str())
            .bind(self.user_id.as_deref())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn bind_update<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.name.as_str())
            .bind(self.email.as_str())
            .bind(self.cpf.as_str())
            .bind(self.phone.as_str())
            .bind(self.address.as_str())
            .bind(self.user_id.as_deref())
            .bind(self.created_at)
            .bind(self.updated_at)
    }
}

// =============================================================================
// Customer Repository
// =============================================================================

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    repo: Repository<Customer>,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository {
            repo: Repository::new(pool),
        }
    }

    /// The generic repository surface for this entity.
    pub fn base(&self) -> &Repository<Customer> {
        &self.repo
    }

    /// Persists a new customer.
    ///
    /// A duplicate email or CPF surfaces as a unique-violation conflict.
    pub async fn create(&self, customer: Customer) -> DbResult<Customer> {
        self.repo.create(customer).await
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        self.repo.get_by_id(id, &[]).await
    }

    /// Gets a customer by email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<Customer>> {
        let predicate: Expr = Customer::fields().eq("email", email)?;
        self.repo.get(&predicate, &[]).await
    }

    /// Gets a customer by CPF.
    pub async fn get_by_cpf(&self, cpf: &str) -> DbResult<Option<Customer>> {
        let predicate: Expr = Customer::fields().eq("cpf", cpf)?;
        self.repo.get(&predicate, &[]).await
    }

    /// Paged, filterable customer listing.
    pub async fn get_paged(
        &self,
        params: &PaginationParameters,
        predicate: Option<&Expr>,
    ) -> DbResult<Page<Customer>> {
        self.repo.get_paged(params, predicate, &[]).await
    }

    /// Loads the existing customer, replaces its mutable fields with the
    /// given values, and persists. Reports not-found when `id` is absent.
    pub async fn update_by_id(&self, id: &str, changes: Customer) -> DbResult<Customer> {
        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        let mut updated = Customer {
            id: existing.id,
            created_at: existing.created_at,
            ..changes
        };
        self.repo.update(&mut updated).await?;
        Ok(updated)
    }

    /// Removes a customer by ID. Returns whether a row was deleted.
    pub async fn delete_by_id(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(self.repo.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
