//! # Sale Workflow
//!
//! Orchestrates sale creation, cancellation, status transitions and the
//! revenue analysis entry point over the repositories.
//!
//! ## Sale Creation Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       create_sale()                                 │
//! │                                                                     │
//! │  1. VALIDATE EAGERLY (no mutation yet)                              │
//! │     ├── items list non-empty                                        │
//! │     ├── customer exists                                             │
//! │     └── per line: product exists, quantity > 0, quantity ≤ stock    │
//! │                                                                     │
//! │  2. BUILD                                                           │
//! │     └── Sale { status: Pending, sale_date: now } with one item per  │
//! │         line, unit price snapshotted from the product               │
//! │                                                                     │
//! │  3. PERSIST (one transaction: sale + items)                         │
//! │                                                                     │
//! │  4. DECREMENT STOCK, one product at a time, after the sale is       │
//! │     durable. Each decrement is a single conditional UPDATE with a   │
//! │     stock-floor guard, so a concurrent race is reported as an       │
//! │     insufficient-stock conflict instead of driving stock negative.  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Known Consistency Gap
//! Step 4 runs one commit per product with no transaction spanning the
//! whole sequence. A failure partway (process crash, conflict on a later
//! line) leaves the sale persisted with stock only partially decremented.
//! There is deliberately no automatic rollback; the error surfaces to the
//! caller and the surviving `sale_items` rows are the reconciliation
//! record. Cancellation restores stock *before* deleting the sale row for
//! the same reason: if it is interrupted, the quantities still to restore
//! have not been lost.

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::DbError;
use crate::pool::Database;
use crate::repository::product::StockAdjustment;
use venda_core::error::{CoreError, ValidationError};
use venda_core::types::{ItemSale, PaymentMethod, Sale, SaleStatus, SalesAnalysisResult};
use venda_core::validation::validate_quantity;

// =============================================================================
// Requests & Errors
// =============================================================================

/// One requested line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
}

/// A request to create a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub customer_id: String,
    pub items: Vec<NewSaleItem>,
    pub payment_method: PaymentMethod,
    pub observations: String,
}

/// Errors surfaced by the sale workflow.
///
/// Domain failures (validation, not-found, conflict) and store failures
/// stay distinguishable so the calling surface can map them onto different
/// outcomes.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for WorkflowError {
    fn from(err: ValidationError) -> Self {
        WorkflowError::Domain(CoreError::Validation(err))
    }
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

// =============================================================================
// Sale Workflow
// =============================================================================

/// Orchestrates multi-step sale operations over the repositories.
///
/// Stateless besides the database handle; safe to construct per call.
#[derive(Debug, Clone)]
pub struct SaleWorkflow {
    db: Database,
}

impl SaleWorkflow {
    /// Creates a workflow bound to a database.
    pub fn new(db: Database) -> Self {
        SaleWorkflow { db }
    }

    /// Creates a sale: validates every line, persists the sale with its
    /// items, then decrements stock per product.
    ///
    /// All domain checks run before any mutation, so a rejected request
    /// never partially mutates state. See the module docs for the
    /// post-persist decrement semantics.
    pub async fn create_sale(&self, request: NewSale) -> WorkflowResult<Sale> {
        if request.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        self.db
            .customers()
            .get_by_id(&request.customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(request.customer_id.clone()))?;

        let products = self.db.products();

        // Eager validation pass: every line checked before anything is
        // written. Products are captured here so the price snapshot is
        // taken at validation time.
        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            validate_quantity(line.quantity).map_err(CoreError::from)?;

            let product = products
                .get_by_id(&line.product_id, &[])
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            if line.quantity > product.quantity_stock {
                return Err(CoreError::InsufficientStock {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    available: product.quantity_stock,
                    requested: line.quantity,
                }
                .into());
            }
            lines.push((line.quantity, product));
        }

        let now = Utc::now();
        let sale = Sale {
            id: String::new(), // assigned on persist
            customer_id: request.customer_id.clone(),
            status: SaleStatus::Pending,
            sale_date: now,
            payment_method: request.payment_method,
            observations: request.observations,
            created_at: now,
            updated_at: now,
            items: lines
                .iter()
                .map(|(quantity, product)| ItemSale {
                    id: String::new(),
                    sale_id: String::new(),
                    product_id: product.id.clone(),
                    quantity: *quantity,
                    // Snapshot: fixed now, never recalculated from the
                    // product's future price.
                    unit_price_cents: product.price_cents,
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
        };

        let sale = self.db.sales().create_with_items(sale).await?;
        info!(
            sale_id = %sale.id,
            customer_id = %sale.customer_id,
            items = sale.items.len(),
            total_cents = sale.total_cents(),
            "Sale created"
        );

        // Sequential decrements, one commit per product, after the sale is
        // durable. A refused decrement means a concurrent sale won the
        // race since validation; report the conflict.
        for (quantity, product) in &lines {
            match products.decrement_stock(&product.id, *quantity).await? {
                StockAdjustment::Applied => {}
                StockAdjustment::Insufficient { available } => {
                    warn!(
                        sale_id = %sale.id,
                        product_id = %product.id,
                        available,
                        requested = quantity,
                        "Stock decrement refused after sale was persisted"
                    );
                    return Err(CoreError::InsufficientStock {
                        product_id: product.id.clone(),
                        product_name: product.name.clone(),
                        available,
                        requested: *quantity,
                    }
                    .into());
                }
                StockAdjustment::Missing => {
                    return Err(CoreError::ProductNotFound(product.id.clone()).into());
                }
            }
        }

        Ok(sale)
    }

    /// Cancels a sale: restores each item's quantity to its product's
    /// stock, then deletes the sale (the cascade removes the items).
    ///
    /// Only `Pending` and `Approved` sales can be cancelled; a shipped
    /// sale is refused with an invalid-transition error.
    pub async fn cancel_sale(&self, sale_id: &str) -> WorkflowResult<()> {
        let sale = self
            .db
            .sales()
            .get_with_items(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if !sale.status.is_cancellable() {
            return Err(CoreError::InvalidStatusTransition {
                sale_id: sale_id.to_string(),
                current_status: sale.status.to_string(),
                requested_status: SaleStatus::Cancelled.to_string(),
            }
            .into());
        }

        // Restore stock while the item rows still exist: if this loop is
        // interrupted, the remaining quantities are still recoverable from
        // the surviving sale_items. Deleting first would lose them.
        let products = self.db.products();
        for item in &sale.items {
            products
                .restore_stock(&item.product_id, item.quantity)
                .await?;
        }

        let deleted = self.db.sales().delete_by_id(sale_id).await?;
        if !deleted {
            // The sale vanished between the load and the delete; stock has
            // already been restored, so just record the anomaly.
            warn!(sale_id = %sale_id, "Sale disappeared during cancellation");
        }

        info!(sale_id = %sale_id, items = sale.items.len(), "Sale cancelled");
        Ok(())
    }

    /// Revises the sale's narrative field. Status, items and customer are
    /// not alterable through this operation.
    pub async fn update_observations(
        &self,
        sale_id: &str,
        observations: &str,
    ) -> WorkflowResult<Sale> {
        let mut sale = self
            .db
            .sales()
            .get_with_items(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        self.db
            .sales()
            .update_observations(sale_id, observations)
            .await?;

        sale.observations = observations.to_string();
        Ok(sale)
    }

    /// Advances a sale one step along
    /// `Pending → Approved → Sent → Delivered`.
    ///
    /// Cancellation is not reachable from here: it must go through
    /// [`cancel_sale`](Self::cancel_sale) so stock is restored.
    pub async fn advance_status(&self, sale_id: &str, to: SaleStatus) -> WorkflowResult<Sale> {
        if to == SaleStatus::Cancelled {
            return Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: "cancellation goes through cancel_sale so stock is restored".to_string(),
            }
            .into());
        }

        let mut sale = self
            .db
            .sales()
            .get_with_items(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if !sale.status.can_transition(to) {
            return Err(CoreError::InvalidStatusTransition {
                sale_id: sale_id.to_string(),
                current_status: sale.status.to_string(),
                requested_status: to.to_string(),
            }
            .into());
        }

        self.db.sales().set_status(sale_id, sale.status, to).await?;
        info!(sale_id = %sale_id, from = %sale.status, to = %to, "Sale status advanced");

        sale.status = to;
        Ok(sale)
    }

    /// Computes sale count, total revenue and the per-product breakdown
    /// over an inclusive date range.
    ///
    /// An inverted range is the caller's error and is rejected, never
    /// silently corrected.
    pub async fn sales_analysis(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> WorkflowResult<SalesAnalysisResult> {
        if start > end {
            return Err(CoreError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into());
        }

        Ok(self.db.sales().sales_analysis(start, end).await?)
    }
}
