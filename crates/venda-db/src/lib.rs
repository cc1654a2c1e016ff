//! # venda-db: Database Layer for Venda
//!
//! SQLite data access and the sale workflow for the Venda back office.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Venda Data Flow                               │
//! │                                                                     │
//! │  HTTP controllers (external collaborators)                          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                    venda-db (THIS CRATE)                      │ │
//! │  │                                                               │ │
//! │  │  ┌────────────┐  ┌──────────────┐  ┌────────────────────┐    │ │
//! │  │  │  Database  │  │ Repositories │  │   SaleWorkflow     │    │ │
//! │  │  │ (pool.rs)  │  │ generic +    │  │ create / cancel /  │    │ │
//! │  │  │            │◄─│ per-entity   │◄─│ status / analysis  │    │ │
//! │  │  └────────────┘  └──────┬───────┘  └────────────────────┘    │ │
//! │  │                         │                                     │ │
//! │  │                  ┌──────▼───────┐                             │ │
//! │  │                  │   query.rs   │  predicate → SQL,           │ │
//! │  │                  │              │  paged execution            │ │
//! │  │                  └──────────────┘                             │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite (WAL mode, embedded migrations)                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`query`] - Predicate compilation and paged query execution
//! - [`repository`] - Generic `Repository<E>` plus per-entity repositories
//! - [`workflow`] - Sale creation/cancellation and sales analysis
//!
//! ## Usage
//!
//! ```rust,ignore
//! use venda_db::{Database, DbConfig, NewSale, NewSaleItem};
//!
//! let db = Database::new(DbConfig::new("path/to/venda.db")).await?;
//!
//! // Paged, filtered listing
//! let params = PaginationParameters::new(1, 20)
//!     .with_filter("active = true and price_cents <= 5000")
//!     .with_order_by("name asc");
//! let page = db.products().get_paged(&params, None, &[]).await?;
//!
//! // Sale workflow
//! let sale = db.sale_workflow().create_sale(NewSale { /* … */ }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod repository;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::product::{ProductInclude, ProductRepository, StockAdjustment};
pub use repository::sale::{SaleInclude, SaleRepository};
pub use repository::{Entity, NoInclude, Repository};

// Workflow re-exports
pub use workflow::{NewSale, NewSaleItem, SaleWorkflow, WorkflowError, WorkflowResult};
