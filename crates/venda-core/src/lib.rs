//! # venda-core: Pure Business Logic for Venda
//!
//! This crate is the **heart** of the Venda back office. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Venda Architecture                            │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │              HTTP Controllers (external)                      │ │
//! │  │    list / get / create / update / delete / sell / analyse     │ │
//! │  └─────────────────────────────┬─────────────────────────────────┘ │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐ │
//! │  │               ★ venda-core (THIS CRATE) ★                     │ │
//! │  │                                                               │ │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────┐ │ │
//! │  │  │  types  │ │  money  │ │ paging  │ │ filter  │ │validate│ │ │
//! │  │  │ Product │ │  Money  │ │ Page<T> │ │  Expr   │ │ rules  │ │ │
//! │  │  │  Sale   │ │  cents  │ │metadata │ │ parser  │ │ checks │ │ │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └────────┘ │ │
//! │  │                                                               │ │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS          │ │
//! │  └─────────────────────────────┬─────────────────────────────────┘ │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐ │
//! │  │                  venda-db (Database Layer)                    │ │
//! │  │       SQLite repositories, sale workflow, analysis            │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Customer, Sale, ItemSale, enums)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`paging`] - Pagination parameters, pages, page metadata
//! - [`filter`] - Allow-listed filter/order expression parsing
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are cents (i64), never floats
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Closed World**: Dynamic field access only through per-entity
//!    allow-list tables, never reflection or code evaluation

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod filter;
pub mod money;
pub mod paging;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, ValidationError};
pub use filter::{FieldKind, FieldTable, FilterError};
pub use money::Money;
pub use paging::{Page, PaginationMetadata, PaginationParameters};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum page size a caller can request.
///
/// Requests above this are clamped, not rejected, so a greedy client still
/// gets a valid (bounded) page.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Page size used when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
