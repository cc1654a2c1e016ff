//! # Error Types
//!
//! Domain-specific error types for venda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  venda-core errors (this file)                                     │
//! │  ├── CoreError        - Domain rule violations                     │
//! │  └── ValidationError  - Input validation failures                  │
//! │                                                                     │
//! │  venda-db errors (separate crate)                                  │
//! │  ├── DbError          - Database operation failures                │
//! │  └── WorkflowError    - CoreError or DbError from the workflow     │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → WorkflowError → caller        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, shortfall, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps cleanly onto a caller-facing outcome:
//!    validation → bad request, not-found → 404, conflict → 409

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations or domain logic failures and
/// should be translated to user-facing outcomes by the calling surface.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// A referenced customer does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A referenced sale does not exist.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Requested quantity exceeds the product's available stock.
    ///
    /// Carries the offending product and the numbers needed to report the
    /// shortfall (`requested - available`).
    #[error("Insufficient stock for {product_name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        product_name: String,
        available: i64,
        requested: i64,
    },

    /// The sale is not in a status that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot transition to {requested_status}")]
    InvalidStatusTransition {
        sale_id: String,
        current_status: String,
        requested_status: String,
    },

    /// Analysis was requested with an inverted date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: String, end: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shortfall for an insufficient-stock error, zero for everything else.
    pub fn shortfall(&self) -> i64 {
        match self {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => (requested - available).max(0),
            _ => 0,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for early
/// validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., malformed email or CPF).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate email or CPF).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
