//! # Validation Module
//!
//! Input validation for the back-office entities.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Calling surface (controllers, out of scope here)         │
//! │  ├── Shape validation (deserialization)                            │
//! │  └── Immediate caller feedback                                     │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE, field rules before any mutation             │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                        │
//! │  ├── NOT NULL / CHECK constraints                                  │
//! │  ├── UNIQUE constraints (email, cpf, code)                         │
//! │  └── Foreign key constraints                                       │
//! │                                                                     │
//! │  Defense in depth: different layers catch different errors         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{Customer, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Product Rules
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens, underscores only
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a full product before persisting.
pub fn validate_product(product: &Product) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_product_code(&product.code)?;

    if product.price_cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price_cents".to_string(),
        });
    }

    if product.quantity_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity_stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Customer Rules
// =============================================================================

/// Validates an email address.
///
/// A light structural check (local@domain with a dot in the domain); full
/// RFC compliance is not the goal, catching obvious typos is.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "expected local@domain".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a CPF tax id.
///
/// ## Rules
/// - Required
/// - Exactly 11 digits after stripping `.` and `-` punctuation
///
/// Check-digit verification is left to the identity collaborator; the
/// back office only needs a stable, unique key shape.
pub fn validate_cpf(cpf: &str) -> ValidationResult<()> {
    let cpf = cpf.trim();

    if cpf.is_empty() {
        return Err(ValidationError::Required {
            field: "cpf".to_string(),
        });
    }

    let digits: String = cpf.chars().filter(|c| *c != '.' && *c != '-').collect();
    if digits.len() != 11 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "cpf".to_string(),
            reason: "expected 11 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a full customer before persisting.
pub fn validate_customer(customer: &Customer) -> ValidationResult<()> {
    if customer.name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    validate_email(&customer.email)?;
    validate_cpf(&customer.cpf)?;

    Ok(())
}

// =============================================================================
// Sale Rules
// =============================================================================

/// Validates a requested item quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
