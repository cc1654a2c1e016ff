//! # Domain Types
//!
//! Core domain types used throughout Venda.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │    Product    │   │   Customer    │   │     Sale      │         │
//! │  │ ───────────── │   │ ───────────── │   │ ───────────── │         │
//! │  │ id (UUID)     │   │ id (UUID)     │   │ id (UUID)     │         │
//! │  │ code (unique) │   │ email (uniq)  │   │ customer_id   │         │
//! │  │ price_cents   │   │ cpf (unique)  │   │ status        │         │
//! │  │ quantity_stock│   │ user_id (ext) │   │ items (owned) │         │
//! │  └───────────────┘   └───────────────┘   └───────┬───────┘         │
//! │                                                  │ owns            │
//! │                                          ┌───────▼───────┐         │
//! │                                          │   ItemSale    │         │
//! │                                          │ ───────────── │         │
//! │                                          │ sale_id (FK)  │         │
//! │                                          │ product_id(FK)│         │
//! │                                          │ unit_price    │         │
//! │                                          │   (snapshot)  │         │
//! │                                          └───────────────┘         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Foreign Keys, Not Back-Pointers
//! Relations are unidirectional id fields (`ItemSale::sale_id`,
//! `ItemSale::product_id`, `Sale::customer_id`). The owning side holds the
//! id; reverse lookups go through explicit repository calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::{FieldDef, FieldKind, FieldTable};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional long-form description.
    pub description: String,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Units currently in stock. Never negative after a committed operation.
    pub quantity_stock: i64,

    /// Business code identifying the product (unique).
    pub code: String,

    /// Whether the product is active (soft delete).
    pub active: bool,

    /// When the product was created. Set by the repository.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated. Set by the repository.
    pub updated_at: DateTime<Utc>,

    /// Reverse lookup of sale items referencing this product, populated via
    /// the item-sales include. Not ownership: items belong to their sale.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub item_sales: Vec<ItemSale>,
}

/// Allow-listed fields for dynamic filter/order expressions on products.
static PRODUCT_FIELDS: FieldTable = FieldTable::new(
    "Product",
    &[
        FieldDef::new("id", "id", FieldKind::Text),
        FieldDef::new("name", "name", FieldKind::Text),
        FieldDef::new("description", "description", FieldKind::Text),
        FieldDef::new("price_cents", "price_cents", FieldKind::Integer),
        FieldDef::new("quantity_stock", "quantity_stock", FieldKind::Integer),
        FieldDef::new("code", "code", FieldKind::Text),
        FieldDef::new("active", "active", FieldKind::Boolean),
        FieldDef::new("created_at", "created_at", FieldKind::Timestamp),
        FieldDef::new("updated_at", "updated_at", FieldKind::Timestamp),
    ],
);

impl Product {
    /// The dynamic-query allow-list for this entity.
    pub fn fields() -> &'static FieldTable {
        &PRODUCT_FIELDS
    }

    /// Returns the price as a Money value.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity could be fulfilled from stock.
    ///
    /// A pre-check only: the authoritative floor check happens in the
    /// conditional stock decrement at the store.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.quantity_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer of the back office.
///
/// `user_id` links one-to-one to the external identity collaborator; this
/// crate never manages credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Full name.
    pub name: String,

    /// Email address (unique).
    pub email: String,

    /// CPF tax id (unique, required).
    pub cpf: String,

    /// Contact phone.
    pub phone: String,

    /// Postal address.
    pub address: String,

    /// Identity record owned by the external auth collaborator.
    pub user_id: Option<String>,

    /// When the customer was created. Set by the repository.
    pub created_at: DateTime<Utc>,

    /// When the customer was last updated. Set by the repository.
    pub updated_at: DateTime<Utc>,
}

static CUSTOMER_FIELDS: FieldTable = FieldTable::new(
    "Customer",
    &[
        FieldDef::new("id", "id", FieldKind::Text),
        FieldDef::new("name", "name", FieldKind::Text),
        FieldDef::new("email", "email", FieldKind::Text),
        FieldDef::new("cpf", "cpf", FieldKind::Text),
        FieldDef::new("phone", "phone", FieldKind::Text),
        FieldDef::new("address", "address", FieldKind::Text),
        FieldDef::new("created_at", "created_at", FieldKind::Timestamp),
        FieldDef::new("updated_at", "updated_at", FieldKind::Timestamp),
    ],
);

impl Customer {
    /// The dynamic-query allow-list for this entity.
    pub fn fields() -> &'static FieldTable {
        &CUSTOMER_FIELDS
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale.
///
/// Stored as distinct lowercase strings, so no two statuses can ever share
/// an underlying value and ordinal comparisons never enter the picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Newly created, awaiting approval.
    Pending,
    /// Approved for fulfillment.
    Approved,
    /// Handed to shipping.
    Sent,
    /// Received by the customer (terminal).
    Delivered,
    /// Cancelled before shipping (terminal).
    Cancelled,
}

impl SaleStatus {
    /// Lowercase storage/display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Approved => "approved",
            SaleStatus::Sent => "sent",
            SaleStatus::Delivered => "delivered",
            SaleStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the state machine allows moving from `self` to `to`.
    ///
    /// ```text
    /// Pending → Approved → Sent → Delivered
    ///    │          │
    ///    └──────────┴────► Cancelled (terminal)
    /// ```
    pub fn can_transition(&self, to: SaleStatus) -> bool {
        use SaleStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Approved, Sent) | (Sent, Delivered) | (Pending, Cancelled) | (Approved, Cancelled)
        )
    }

    /// Whether a sale in this status may still be cancelled.
    pub fn is_cancellable(&self) -> bool {
        self.can_transition(SaleStatus::Cancelled)
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment methods accepted for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Pix,
    Boleto,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale made to a customer.
///
/// A sale exclusively owns its items; items are loaded through the item
/// include and removed with the sale. The total is always derived from the
/// items, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer the sale belongs to.
    pub customer_id: String,

    /// Current workflow status.
    pub status: SaleStatus,

    /// When the sale was made.
    pub sale_date: DateTime<Utc>,

    /// How the sale was paid.
    pub payment_method: PaymentMethod,

    /// Free-text notes. The only field revisable after creation.
    pub observations: String,

    /// When the sale was created. Set by the repository.
    pub created_at: DateTime<Utc>,

    /// When the sale was last updated. Set by the repository.
    pub updated_at: DateTime<Utc>,

    /// Owned line items (populated via the items include).
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<ItemSale>,
}

static SALE_FIELDS: FieldTable = FieldTable::new(
    "Sale",
    &[
        FieldDef::new("id", "id", FieldKind::Text),
        FieldDef::new("customer_id", "customer_id", FieldKind::Text),
        FieldDef::new("status", "status", FieldKind::Text),
        FieldDef::new("sale_date", "sale_date", FieldKind::Timestamp),
        FieldDef::new("payment_method", "payment_method", FieldKind::Text),
        FieldDef::new("observations", "observations", FieldKind::Text),
        FieldDef::new("created_at", "created_at", FieldKind::Timestamp),
        FieldDef::new("updated_at", "updated_at", FieldKind::Timestamp),
    ],
);

impl Sale {
    /// The dynamic-query allow-list for this entity.
    pub fn fields() -> &'static FieldTable {
        &SALE_FIELDS
    }

    /// Derived total in cents: the sum of item totals.
    pub fn total_cents(&self) -> i64 {
        self.items.iter().map(ItemSale::total_cents).sum()
    }

    /// Derived total as Money.
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }
}

// =============================================================================
// Item Sale
// =============================================================================

/// A line item within a sale.
///
/// Uses the snapshot pattern: the unit price is captured from the product at
/// sale time and never recalculated from the product's current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ItemSale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Sale this item belongs to.
    pub sale_id: String,

    /// Product being sold.
    pub product_id: String,

    /// Units sold. Always positive.
    pub quantity: i64,

    /// Unit price in cents at sale time (frozen).
    pub unit_price_cents: i64,

    /// When the item was created. Set by the repository.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated. Set by the repository.
    pub updated_at: DateTime<Utc>,
}

static ITEM_SALE_FIELDS: FieldTable = FieldTable::new(
    "ItemSale",
    &[
        FieldDef::new("id", "id", FieldKind::Text),
        FieldDef::new("sale_id", "sale_id", FieldKind::Text),
        FieldDef::new("product_id", "product_id", FieldKind::Text),
        FieldDef::new("quantity", "quantity", FieldKind::Integer),
        FieldDef::new("unit_price_cents", "unit_price_cents", FieldKind::Integer),
        FieldDef::new("created_at", "created_at", FieldKind::Timestamp),
        FieldDef::new("updated_at", "updated_at", FieldKind::Timestamp),
    ],
);

impl ItemSale {
    /// The dynamic-query allow-list for this entity.
    pub fn fields() -> &'static FieldTable {
        &ITEM_SALE_FIELDS
    }

    /// Derived line total in cents (quantity × unit price).
    #[inline]
    pub fn total_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }

    /// Derived line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents())
    }

    /// Unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

// =============================================================================
// Sales Analysis
// =============================================================================

/// Revenue attributed to a single product over an analysis period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRevenue {
    pub product_id: String,
    pub product_name: String,
    pub revenue_cents: i64,
}

/// Aggregate result of a sales analysis over a date range.
///
/// `product_revenues` carries one row per distinct product sold in the
/// period, in no particular order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SalesAnalysisResult {
    pub total_sales_count: i64,
    pub total_revenue_cents: i64,
    pub product_revenues: Vec<ProductRevenue>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, unit_price_cents: i64) -> ItemSale {
        ItemSale {
            id: "i-1".to_string(),
            sale_id: "s-1".to_string(),
            product_id: "p-1".to_string(),
            quantity,
            unit_price_cents,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_item_total_is_quantity_times_unit_price() {
        assert_eq!(item(3, 1050).total_cents(), 3150);
    }

    #[test]
    fn test_sale_total_is_sum_of_item_totals() {
        let sale = Sale {
            id: "s-1".to_string(),
            customer_id: "c-1".to_string(),
            status: SaleStatus::Pending,
            sale_date: Utc::now(),
            payment_method: PaymentMethod::Pix,
            observations: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: vec![item(2, 1000), item(1, 500)],
        };
        assert_eq!(sale.total_cents(), 2500);
        assert_eq!(sale.total(), Money::from_cents(2500));
    }

    #[test]
    fn test_status_transitions() {
        use SaleStatus::*;
        assert!(Pending.can_transition(Approved));
        assert!(Approved.can_transition(Sent));
        assert!(Sent.can_transition(Delivered));
        assert!(Pending.can_transition(Cancelled));
        assert!(Approved.can_transition(Cancelled));

        assert!(!Pending.can_transition(Sent));
        assert!(!Sent.can_transition(Cancelled));
        assert!(!Delivered.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Pending));
    }

    #[test]
    fn test_cancellable_only_before_shipping() {
        assert!(SaleStatus::Pending.is_cancellable());
        assert!(SaleStatus::Approved.is_cancellable());
        assert!(!SaleStatus::Sent.is_cancellable());
        assert!(!SaleStatus::Delivered.is_cancellable());
        assert!(!SaleStatus::Cancelled.is_cancellable());
    }

    #[test]
    fn test_statuses_have_distinct_storage_values() {
        use SaleStatus::*;
        let all = [Pending, Approved, Sent, Delivered, Cancelled];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.as_str(), b.as_str());
            }
        }
    }

    #[test]
    fn test_product_can_fulfill() {
        let product = Product {
            id: "p-1".to_string(),
            name: "Cabo HDMI".to_string(),
            description: String::new(),
            price_cents: 2990,
            quantity_stock: 5,
            code: "CAB-HDMI".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            item_sales: Vec::new(),
        };
        assert!(product.can_fulfill(5));
        assert!(!product.can_fulfill(6));
        assert!(!product.can_fulfill(0));
        assert!(!product.can_fulfill(-1));
    }
}
