//! # Pagination
//!
//! Pagination parameters, pages, and page metadata.
//!
//! ## Paging Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   25 matching records, page_size 10                 │
//! │                                                                     │
//! │   page 1: items 1..=10    has_previous=false  has_next=true         │
//! │   page 2: items 11..=20   has_previous=true   has_next=true         │
//! │   page 3: items 21..=25   has_previous=true   has_next=false        │
//! │   page 4: []              has_previous=true   has_next=false        │
//! │                                                                     │
//! │   total_count=25, total_pages=3 on every page, including page 4.    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Pagination Parameters
// =============================================================================

/// Pagination, filtering, and sorting parameters for list queries.
///
/// ## Example
/// ```rust
/// use venda_core::paging::PaginationParameters;
///
/// let params = PaginationParameters::new(2, 20)
///     .with_filter("active = true")
///     .with_order_by("name asc");
/// assert_eq!(params.page_size(), 20);
///
/// // Requests above the maximum are clamped, not rejected
/// assert_eq!(PaginationParameters::new(1, 500).page_size(), 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationParameters {
    /// Requested page, 1-based. Zero is treated as the first page.
    pub page_number: u32,

    /// Requested page size. Read through [`page_size()`](Self::page_size),
    /// which clamps to [`MAX_PAGE_SIZE`].
    pub page_size: u32,

    /// Optional dynamic filter expression (see [`crate::filter`]).
    /// Example: `name contains "John" and active = true`
    pub filter: Option<String>,

    /// Optional dynamic order expression (see [`crate::filter`]).
    /// Example: `name asc, created_at desc`
    pub order_by: Option<String>,
}

impl Default for PaginationParameters {
    fn default() -> Self {
        PaginationParameters {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filter: None,
            order_by: None,
        }
    }
}

impl PaginationParameters {
    pub fn new(page_number: u32, page_size: u32) -> Self {
        PaginationParameters {
            page_number,
            page_size,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    /// The effective page number (at least 1).
    pub fn page_number(&self) -> u32 {
        self.page_number.max(1)
    }

    /// The effective page size: at least 1, clamped to [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip before the requested page. Widened so a huge page
    /// number cannot overflow.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(self.page_size())
    }
}

// =============================================================================
// Page
// =============================================================================

/// A bounded slice of a larger result set plus its position in the whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Builds a page from the items of one slice plus the unpaged total.
    ///
    /// `total_count` must be the count of the *filtered, unpaged* result
    /// set; metadata math depends on it.
    pub fn new(items: Vec<T>, current_page: u32, page_size: u32, total_count: i64) -> Self {
        let total_pages = if total_count <= 0 {
            0
        } else {
            ((total_count + i64::from(page_size) - 1) / i64::from(page_size)) as u32
        };
        Page {
            has_previous: current_page > 1,
            has_next: current_page < total_pages,
            items,
            current_page,
            total_pages,
            page_size,
            total_count,
        }
    }

    /// The metadata block delivered alongside the body (e.g. as a header).
    pub fn metadata(&self) -> PaginationMetadata {
        PaginationMetadata {
            current_page: self.current_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
            total_count: self.total_count,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }

    /// Maps the page items, keeping the metadata (entity → DTO conversions).
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
            total_count: self.total_count,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}

// =============================================================================
// Pagination Metadata
// =============================================================================

/// Position metadata for a page, serialized as a side-channel value
/// (e.g. an `X-Pagination` response header).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    pub current_page: u32,
    pub total_pages: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PaginationMetadata {
    /// JSON rendering for header transport.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
