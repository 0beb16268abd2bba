//! # mercantil-core: Pure Business Logic for Mercantil
//!
//! This crate holds every business rule of the sales back office as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercantil Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │    POST /api/sales, GET /api/clients, GET /api/products, ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mercantil-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  totals   │  │ validation│  │   │
//! │  │   │   Sale    │  │   Money   │  │ SaleTotals│  │  requests │  │   │
//! │  │   │ ClientRef │  │  TaxRate  │  │           │  │   fields  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                │   │
//! │  │   │    id     │  │  report   │                                │   │
//! │  │   │ VT0001    │  │ straight  │                                │   │
//! │  │   │ DV0001    │  │ line dep. │                                │   │
//! │  │   └───────────┘  └───────────┘                                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    mercantil-db (SQLite)                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SaleLine, ClientRef, Product, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`totals`] - Sale subtotal / tax / total computation
//! - [`id`] - Human-readable sequential identifiers
//! - [`validation`] - Sale request and search validation
//! - [`report`] - Depreciation math and report aggregation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mercantil_core::money::Money;
//! use mercantil_core::SALE_TAX_RATE;
//!
//! let principal = Money::from_cents(2500); // 25.00
//! let tax = principal.calculate_tax(SALE_TAX_RATE);
//! assert_eq!(tax.cents(), 350); // 3.50
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod id;
pub mod money;
pub mod report;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, FieldErrors, ValidationError};
pub use id::{IdNamespace, SequentialId};
pub use money::Money;
pub use totals::SaleTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// VAT applied to every sale: 14% (1400 basis points).
pub const SALE_TAX_RATE: TaxRate = TaxRate::from_bps(1400);

/// Markup over the average purchase cost used to derive a product's sale
/// price: 10% (1000 basis points).
pub const SALE_PRICE_MARKUP_BPS: u32 = 1000;

/// Prefix of sale identifiers (`VT0001`).
pub const SALE_ID_PREFIX: &str = "VT";

/// Prefix of sale line identifiers (`DV0001`).
pub const SALE_LINE_ID_PREFIX: &str = "DV";

/// Minimum number of digits in a sequential identifier.
pub const ID_DIGITS: usize = 4;
