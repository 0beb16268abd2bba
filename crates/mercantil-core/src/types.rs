//! # Domain Types
//!
//! Core domain types used throughout Mercantil.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    SaleLine     │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (VT0001)    │◄──│  sale_id (FK)   │   │  id             │       │
//! │  │  payment_type   │   │  id (DV0001)    │──►│  name           │       │
//! │  │  principal      │   │  quantity       │   │  stock          │       │
//! │  │  tax / total    │   │  subtotal       │   │  is_active      │       │
//! │  │  client ────────┼─┐ └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘ │                                                  │
//! │                      ▼                                                  │
//! │        ┌──────────────────────────────┐                                 │
//! │        │ ClientRef                    │                                 │
//! │        │  Natural(id) │ Legal(id)     │  resolved once at the boundary  │
//! │        └──────────────────────────────┘                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1400 bps = 14%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Payment Type
// =============================================================================

/// How a sale is paid.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Paid in full at the time of sale.
    Cash,
    /// Paid in monthly installments.
    Credit,
}

impl PaymentType {
    pub const ALLOWED: [&'static str; 2] = ["cash", "credit"];
}

/// Accepts `cash` / `credit` plus the legacy `Contado` / `Crédito` tokens,
/// case-insensitively.
impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "contado" => Ok(PaymentType::Cash),
            "credit" | "credito" | "crédito" => Ok(PaymentType::Credit),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_type".to_string(),
                allowed: PaymentType::ALLOWED.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::Cash => write!(f, "cash"),
            PaymentType::Credit => write!(f, "credit"),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// Soft status flag of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Active,
    Disabled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Active
    }
}

// =============================================================================
// Clients
// =============================================================================

/// The two disjoint client categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    /// An individual person.
    Natural,
    /// A registered company.
    Legal,
}

/// A client reference whose kind has already been resolved.
///
/// Raw client ids arrive as plain strings. They are looked up once against
/// both client tables and carried as this typed reference afterwards, so no
/// later step has to guess which table an id lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ClientRef {
    Natural(String),
    Legal(String),
}

impl ClientRef {
    pub fn kind(&self) -> ClientKind {
        match self {
            ClientRef::Natural(_) => ClientKind::Natural,
            ClientRef::Legal(_) => ClientKind::Legal,
        }
    }

    /// Value for the `natural_client_id` column.
    pub fn natural_id(&self) -> Option<&str> {
        match self {
            ClientRef::Natural(id) => Some(id),
            ClientRef::Legal(_) => None,
        }
    }

    /// Value for the `legal_client_id` column.
    pub fn legal_id(&self) -> Option<&str> {
        match self {
            ClientRef::Legal(id) => Some(id),
            ClientRef::Natural(_) => None,
        }
    }

    /// Rebuilds the reference from the two mutually exclusive columns.
    ///
    /// Returns `None` unless exactly one of them is set.
    pub fn from_columns(natural: Option<String>, legal: Option<String>) -> Option<Self> {
        match (natural, legal) {
            (Some(id), None) => Some(ClientRef::Natural(id)),
            (None, Some(id)) => Some(ClientRef::Legal(id)),
            _ => None,
        }
    }
}

/// One row of the unified client search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClientSummary {
    pub id: String,
    /// Display name: "first last" for people, company name for companies.
    pub name: String,
    pub kind: ClientKind,
    pub is_active: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product as stored, with its maintained stock column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Units available for sale. Decremented by sale creation.
    pub stock: i64,
}

/// A product as offered for sale, with stock and price derived from the
/// purchase and sale ledgers at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductListing {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Σ purchased − Σ sold.
    pub stock: i64,
    /// Average purchase cost plus markup, in cents.
    pub sale_price_cents: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub payment_type: PaymentType,
    /// Installment count; only set for credit sales.
    pub term_months: Option<i64>,
    /// Pre-tax total (Σ line subtotals).
    pub principal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub employee_id: String,
    pub branch_id: String,
    pub client: ClientRef,
    pub status: SaleStatus,
}

impl Sale {
    #[inline]
    pub fn principal(&self) -> Money {
        Money::from_cents(self.principal_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item of a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub subtotal_cents: i64,
}

/// A sale together with the display name of its client, as listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleSummary {
    #[serde(flatten)]
    pub sale: Sale,
    pub client_name: String,
}

/// A sale line together with the product name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineDetail {
    #[serde(flatten)]
    pub line: SaleLine,
    pub product_name: String,
}

/// A sale with its client name and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub summary: SaleSummary,
    pub lines: Vec<SaleLineDetail>,
}

// =============================================================================
// Request Context
// =============================================================================

/// Role of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Sees every sale of every branch.
    Admin,
    /// Sees only their own sales in their own branch.
    Staff,
}

/// Who is making the request, passed explicitly into every operation that
/// depends on the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub employee_id: String,
    pub role: Role,
    pub branch_id: String,
    pub department_id: Option<String>,
}

impl RequestContext {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Listing Filters
// =============================================================================

/// Payment-type filter of the sale listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaymentFilter {
    #[default]
    All,
    Only(PaymentType),
}

impl FromStr for PaymentFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v-todas" | "all" => Ok(PaymentFilter::All),
            "v-contado" | "cash" => Ok(PaymentFilter::Only(PaymentType::Cash)),
            "v-credito" | "credit" => Ok(PaymentFilter::Only(PaymentType::Credit)),
            _ => Err(ValidationError::NotAllowed {
                field: "payment".to_string(),
                allowed: ["v-todas", "v-contado", "v-credito"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Client-kind filter of the sale listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientFilter {
    #[default]
    All,
    Only(ClientKind),
}

impl FromStr for ClientFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c-todos" | "all" => Ok(ClientFilter::All),
            "c-natural" | "natural" => Ok(ClientFilter::Only(ClientKind::Natural)),
            "c-juridico" | "legal" => Ok(ClientFilter::Only(ClientKind::Legal)),
            _ => Err(ValidationError::NotAllowed {
                field: "client".to_string(),
                allowed: ["c-todos", "c-natural", "c-juridico"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Both listing filters together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaleFilter {
    pub payment: PaymentFilter,
    pub client: ClientFilter,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_type_tokens() {
        assert_eq!("cash".parse::<PaymentType>().unwrap(), PaymentType::Cash);
        assert_eq!("Contado".parse::<PaymentType>().unwrap(), PaymentType::Cash);
        assert_eq!("credit".parse::<PaymentType>().unwrap(), PaymentType::Credit);
        assert_eq!("Crédito".parse::<PaymentType>().unwrap(), PaymentType::Credit);
        assert!("layaway".parse::<PaymentType>().is_err());
    }

    #[test]
    fn test_client_ref_columns() {
        let natural = ClientRef::Natural("CN0001".to_string());
        assert_eq!(natural.natural_id(), Some("CN0001"));
        assert_eq!(natural.legal_id(), None);
        assert_eq!(natural.kind(), ClientKind::Natural);

        assert_eq!(
            ClientRef::from_columns(None, Some("CJ0001".to_string())),
            Some(ClientRef::Legal("CJ0001".to_string()))
        );
        assert_eq!(ClientRef::from_columns(None, None), None);
        assert_eq!(
            ClientRef::from_columns(Some("a".to_string()), Some("b".to_string())),
            None
        );
    }

    #[test]
    fn test_client_ref_serializes_tagged() {
        let json = serde_json::to_value(ClientRef::Legal("CJ0001".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "legal", "id": "CJ0001" }));
    }

    #[test]
    fn test_listing_filter_tokens() {
        assert_eq!("v-todas".parse::<PaymentFilter>().unwrap(), PaymentFilter::All);
        assert_eq!(
            "v-credito".parse::<PaymentFilter>().unwrap(),
            PaymentFilter::Only(PaymentType::Credit)
        );
        assert_eq!(
            "c-juridico".parse::<ClientFilter>().unwrap(),
            ClientFilter::Only(ClientKind::Legal)
        );
        assert!("v-otras".parse::<PaymentFilter>().is_err());
        assert!("c-otros".parse::<ClientFilter>().is_err());
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Active);
    }
}
