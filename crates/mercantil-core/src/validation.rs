//! # Validation Module
//!
//! Shape validation of incoming requests for Mercantil.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (axum)                                                  │
//! │  └── JSON object into SaleRequest (fields optional, any JSON type)     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (pure)                                           │
//! │  ├── required fields, JSON types, payment terms                        │
//! │  ├── quantity > 0, unit price > 0 with at most 2 decimals              │
//! │  └── every failure collected under its dotted field path               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Sale workflow (inside the transaction)                       │
//! │  ├── client resolves to exactly one client table                       │
//! │  ├── every product exists                                              │
//! │  └── stock covers every line                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mercantil_core::validation::{validate_sale_request, SaleRequest};
//!
//! let request: SaleRequest = serde_json::from_value(serde_json::json!({
//!     "client_id": "CN0001",
//!     "payment_type": "cash",
//!     "lines": [{ "product_id": "PR0001", "quantity": 2, "unit_price": "10.00" }]
//! }))
//! .unwrap();
//!
//! let sale = validate_sale_request(&request).unwrap();
//! assert_eq!(sale.lines[0].unit_price.cents(), 1000);
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FieldErrors, ValidationError};
use crate::money::{Money, MoneyParseError};
use crate::types::PaymentType;

/// Result type for single-field validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted search query.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;

// =============================================================================
// Request DTOs
// =============================================================================

/// A numeric form value, sent either as a JSON number or as text.
///
/// Any other JSON value lands in `Other` and fails validation with a
/// format error for its field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
    Other(Value),
}

impl NumericInput {
    fn as_text(&self) -> Option<String> {
        match self {
            NumericInput::Number(n) => Some(n.to_string()),
            NumericInput::Text(s) => Some(s.trim().to_string()),
            NumericInput::Other(_) => None,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            NumericInput::Number(n) => n.as_i64(),
            NumericInput::Text(s) => s.trim().parse().ok(),
            NumericInput::Other(_) => None,
        }
    }
}

/// Body of `POST /api/sales`, as received.
///
/// Fields are kept as loose JSON so that a value of the wrong type is
/// reported under its own path instead of rejecting the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleRequest {
    #[serde(default)]
    pub client_id: Option<Value>,
    #[serde(default)]
    pub payment_type: Option<Value>,
    #[serde(default)]
    pub term_months: Option<NumericInput>,
    /// Expected to be an array of [`LineRequest`] objects.
    #[serde(default)]
    pub lines: Option<Value>,
}

/// One requested sale line, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineRequest {
    #[serde(default)]
    pub product_id: Option<Value>,
    #[serde(default)]
    pub quantity: Option<NumericInput>,
    #[serde(default)]
    pub unit_price: Option<NumericInput>,
}

// =============================================================================
// Validated Values
// =============================================================================

/// Payment terms after validation. A term only exists for credit sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTerms {
    Cash,
    Credit { months: i64 },
}

impl PaymentTerms {
    pub fn payment_type(&self) -> PaymentType {
        match self {
            PaymentTerms::Cash => PaymentType::Cash,
            PaymentTerms::Credit { .. } => PaymentType::Credit,
        }
    }

    /// Value for the `term_months` column.
    pub fn term_months(&self) -> Option<i64> {
        match self {
            PaymentTerms::Cash => None,
            PaymentTerms::Credit { months } => Some(*months),
        }
    }
}

/// A sale request whose shape is known to be valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSale {
    /// Raw client id; resolved against the client tables by the workflow.
    pub client_id: String,
    pub terms: PaymentTerms,
    pub lines: Vec<ValidatedLine>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
}

// =============================================================================
// Sale Request Validation
// =============================================================================

/// Validates the shape of a sale request.
///
/// Every offending field is reported, not just the first one.
///
/// ## Rules
/// - `client_id` required
/// - `payment_type` one of cash / credit (`Contado` / `Crédito` accepted)
/// - credit requires `term_months` > 0; for cash it is ignored
/// - at least one line; each with `product_id`, `quantity` > 0 and a
///   positive `unit_price` with at most two decimals
pub fn validate_sale_request(request: &SaleRequest) -> Result<ValidatedSale, FieldErrors> {
    let mut errors = FieldErrors::new();

    let client_id = match text_value(request.client_id.as_ref(), "client_id")
        .and_then(|value| required_text(value, "client_id"))
    {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let terms = match text_value(request.payment_type.as_ref(), "payment_type")
        .and_then(|token| validate_payment_terms(token, request.term_months.as_ref()))
    {
        Ok(terms) => Some(terms),
        Err(e) => {
            errors.push(e);
            None
        }
    };

    let entries: &[Value] = match request.lines.as_ref() {
        Some(Value::Array(items)) if !items.is_empty() => items,
        None | Some(Value::Null) | Some(Value::Array(_)) => {
            errors.push(ValidationError::Required {
                field: "lines".to_string(),
            });
            &[]
        }
        Some(_) => {
            errors.push(ValidationError::InvalidFormat {
                field: "lines".to_string(),
                reason: "must be a list of lines".to_string(),
            });
            &[]
        }
    };

    let mut lines = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let line = match LineRequest::deserialize(entry) {
            Ok(line) => line,
            Err(_) => {
                errors.push(ValidationError::InvalidFormat {
                    field: format!("lines.{index}"),
                    reason: "must be an object".to_string(),
                });
                continue;
            }
        };
        if let Some(valid) = validate_line(index, &line, &mut errors) {
            lines.push(valid);
        }
    }

    match (client_id, terms) {
        (Some(client_id), Some(terms)) if errors.is_empty() => Ok(ValidatedSale {
            client_id,
            terms,
            lines,
        }),
        _ => Err(errors),
    }
}

/// Validates the payment type token and, for credit, the term.
pub fn validate_payment_terms(
    payment_type: Option<&str>,
    term_months: Option<&NumericInput>,
) -> ValidationResult<PaymentTerms> {
    let token = required_text(payment_type, "payment_type")?;

    match token.parse::<PaymentType>()? {
        PaymentType::Cash => Ok(PaymentTerms::Cash),
        PaymentType::Credit => {
            let field = "term_months";
            let input = term_months.ok_or_else(|| ValidationError::Required {
                field: field.to_string(),
            })?;
            let months = input
                .as_integer()
                .ok_or_else(|| ValidationError::InvalidFormat {
                    field: field.to_string(),
                    reason: "must be a whole number of months".to_string(),
                })?;
            if months <= 0 {
                return Err(ValidationError::MustBePositive {
                    field: field.to_string(),
                });
            }
            Ok(PaymentTerms::Credit { months })
        }
    }
}

fn validate_line(index: usize, line: &LineRequest, errors: &mut FieldErrors) -> Option<ValidatedLine> {
    let field = format!("lines.{index}.product_id");
    let product_id = text_value(line.product_id.as_ref(), &field)
        .and_then(|value| required_text(value, &field))
        .map_err(|e| errors.push(e))
        .ok();

    let quantity = validate_quantity(line.quantity.as_ref(), &format!("lines.{index}.quantity"))
        .map_err(|e| errors.push(e))
        .ok();

    let unit_price = validate_unit_price(line.unit_price.as_ref(), &format!("lines.{index}.unit_price"))
        .map_err(|e| errors.push(e))
        .ok();

    Some(ValidatedLine {
        product_id: product_id?,
        quantity: quantity?,
        unit_price: unit_price?,
    })
}

/// Validates a line quantity: a positive integer.
pub fn validate_quantity(input: Option<&NumericInput>, field: &str) -> ValidationResult<i64> {
    let input = input.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;

    let quantity = input.as_integer().ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be an integer".to_string(),
    })?;

    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(quantity)
}

/// Validates a unit price: a positive decimal with at most two fractional
/// digits.
///
/// ## Example
/// ```rust
/// use mercantil_core::validation::{validate_unit_price, NumericInput};
///
/// let price = NumericInput::Text("10.5".to_string());
/// assert_eq!(validate_unit_price(Some(&price), "unit_price").unwrap().cents(), 1050);
///
/// let price = NumericInput::Text("0".to_string());
/// assert!(validate_unit_price(Some(&price), "unit_price").is_err());
/// ```
pub fn validate_unit_price(input: Option<&NumericInput>, field: &str) -> ValidationResult<Money> {
    let input = input.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;

    let text = input.as_text().ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a decimal amount".to_string(),
    })?;

    let price = Money::parse_decimal(&text).map_err(|e| match e {
        MoneyParseError::Empty => ValidationError::Required {
            field: field.to_string(),
        },
        other => ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: other.to_string(),
        },
    })?;

    if !price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(price)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (matches everything)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: MAX_SEARCH_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Reads a text field from loose JSON. Null counts as absent.
fn text_value<'a>(value: Option<&'a Value>, field: &str) -> ValidationResult<Option<&'a str>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.as_str())),
        Some(_) => Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be text".to_string(),
        }),
    }
}

fn required_text(value: Option<&str>, field: &str) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ValidationError::Required {
            field: field.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
