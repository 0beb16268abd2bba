//! # Sequential Identifiers
//!
//! Human-readable identifiers of the form `<PREFIX><NUMBER>`, with the
//! number zero-padded to [`ID_DIGITS`](crate::ID_DIGITS) digits:
//!
//! ```text
//! VT0001, VT0002, ..., VT9999, VT10000
//! DV0001, DV0002, ...
//! ```
//!
//! This module only formats and parses. Handing out numbers is the job of
//! the allocator in mercantil-db, which reserves them inside the sale's
//! transaction.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ID_DIGITS, SALE_ID_PREFIX, SALE_LINE_ID_PREFIX};

/// Identifier namespaces handed out by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdNamespace {
    Sale,
    SaleLine,
}

impl IdNamespace {
    /// Key of the namespace in the `id_sequences` table.
    pub const fn key(&self) -> &'static str {
        match self {
            IdNamespace::Sale => "sale",
            IdNamespace::SaleLine => "sale_line",
        }
    }

    /// Two-letter prefix of identifiers in this namespace.
    pub const fn prefix(&self) -> &'static str {
        match self {
            IdNamespace::Sale => SALE_ID_PREFIX,
            IdNamespace::SaleLine => SALE_LINE_ID_PREFIX,
        }
    }

    /// Builds the identifier with the given sequence number.
    pub fn id(&self, number: u64) -> SequentialId {
        SequentialId::new(self.prefix(), number)
    }

    /// The identifier issued when the namespace is still empty.
    pub fn first(&self) -> SequentialId {
        self.id(1)
    }
}

/// A prefixed, zero-padded sequential identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequentialId {
    prefix: String,
    number: u64,
}

impl SequentialId {
    pub fn new(prefix: impl Into<String>, number: u64) -> Self {
        SequentialId {
            prefix: prefix.into(),
            number,
        }
    }

    /// Parses `text` as an identifier with the given prefix.
    ///
    /// ## Example
    /// ```rust
    /// use mercantil_core::id::SequentialId;
    ///
    /// let id = SequentialId::parse("VT", "VT0042").unwrap();
    /// assert_eq!(id.number(), 42);
    /// assert!(SequentialId::parse("VT", "DV0042").is_none());
    /// ```
    pub fn parse(prefix: &str, text: &str) -> Option<Self> {
        let digits = text.strip_prefix(prefix)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let number = digits.parse().ok()?;
        Some(SequentialId::new(prefix, number))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn number(&self) -> u64 {
        self.number
    }
}

impl fmt::Display for SequentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:0width$}", self.prefix, self.number, width = ID_DIGITS)
    }
}
