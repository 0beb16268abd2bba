//! # Repository Module
//!
//! Database repository implementations for Mercantil.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  state.db.sales().create(&ctx, &validated)                     │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── create(&self, ctx, sale)      one transaction                     │
//! │  ├── list(&self, ctx, filter)                                          │
//! │  ├── detail(&self, ctx, id)                                            │
//! │  └── delete(&self, ctx, id)        guarded by dependents               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product search and stock
//! - [`ClientRepository`](client::ClientRepository) - Client resolution and search
//! - [`SaleRepository`](sale::SaleRepository) - Sale workflow, listing, status
//! - [`ReportRepository`](report::ReportRepository) - Depreciation report data

pub mod client;
pub mod product;
pub mod report;
pub mod sale;

/// `LIKE` pattern matching any text that contains `needle`.
///
/// `%`, `_` and `\` in the needle are escaped, so queries must use
/// `ESCAPE '\'`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// First whitespace-separated token of a search query.
pub(crate) fn first_token(query: &str) -> &str {
    query.split_whitespace().next().unwrap_or("")
}
