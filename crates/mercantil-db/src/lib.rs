//! # mercantil-db: Database Layer for Mercantil
//!
//! This crate provides database access for the Mercantil back office.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mercantil Data Flow                              │
//! │                                                                         │
//! │  axum handler (POST /api/sales)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   mercantil-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 002_sales    │  │   │
//! │  │   │ Allocator     │    │ ClientRepo    │    │ 003_assets   │  │   │
//! │  │   │               │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`allocator`] - Sequential identifier allocation
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, product, client, report)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mercantil_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./mercantil.db")).await?;
//!
//! let products = db.products().search("tornillo", 20).await?;
//! let sale = db.sales().create(&ctx, &validated).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use allocator::{IdentifierAllocator, SequenceAllocator};
pub use error::{DbError, DbResult, SaleError};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::client::ClientRepository;
pub use repository::product::ProductRepository;
pub use repository::report::{DepreciationSource, ReportRepository};
pub use repository::sale::{GuardedChange, SaleRepository};
