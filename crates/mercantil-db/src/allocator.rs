//! # Identifier Allocation
//!
//! Hands out the sequential `VT####` / `DV####` identifiers.
//!
//! ## How It Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  id_sequences                                                           │
//! │  ┌────────────┬────────┬────────────┐                                  │
//! │  │ namespace  │ prefix │ last_value │                                  │
//! │  ├────────────┼────────┼────────────┤                                  │
//! │  │ sale       │ VT     │ 41         │                                  │
//! │  │ sale_line  │ DV     │ 117        │                                  │
//! │  └────────────┴────────┴────────────┘                                  │
//! │                                                                         │
//! │  allocate(sale_line, 3) inside the sale transaction:                   │
//! │     UPDATE ... SET last_value = last_value + 3 RETURNING last_value    │
//! │     → 120  → DV0118, DV0119, DV0120                                    │
//! │                                                                         │
//! │  The UPDATE takes SQLite's write lock, so two transactions can never   │
//! │  read the same last_value. A rolled back sale also rolls back the      │
//! │  bump, so numbers are only consumed by committed sales.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use mercantil_core::{IdNamespace, SequentialId};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Source of sequential identifiers.
///
/// Implementations run on the caller's connection, which is normally the
/// open transaction of the operation that needs the identifiers.
#[async_trait]
pub trait IdentifierAllocator: Send + Sync {
    /// Reserves `count` consecutive identifiers.
    async fn allocate(
        &self,
        conn: &mut SqliteConnection,
        namespace: IdNamespace,
        count: u64,
    ) -> DbResult<Vec<SequentialId>>;

    /// The identifier the next allocation would return. Reserves nothing.
    async fn peek(&self, conn: &mut SqliteConnection, namespace: IdNamespace) -> DbResult<SequentialId>;
}

/// Allocator backed by the `id_sequences` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceAllocator;

#[async_trait]
impl IdentifierAllocator for SequenceAllocator {
    async fn allocate(
        &self,
        conn: &mut SqliteConnection,
        namespace: IdNamespace,
        count: u64,
    ) -> DbResult<Vec<SequentialId>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let step = i64::try_from(count)
            .map_err(|_| DbError::Internal(format!("cannot allocate {count} identifiers")))?;

        let last: Option<i64> = sqlx::query_scalar(
            "UPDATE id_sequences SET last_value = last_value + ?1 \
             WHERE namespace = ?2 RETURNING last_value",
        )
        .bind(step)
        .bind(namespace.key())
        .fetch_optional(&mut *conn)
        .await?;

        let last = last.ok_or_else(|| DbError::not_found("Identifier sequence", namespace.key()))?;
        let last = last as u64;
        let first = last + 1 - count;

        debug!(namespace = namespace.key(), first, last, "Allocated identifiers");

        Ok((first..=last).map(|n| namespace.id(n)).collect())
    }

    async fn peek(&self, conn: &mut SqliteConnection, namespace: IdNamespace) -> DbResult<SequentialId> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM id_sequences WHERE namespace = ?1")
                .bind(namespace.key())
                .fetch_optional(&mut *conn)
                .await?;

        let last = last.ok_or_else(|| DbError::not_found("Identifier sequence", namespace.key()))?;
        Ok(namespace.id(last as u64 + 1))
    }
}

impl SequenceAllocator {
    /// Moves a sequence past every identifier already stored in `table`.
    ///
    /// Databases imported from the legacy application carry sales whose ids
    /// were never issued through `id_sequences`. The existing ids are parsed
    /// and the sequence is raised to the highest number found; it is never
    /// lowered.
    pub async fn reconcile(
        conn: &mut SqliteConnection,
        namespace: IdNamespace,
        table: &str,
    ) -> DbResult<u64> {
        let sql = format!("SELECT id FROM {table} WHERE id LIKE ?1");
        let ids: Vec<String> = sqlx::query_scalar(&sql)
            .bind(format!("{}%", namespace.prefix()))
            .fetch_all(&mut *conn)
            .await?;

        let highest = ids
            .iter()
            .filter_map(|id| SequentialId::parse(namespace.prefix(), id))
            .map(|id| id.number())
            .max()
            .unwrap_or(0);

        let highest_i64 = i64::try_from(highest)
            .map_err(|_| DbError::Internal(format!("identifier number {highest} out of range")))?;

        let result = sqlx::query(
            "UPDATE id_sequences SET last_value = MAX(last_value, ?1) WHERE namespace = ?2",
        )
        .bind(highest_i64)
        .bind(namespace.key())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Identifier sequence", namespace.key()));
        }

        if highest > 0 {
            info!(namespace = namespace.key(), highest, "Identifier sequence reconciled");
        }

        Ok(highest)
    }
}
