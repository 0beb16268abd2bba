//! Embedded schema migrations.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_initial_schema.sql   companies, branches, employees, clients, products
//! ├── 002_sales.sql            sales, sale_lines, id_sequences (VT / DV)
//! └── 003_assets.sql           depreciable assets, optionally tied to a sale
//! ```
//!
//! Files are applied in name order and recorded in `_sqlx_migrations`.
//! Applied files are never edited; schema changes go into a new file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let known = MIGRATOR.migrations.len();
    MIGRATOR.run(pool).await?;
    info!(migrations = known, "Schema up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn applied(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_every_migration_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(applied(db.pool()).await, MIGRATOR.migrations.len() as i64);

        let sequences: Vec<String> =
            sqlx::query_scalar("SELECT namespace FROM id_sequences ORDER BY namespace")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(sequences, vec!["sale", "sale_line"]);
    }

    #[tokio::test]
    async fn test_rerun_applies_nothing_new() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.run_migrations().await.unwrap();
        assert_eq!(applied(db.pool()).await, 3);
    }
}
