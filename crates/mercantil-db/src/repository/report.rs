//! # Report Repository
//!
//! Data behind the depreciation report.
//!
//! ```text
//! DepreciationQuery { kind, company, branch?, department?, sale?, as_of }
//!      │
//!      ▼
//! assets ⋈ departments ⋈ branches  (filtered)
//!      │
//!      ▼
//! straight_line() per asset  →  Vec<DepreciationRow>
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use mercantil_core::report::{straight_line, Asset, DepreciationQuery, DepreciationRow};
use mercantil_core::Money;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

/// Supplies the data of a depreciation report.
#[async_trait]
pub trait DepreciationSource: Send + Sync {
    async fn depreciation_rows(&self, query: &DepreciationQuery) -> DbResult<Vec<DepreciationRow>>;

    /// Name of the company for the report header, if it exists.
    async fn company_name(&self, company_id: &str) -> DbResult<Option<String>>;
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    id: String,
    name: String,
    price_cents: i64,
    acquired_on: NaiveDate,
    useful_life_years: i64,
}

impl From<AssetRow> for Asset {
    fn from(row: AssetRow) -> Self {
        Asset {
            id: row.id,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            acquired_on: row.acquired_on,
            useful_life_years: row.useful_life_years,
        }
    }
}

/// Repository for report data.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }
}

#[async_trait]
impl DepreciationSource for ReportRepository {
    async fn depreciation_rows(&self, query: &DepreciationQuery) -> DbResult<Vec<DepreciationRow>> {
        debug!(company_id = %query.company_id, kind = ?query.kind, "Loading depreciation rows");

        let mut sql = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT a.id, a.name, a.price_cents, a.acquired_on, a.useful_life_years
            FROM assets a
            JOIN departments d ON d.id = a.department_id
            JOIN branches b ON b.id = d.branch_id
            WHERE b.company_id = "#,
        );
        sql.push_bind(query.company_id.clone());

        if let Some(branch_id) = &query.branch_id {
            sql.push(" AND b.id = ").push_bind(branch_id.clone());
        }
        if let Some(department_id) = &query.department_id {
            sql.push(" AND d.id = ").push_bind(department_id.clone());
        }
        if let Some(sale_id) = &query.sale_id {
            sql.push(" AND a.sale_id = ").push_bind(sale_id.clone());
        }
        sql.push(" ORDER BY a.acquired_on, length(a.id), a.id");

        let rows: Vec<AssetRow> = sql.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Depreciation rows loaded");

        Ok(rows
            .into_iter()
            .map(Asset::from)
            .map(|asset| straight_line(&asset, query.kind, query.as_of))
            .collect())
    }

    async fn company_name(&self, company_id: &str) -> DbResult<Option<String>> {
        let name: Option<String> = sqlx::query_scalar("SELECT name FROM companies WHERE id = ?1")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_assets, seed_catalog, test_db};
    use mercantil_core::report::{DepreciationKind, ReportTotals};

    fn query(company_id: &str) -> DepreciationQuery {
        DepreciationQuery {
            kind: DepreciationKind::Annual,
            company_id: company_id.to_string(),
            branch_id: None,
            department_id: None,
            sale_id: None,
            as_of: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rows_for_whole_company() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        seed_assets(db.pool()).await;

        let rows = db.reports().depreciation_rows(&query("CO0001")).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["AC0001", "AC0002"]);

        // Laptop: 1200.00 over 5 years, one full year elapsed.
        assert_eq!(rows[0].depreciation.cents(), 24_000);
        assert_eq!(rows[0].accumulated.cents(), 24_000);
        assert_eq!(rows[0].book_value.cents(), 96_000);

        let totals = ReportTotals::aggregate(&rows);
        assert_eq!(totals.rows, 2);
        assert_eq!(totals.price.cents(), 120_000 + 30_000);
    }

    #[tokio::test]
    async fn test_branch_and_department_filters() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        seed_assets(db.pool()).await;

        let mut by_branch = query("CO0001");
        by_branch.branch_id = Some("SU0002".to_string());
        let rows = db.reports().depreciation_rows(&by_branch).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_id, "AC0002");

        let mut by_department = query("CO0001");
        by_department.department_id = Some("DP0001".to_string());
        let rows = db.reports().depreciation_rows(&by_department).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_id, "AC0001");

        assert!(db.reports().depreciation_rows(&query("CO9999")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_company_name() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        assert_eq!(
            db.reports().company_name("CO0001").await.unwrap().as_deref(),
            Some("Ferretería Central")
        );
        assert_eq!(db.reports().company_name("CO9999").await.unwrap(), None);
    }
}
