//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   create(): one transaction                             │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   1. allocate VT#### and N × DV####   ← takes the write lock           │
//! │   2. resolve client_id → ClientRef    ┐                                │
//! │   3. every product exists             ┘ FieldErrors → 422              │
//! │   4. totals (principal, 14% tax)        overflow → 422                 │
//! │   5. per line, in order:                                               │
//! │        UPDATE stock WHERE stock >= qty  short → InsufficientStock      │
//! │   6. INSERT sale                                                       │
//! │   7. INSERT all lines (one statement)                                  │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any error between BEGIN and COMMIT → ROLLBACK. Nothing is written,    │
//! │  no stock changes, no identifier numbers are consumed.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Other Lifecycle Operations
//! - `set_status()` enables / disables a sale (soft flag)
//! - `delete()` removes a sale and its lines and puts the stock back
//!
//! Both open their transaction with a write, as `create()` does, so the
//! write lock is held before the first read.
//!
//! Disabling and deleting are refused while an asset references the sale.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mercantil_core::totals::compute_sale_totals;
use mercantil_core::validation::ValidatedSale;
use mercantil_core::{
    ClientFilter, ClientKind, ClientRef, CoreError, FieldErrors, IdNamespace, Money, PaymentFilter,
    PaymentType, RequestContext, Sale, SaleDetail, SaleFilter, SaleLine, SaleLineDetail,
    SaleStatus, SaleSummary, SequentialId, ValidationError, SALE_TAX_RATE,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::client::ClientRepository;
use super::product::ProductRepository;
use crate::allocator::IdentifierAllocator;
use crate::error::{DbError, DbResult, SaleError};

// =============================================================================
// Rows
// =============================================================================

const SALE_COLUMNS: &str = r#"
    s.id, s.created_at, s.payment_type, s.term_months,
    s.principal_cents, s.tax_cents, s.total_cents,
    s.employee_id, s.branch_id, s.natural_client_id, s.legal_client_id, s.status,
    COALESCE(n.first_names || ' ' || n.last_names, l.company_name, '') AS client_name
"#;

const SALE_JOINS: &str = r#"
    FROM sales s
    LEFT JOIN natural_clients n ON n.id = s.natural_client_id
    LEFT JOIN legal_clients l ON l.id = s.legal_client_id
"#;

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    created_at: DateTime<Utc>,
    payment_type: PaymentType,
    term_months: Option<i64>,
    principal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    employee_id: String,
    branch_id: String,
    natural_client_id: Option<String>,
    legal_client_id: Option<String>,
    status: SaleStatus,
    client_name: String,
}

impl TryFrom<SaleRow> for SaleSummary {
    type Error = DbError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        let client = ClientRef::from_columns(row.natural_client_id, row.legal_client_id)
            .ok_or_else(|| DbError::Internal(format!("sale {} does not reference exactly one client", row.id)))?;

        Ok(SaleSummary {
            sale: Sale {
                id: row.id,
                created_at: row.created_at,
                payment_type: row.payment_type,
                term_months: row.term_months,
                principal_cents: row.principal_cents,
                tax_cents: row.tax_cents,
                total_cents: row.total_cents,
                employee_id: row.employee_id,
                branch_id: row.branch_id,
                client,
                status: row.status,
            },
            client_name: row.client_name,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: String,
    sale_id: String,
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
    product_name: String,
}

impl From<LineRow> for SaleLineDetail {
    fn from(row: LineRow) -> Self {
        SaleLineDetail {
            line: SaleLine {
                id: row.id,
                sale_id: row.sale_id,
                product_id: row.product_id,
                quantity: row.quantity,
                unit_price_cents: row.unit_price_cents,
                subtotal_cents: row.subtotal_cents,
            },
            product_name: row.product_name,
        }
    }
}

/// Result of an operation that dependent records can veto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedChange {
    /// The change was made.
    Applied,
    /// Nothing was changed because `dependents` records reference the sale.
    Blocked { dependents: i64 },
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    allocator: Arc<dyn IdentifierAllocator>,
}

impl std::fmt::Debug for SaleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaleRepository").field("pool", &self.pool).finish_non_exhaustive()
    }
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, allocator: Arc<dyn IdentifierAllocator>) -> Self {
        SaleRepository { pool, allocator }
    }

    /// Creates a sale and its lines atomically.
    ///
    /// ## Returns
    /// * `Ok(Sale)` - Committed sale
    /// * `Err(SaleError::Rejected)` - Unknown client/product, short stock or
    ///   overflow; rolled back
    /// * `Err(SaleError::Database)` - Storage failure; rolled back
    pub async fn create(&self, ctx: &RequestContext, request: &ValidatedSale) -> Result<Sale, SaleError> {
        debug!(
            employee_id = %ctx.employee_id,
            client_id = %request.client_id,
            lines = request.lines.len(),
            "Creating sale"
        );

        let mut tx = self.pool.begin().await?;

        match self.create_in(&mut tx, ctx, request).await {
            Ok(sale) => {
                tx.commit().await.map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                info!(
                    sale_id = %sale.id,
                    total = %sale.total(),
                    lines = request.lines.len(),
                    "Sale created"
                );
                Ok(sale)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback of failed sale did not complete");
                }
                match &err {
                    SaleError::Rejected(reason) => warn!(reason = %reason, "Sale rejected"),
                    SaleError::Database(db_err) => warn!(error = %db_err, "Sale failed"),
                }
                Err(err)
            }
        }
    }

    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        ctx: &RequestContext,
        request: &ValidatedSale,
    ) -> Result<Sale, SaleError> {
        // Identifier allocation is the first write of the transaction, so the
        // write lock is held for every read that follows.
        let sale_id = self
            .allocator
            .allocate(&mut *conn, IdNamespace::Sale, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::Internal("no sale identifier allocated".to_string()))?;
        let line_ids = self
            .allocator
            .allocate(&mut *conn, IdNamespace::SaleLine, request.lines.len() as u64)
            .await?;

        let client = resolve_references(&mut *conn, request).await?;

        let (subtotals, totals) = compute_sale_totals(&request.lines, SALE_TAX_RATE)?;

        for (index, line) in request.lines.iter().enumerate() {
            if !ProductRepository::take_stock(&mut *conn, &line.product_id, line.quantity).await? {
                let available = ProductRepository::stock(&mut *conn, &line.product_id)
                    .await?
                    .unwrap_or(0);
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    line: index,
                    available,
                    requested: line.quantity,
                }
                .into());
            }
        }

        let sale = Sale {
            id: sale_id.to_string(),
            created_at: Utc::now(),
            payment_type: request.terms.payment_type(),
            term_months: request.terms.term_months(),
            principal_cents: totals.principal.cents(),
            tax_cents: totals.tax.cents(),
            total_cents: totals.total.cents(),
            employee_id: ctx.employee_id.clone(),
            branch_id: ctx.branch_id.clone(),
            client,
            status: SaleStatus::Active,
        };

        insert_sale(&mut *conn, &sale).await?;
        insert_lines(&mut *conn, &sale.id, &line_ids, request, &subtotals).await?;

        Ok(sale)
    }

    /// Lists sales visible to the caller, newest first.
    ///
    /// Admins see every sale. Everyone else sees the sales they created in
    /// their own branch.
    pub async fn list(&self, ctx: &RequestContext, filter: SaleFilter) -> DbResult<Vec<SaleSummary>> {
        debug!(employee_id = %ctx.employee_id, ?filter, "Listing sales");

        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(SALE_COLUMNS).push(SALE_JOINS).push(" WHERE 1 = 1");

        if let PaymentFilter::Only(payment_type) = filter.payment {
            query.push(" AND s.payment_type = ").push_bind(payment_type);
        }
        match filter.client {
            ClientFilter::All => {}
            ClientFilter::Only(ClientKind::Natural) => {
                query.push(" AND s.natural_client_id IS NOT NULL");
            }
            ClientFilter::Only(ClientKind::Legal) => {
                query.push(" AND s.legal_client_id IS NOT NULL");
            }
        }
        push_scope(&mut query, ctx);
        // Ids outgrow four digits ("VT10000"), so compare length before text.
        query.push(" ORDER BY s.created_at DESC, length(s.id) DESC, s.id DESC");

        let rows: Vec<SaleRow> = query.build_query_as().fetch_all(&self.pool).await?;

        rows.into_iter().map(SaleSummary::try_from).collect()
    }

    /// Gets a sale visible to the caller, with its lines.
    pub async fn detail(&self, ctx: &RequestContext, id: &str) -> DbResult<Option<SaleDetail>> {
        let Some(summary) = self.find_visible(&self.pool, ctx, id).await? else {
            return Ok(None);
        };

        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT dl.id, dl.sale_id, dl.product_id, dl.quantity,
                   dl.unit_price_cents, dl.subtotal_cents,
                   p.name AS product_name
            FROM sale_lines dl
            JOIN products p ON p.id = dl.product_id
            WHERE dl.sale_id = ?1
            ORDER BY length(dl.id), dl.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(SaleDetail {
            summary,
            lines: lines.into_iter().map(SaleLineDetail::from).collect(),
        }))
    }

    /// The identifier the next sale would get. Reserves nothing.
    pub async fn next_id(&self) -> DbResult<SequentialId> {
        let mut conn = self.pool.acquire().await?;
        self.allocator.peek(&mut conn, IdNamespace::Sale).await
    }

    /// Enables or disables a sale.
    ///
    /// Disabling is refused while dependent records exist. Setting the
    /// status a sale already has is a successful no-op.
    pub async fn set_status(
        &self,
        ctx: &RequestContext,
        id: &str,
        status: SaleStatus,
    ) -> DbResult<GuardedChange> {
        let mut tx = self.pool.begin().await?;
        lock_for_write(&mut tx, id).await?;

        if self.find_visible(&mut *tx, ctx, id).await?.is_none() {
            return Err(DbError::not_found("Sale", id));
        }

        if status == SaleStatus::Disabled {
            let dependents = count_dependents(&mut tx, id).await?;
            if dependents > 0 {
                info!(sale_id = %id, dependents, "Disable blocked by dependent records");
                return Ok(GuardedChange::Blocked { dependents });
            }
        }

        sqlx::query("UPDATE sales SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        info!(sale_id = %id, ?status, "Sale status changed");

        Ok(GuardedChange::Applied)
    }

    /// Deletes a sale and its lines, returning their quantities to stock.
    ///
    /// Refused while dependent records exist.
    pub async fn delete(&self, ctx: &RequestContext, id: &str) -> DbResult<GuardedChange> {
        let mut tx = self.pool.begin().await?;
        lock_for_write(&mut tx, id).await?;

        if self.find_visible(&mut *tx, ctx, id).await?.is_none() {
            return Err(DbError::not_found("Sale", id));
        }

        let dependents = count_dependents(&mut tx, id).await?;
        if dependents > 0 {
            info!(sale_id = %id, dependents, "Delete blocked by dependent records");
            return Ok(GuardedChange::Blocked { dependents });
        }

        let lines: Vec<(String, i64)> =
            sqlx::query_as("SELECT product_id, quantity FROM sale_lines WHERE sale_id = ?1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        for (product_id, quantity) in &lines {
            ProductRepository::restore_stock(&mut tx, product_id, *quantity).await?;
        }

        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        info!(sale_id = %id, lines = lines.len(), "Sale deleted");

        Ok(GuardedChange::Applied)
    }

    async fn find_visible<'e, E>(&self, executor: E, ctx: &RequestContext, id: &str) -> DbResult<Option<SaleSummary>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query
            .push(SALE_COLUMNS)
            .push(SALE_JOINS)
            .push(" WHERE s.id = ")
            .push_bind(id.to_string());
        push_scope(&mut query, ctx);

        let row: Option<SaleRow> = query.build_query_as().fetch_optional(executor).await?;

        row.map(SaleSummary::try_from).transpose()
    }
}

// =============================================================================
// Workflow Steps
// =============================================================================

/// Resolves the client and checks every product, collecting every failure.
async fn resolve_references(
    conn: &mut SqliteConnection,
    request: &ValidatedSale,
) -> Result<ClientRef, SaleError> {
    let mut errors = FieldErrors::new();

    let mut matches = ClientRepository::matching(&mut *conn, &request.client_id).await?;
    let client = match matches.len() {
        1 => matches.pop(),
        0 => {
            errors.push(ValidationError::NotFound {
                field: "client_id".to_string(),
                value: request.client_id.clone(),
            });
            None
        }
        _ => {
            errors.push(ValidationError::InvalidFormat {
                field: "client_id".to_string(),
                reason: "matches both a natural and a legal client".to_string(),
            });
            None
        }
    };

    for (index, line) in request.lines.iter().enumerate() {
        if ProductRepository::stock(&mut *conn, &line.product_id).await?.is_none() {
            errors.push(ValidationError::NotFound {
                field: format!("lines.{index}.product_id"),
                value: line.product_id.clone(),
            });
        }
    }

    match client {
        Some(client) if errors.is_empty() => Ok(client),
        _ => Err(errors.into()),
    }
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total_cents = sale.total_cents, "Inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, created_at, payment_type, term_months,
            principal_cents, tax_cents, total_cents,
            employee_id, branch_id, natural_client_id, legal_client_id, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(sale.created_at)
    .bind(sale.payment_type)
    .bind(sale.term_months)
    .bind(sale.principal_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(&sale.employee_id)
    .bind(&sale.branch_id)
    .bind(sale.client.natural_id())
    .bind(sale.client.legal_id())
    .bind(sale.status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_lines(
    conn: &mut SqliteConnection,
    sale_id: &str,
    line_ids: &[SequentialId],
    request: &ValidatedSale,
    subtotals: &[Money],
) -> DbResult<()> {
    if line_ids.len() != request.lines.len() || subtotals.len() != request.lines.len() {
        return Err(DbError::Internal(format!(
            "expected {} line identifiers and subtotals, got {} and {}",
            request.lines.len(),
            line_ids.len(),
            subtotals.len()
        )));
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "INSERT INTO sale_lines (id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents) ",
    );
    query.push_values(
        line_ids.iter().zip(&request.lines).zip(subtotals),
        |mut row, ((line_id, line), subtotal)| {
            row.push_bind(line_id.to_string())
                .push_bind(sale_id.to_string())
                .push_bind(line.product_id.clone())
                .push_bind(line.quantity)
                .push_bind(line.unit_price.cents())
                .push_bind(subtotal.cents());
        },
    );
    query.build().execute(&mut *conn).await?;

    Ok(())
}

/// No-op write that takes the write lock, waiting up to the busy timeout.
async fn lock_for_write(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE sales SET status = status WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn count_dependents(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE sale_id = ?1")
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

fn push_scope(query: &mut QueryBuilder<'_, Sqlite>, ctx: &RequestContext) {
    if !ctx.is_admin() {
        query
            .push(" AND s.employee_id = ")
            .push_bind(ctx.employee_id.clone())
            .push(" AND s.branch_id = ")
            .push_bind(ctx.branch_id.clone());
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::test_support::{admin, file_db, seed_catalog, staff, test_db};
    use crate::Database;
    use mercantil_core::validation::{validate_sale_request, SaleRequest};
    use serde_json::json;

    fn sale_request(value: serde_json::Value) -> ValidatedSale {
        let request: SaleRequest = serde_json::from_value(value).unwrap();
        validate_sale_request(&request).unwrap()
    }

    fn two_line_sale(client_id: &str) -> ValidatedSale {
        sale_request(json!({
            "client_id": client_id,
            "payment_type": "cash",
            "lines": [
                { "product_id": "PR0001", "quantity": 2, "unit_price": "10.00" },
                { "product_id": "PR0002", "quantity": 1, "unit_price": "5.00" }
            ]
        }))
    }

    async fn row_counts(db: &Database) -> (i64, i64) {
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        (sales, lines)
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    /// `last_value` of the sale and sale line sequences.
    async fn sequences(db: &Database) -> Vec<i64> {
        sqlx::query_scalar("SELECT last_value FROM id_sequences ORDER BY namespace")
            .fetch_all(db.pool())
            .await
            .unwrap()
    }

    async fn exec(db: &Database, sql: &str) {
        sqlx::query(sql).execute(db.pool()).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_two_line_cash_sale() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let sale = db.sales().create(&staff(), &two_line_sale("CN0001")).await.unwrap();

        assert_eq!(sale.id, "VT0001");
        assert_eq!(sale.principal().to_decimal_string(), "25.00");
        assert_eq!(sale.tax().to_decimal_string(), "3.50");
        assert_eq!(sale.total().to_decimal_string(), "28.50");
        assert_eq!(sale.payment_type, PaymentType::Cash);
        assert_eq!(sale.term_months, None);
        assert_eq!(sale.client, ClientRef::Natural("CN0001".to_string()));

        assert_eq!(stock_of(&db, "PR0001").await, 18);
        assert_eq!(stock_of(&db, "PR0002").await, 4);

        let detail = db.sales().detail(&admin(), "VT0001").await.unwrap().unwrap();
        let line_ids: Vec<&str> = detail.lines.iter().map(|l| l.line.id.as_str()).collect();
        assert_eq!(line_ids, vec!["DV0001", "DV0002"]);

        let sum: i64 = detail.lines.iter().map(|l| l.line.subtotal_cents).sum();
        assert_eq!(sum, detail.summary.sale.principal_cents);
        assert_eq!(detail.summary.client_name, "Ana Lucía Rivas");
        assert_eq!(detail.lines[0].product_name, "Tornillo 1/4");
    }

    #[tokio::test]
    async fn test_credit_sale_for_legal_client() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let request = sale_request(json!({
            "client_id": "CJ0001",
            "payment_type": "Crédito",
            "term_months": 6,
            "lines": [{ "product_id": "PR0003", "quantity": 1, "unit_price": 80 }]
        }));
        let sale = db.sales().create(&staff(), &request).await.unwrap();

        assert_eq!(sale.payment_type, PaymentType::Credit);
        assert_eq!(sale.term_months, Some(6));
        assert_eq!(sale.client, ClientRef::Legal("CJ0001".to_string()));
        assert_eq!(sale.total_cents, 8000 + 1120);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let request = sale_request(json!({
            "client_id": "CN0001",
            "payment_type": "cash",
            "lines": [
                { "product_id": "PR0001", "quantity": 2, "unit_price": "10.00" },
                { "product_id": "PR0002", "quantity": 6, "unit_price": "5.00" }
            ]
        }));
        let err = db.sales().create(&staff(), &request).await.unwrap_err();

        match err {
            SaleError::Rejected(CoreError::InsufficientStock {
                product_id,
                line,
                available,
                requested,
            }) => {
                assert_eq!(product_id, "PR0002");
                assert_eq!(line, 1);
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("expected insufficient stock, got {other:?}"),
        }

        // The first line's decrement did not survive.
        assert_eq!(stock_of(&db, "PR0001").await, 20);
        assert_eq!(stock_of(&db, "PR0002").await, 5);
        assert_eq!(row_counts(&db).await, (0, 0));

        // No identifier was consumed.
        assert_eq!(db.sales().next_id().await.unwrap().to_string(), "VT0001");
    }

    #[tokio::test]
    async fn test_repeated_product_sees_reduced_stock() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let request = sale_request(json!({
            "client_id": "CN0001",
            "payment_type": "cash",
            "lines": [
                { "product_id": "PR0002", "quantity": 3, "unit_price": "5.00" },
                { "product_id": "PR0002", "quantity": 3, "unit_price": "5.00" }
            ]
        }));
        let err = db.sales().create(&staff(), &request).await.unwrap_err();

        assert!(matches!(
            err,
            SaleError::Rejected(CoreError::InsufficientStock { line: 1, available: 2, .. })
        ));
        assert_eq!(stock_of(&db, "PR0002").await, 5);
    }

    #[tokio::test]
    async fn test_unknown_client_and_products_reported_per_field() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let request = sale_request(json!({
            "client_id": "XX0001",
            "payment_type": "cash",
            "lines": [
                { "product_id": "PR0001", "quantity": 1, "unit_price": "1.00" },
                { "product_id": "PR9999", "quantity": 1, "unit_price": "1.00" }
            ]
        }));
        let err = db.sales().create(&staff(), &request).await.unwrap_err();

        let SaleError::Rejected(CoreError::Validation(errors)) = err else {
            panic!("expected validation errors");
        };
        let fields = errors.by_field();
        assert!(fields.contains_key("client_id"));
        assert!(fields.contains_key("lines.1.product_id"));
        assert!(!fields.contains_key("lines.0.product_id"));

        assert_eq!(stock_of(&db, "PR0001").await, 20);
        assert_eq!(row_counts(&db).await, (0, 0));
    }

    #[tokio::test]
    async fn test_identifiers_are_sequential_and_never_collide() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let sales = db.sales();

        assert_eq!(sales.next_id().await.unwrap().to_string(), "VT0001");
        let first = sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();
        assert_eq!(sales.next_id().await.unwrap().to_string(), "VT0002");
        let second = sales.create(&staff(), &two_line_sale("CJ0001")).await.unwrap();

        assert_eq!(first.id, "VT0001");
        assert_eq!(second.id, "VT0002");

        let line_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM sale_lines ORDER BY id")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(line_ids, vec!["DV0001", "DV0002", "DV0003", "DV0004"]);
    }

    #[tokio::test]
    async fn test_listing_filters_and_scope() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let sales = db.sales();

        sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();
        let credit = sale_request(json!({
            "client_id": "CJ0001",
            "payment_type": "credit",
            "term_months": 3,
            "lines": [{ "product_id": "PR0003", "quantity": 1, "unit_price": "80.00" }]
        }));
        sales.create(&staff(), &credit).await.unwrap();

        let mut other_branch = staff();
        other_branch.employee_id = "EM0002".to_string();
        other_branch.branch_id = "SU0002".to_string();
        sales.create(&other_branch, &two_line_sale("CN0002")).await.unwrap();

        let all = sales.list(&admin(), SaleFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["VT0003", "VT0002", "VT0001"]);

        let mine = sales.list(&staff(), SaleFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|s| s.sale.branch_id == "SU0001"));

        let credit_only = SaleFilter {
            payment: PaymentFilter::Only(PaymentType::Credit),
            client: ClientFilter::All,
        };
        let listed = sales.list(&admin(), credit_only).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].client_name, "Constructora Ágil");

        let natural_only = SaleFilter {
            payment: PaymentFilter::All,
            client: ClientFilter::Only(ClientKind::Natural),
        };
        let listed = sales.list(&admin(), natural_only).await.unwrap();
        assert_eq!(listed.len(), 2);

        // Reads are idempotent.
        assert_eq!(sales.list(&admin(), SaleFilter::default()).await.unwrap(), all);
    }

    #[tokio::test]
    async fn test_staff_cannot_see_other_branch_sale() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let mut other_branch = staff();
        other_branch.employee_id = "EM0002".to_string();
        other_branch.branch_id = "SU0002".to_string();
        db.sales().create(&other_branch, &two_line_sale("CN0001")).await.unwrap();

        assert!(db.sales().detail(&staff(), "VT0001").await.unwrap().is_none());
        assert!(matches!(
            db.sales().delete(&staff(), "VT0001").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_disable_and_enable() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let sales = db.sales();
        sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();

        let change = sales.set_status(&staff(), "VT0001", SaleStatus::Disabled).await.unwrap();
        assert_eq!(change, GuardedChange::Applied);
        let detail = sales.detail(&staff(), "VT0001").await.unwrap().unwrap();
        assert_eq!(detail.summary.sale.status, SaleStatus::Disabled);

        sales.set_status(&staff(), "VT0001", SaleStatus::Active).await.unwrap();
        let detail = sales.detail(&staff(), "VT0001").await.unwrap().unwrap();
        assert_eq!(detail.summary.sale.status, SaleStatus::Active);
    }

    #[tokio::test]
    async fn test_dependents_block_disable_and_delete() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let sales = db.sales();
        sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();

        sqlx::query(
            "INSERT INTO assets (id, name, price_cents, acquired_on, useful_life_years, department_id, sale_id) \
             VALUES ('AC0100', 'Taladro', 50000, '2024-03-01', 5, 'DP0001', 'VT0001')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        assert_eq!(
            sales.set_status(&staff(), "VT0001", SaleStatus::Disabled).await.unwrap(),
            GuardedChange::Blocked { dependents: 1 }
        );
        assert_eq!(
            sales.delete(&staff(), "VT0001").await.unwrap(),
            GuardedChange::Blocked { dependents: 1 }
        );
        assert_eq!(row_counts(&db).await, (1, 2));
        let detail = sales.detail(&staff(), "VT0001").await.unwrap().unwrap();
        assert_eq!(detail.summary.sale.status, SaleStatus::Active);
    }

    #[tokio::test]
    async fn test_delete_restores_stock() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let sales = db.sales();
        sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();
        assert_eq!(stock_of(&db, "PR0001").await, 18);

        assert_eq!(sales.delete(&staff(), "VT0001").await.unwrap(), GuardedChange::Applied);

        assert_eq!(row_counts(&db).await, (0, 0));
        assert_eq!(stock_of(&db, "PR0001").await, 20);
        assert_eq!(stock_of(&db, "PR0002").await, 5);
    }

    #[tokio::test]
    async fn test_unknown_sale_is_not_found() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        assert!(db.sales().detail(&admin(), "VT0404").await.unwrap().is_none());
        assert!(matches!(
            db.sales().set_status(&admin(), "VT0404", SaleStatus::Disabled).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_client_in_both_tables_is_rejected() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        exec(&db, "INSERT INTO legal_clients (id, company_name) VALUES ('CN0001', 'Rivas Importaciones')").await;

        let err = db.sales().create(&staff(), &two_line_sale("CN0001")).await.unwrap_err();

        let SaleError::Rejected(CoreError::Validation(errors)) = err else {
            panic!("expected validation errors, got {err:?}");
        };
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.iter().next(),
            Some(ValidationError::InvalidFormat { field, .. }) if field == "client_id"
        ));

        assert_eq!(stock_of(&db, "PR0001").await, 20);
        assert_eq!(stock_of(&db, "PR0002").await, 5);
        assert_eq!(row_counts(&db).await, (0, 0));
        assert_eq!(sequences(&db).await, vec![0, 0]);
    }

    #[tokio::test]
    async fn test_failed_line_insert_rolls_back_the_whole_sale() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        // A stored line already holds DV0002, the second id the next sale gets.
        exec(
            &db,
            "INSERT INTO sales (id, created_at, payment_type, principal_cents, tax_cents, total_cents, \
                employee_id, branch_id, natural_client_id) \
             VALUES ('VT0900', '2025-01-10T09:00:00Z', 'cash', 7000, 980, 7980, 'EM0001', 'SU0001', 'CN0002')",
        )
        .await;
        exec(
            &db,
            "INSERT INTO sale_lines (id, sale_id, product_id, quantity, unit_price_cents, subtotal_cents) \
             VALUES ('DV0002', 'VT0900', 'PR0003', 1, 7000, 7000)",
        )
        .await;

        let err = db.sales().create(&staff(), &two_line_sale("CN0001")).await.unwrap_err();

        match err {
            SaleError::Database(DbError::UniqueViolation { constraint }) => {
                assert_eq!(constraint, "sale_lines.id");
            }
            other => panic!("expected a duplicate line id, got {other:?}"),
        }

        // The sale row and both stock decrements were undone.
        assert_eq!(row_counts(&db).await, (1, 1));
        assert_eq!(stock_of(&db, "PR0001").await, 20);
        assert_eq!(stock_of(&db, "PR0002").await, 5);
        assert_eq!(sequences(&db).await, vec![0, 0]);
        assert!(db.sales().detail(&admin(), "VT0001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_past_four_digits_keep_numeric_order() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        exec(&db, "UPDATE id_sequences SET last_value = 9998").await;
        let sales = db.sales();

        let first = sales.create(&staff(), &two_line_sale("CN0001")).await.unwrap();
        let second = sales.create(&staff(), &two_line_sale("CN0002")).await.unwrap();
        assert_eq!(first.id, "VT9999");
        assert_eq!(second.id, "VT10000");

        // Same timestamp, so only the id decides the order.
        exec(&db, "UPDATE sales SET created_at = (SELECT MIN(created_at) FROM sales)").await;

        let listed = sales.list(&admin(), SaleFilter::default()).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|s| s.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["VT10000", "VT9999"]);

        let detail = sales.detail(&admin(), "VT9999").await.unwrap().unwrap();
        let line_ids: Vec<&str> = detail.lines.iter().map(|l| l.line.id.as_str()).collect();
        assert_eq!(line_ids, vec!["DV9999", "DV10000"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_never_oversell() {
        let temp = file_db(8).await;
        let db = temp.db.clone();
        seed_catalog(db.pool()).await;

        // PR0002 has 5 units; every attempt takes one of them.
        let request = sale_request(json!({
            "client_id": "CN0001",
            "payment_type": "cash",
            "lines": [
                { "product_id": "PR0002", "quantity": 1, "unit_price": "12.00" },
                { "product_id": "PR0001", "quantity": 1, "unit_price": "5.00" }
            ]
        }));

        let attempts: Vec<_> = (0..12)
            .map(|_| {
                let sales = db.sales();
                let request = request.clone();
                tokio::spawn(async move { sales.create(&staff(), &request).await })
            })
            .collect();

        let mut created = Vec::new();
        let mut short = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(sale) => created.push(sale.id),
                Err(SaleError::Rejected(CoreError::InsufficientStock { product_id, .. })) => {
                    assert_eq!(product_id, "PR0002");
                    short += 1;
                }
                Err(other) => panic!("unexpected failure: {other:?}"),
            }
        }

        assert_eq!(created.len(), 5);
        assert_eq!(short, 7);
        assert_eq!(stock_of(&db, "PR0002").await, 0);
        assert_eq!(stock_of(&db, "PR0001").await, 15);

        // Rejected attempts consumed no numbers.
        created.sort();
        assert_eq!(created, vec!["VT0001", "VT0002", "VT0003", "VT0004", "VT0005"]);

        let line_ids: Vec<String> = sqlx::query_scalar("SELECT id FROM sale_lines")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(line_ids.len(), 10);
        assert_eq!(line_ids.iter().collect::<HashSet<_>>().len(), 10);
        assert_eq!(sequences(&db).await, vec![5, 10]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_status_changes_and_deletes() {
        let temp = file_db(8).await;
        let db = temp.db.clone();
        seed_catalog(db.pool()).await;

        let one_screw = sale_request(json!({
            "client_id": "CN0001",
            "payment_type": "cash",
            "lines": [{ "product_id": "PR0001", "quantity": 1, "unit_price": "5.00" }]
        }));
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(db.sales().create(&staff(), &one_screw).await.unwrap().id);
        }
        assert_eq!(stock_of(&db, "PR0001").await, 16);

        let toggles: Vec<_> = (0..16)
            .map(|i| {
                let sales = db.sales();
                let id = ids[i % ids.len()].clone();
                let status = if (i / ids.len()) % 2 == 0 {
                    SaleStatus::Disabled
                } else {
                    SaleStatus::Active
                };
                tokio::spawn(async move { sales.set_status(&staff(), &id, status).await })
            })
            .collect();
        for toggle in toggles {
            assert_eq!(toggle.await.unwrap().unwrap(), GuardedChange::Applied);
        }

        // Every sale is deleted twice at once; one of each pair wins.
        let deletes: Vec<_> = ids
            .iter()
            .chain(ids.iter())
            .map(|id| {
                let sales = db.sales();
                let id = id.clone();
                tokio::spawn(async move { sales.delete(&staff(), &id).await })
            })
            .collect();

        let mut applied = 0;
        let mut missing = 0;
        for delete in deletes {
            match delete.await.unwrap() {
                Ok(GuardedChange::Applied) => applied += 1,
                Err(DbError::NotFound { .. }) => missing += 1,
                other => panic!("unexpected delete outcome: {other:?}"),
            }
        }

        assert_eq!((applied, missing), (4, 4));
        assert_eq!(row_counts(&db).await, (0, 0));
        assert_eq!(stock_of(&db, "PR0001").await, 20);
    }
}
