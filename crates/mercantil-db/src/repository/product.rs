//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Two Views of Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock (maintained column)                                     │
//! │    Read and decremented by the sale workflow, restored when a sale is  │
//! │    deleted. Guarded by CHECK (stock >= 0).                             │
//! │                                                                         │
//! │  derived stock (search results)                                         │
//! │    Σ purchase_lines.quantity − Σ sale_lines.quantity                   │
//! │    with sale price = average purchase cost + 10%                       │
//! │                                                                         │
//! │  User types: "torn"                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  name LIKE %torn%  OR  id LIKE %torn%  OR  id LIKE %<first token>%    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PR0003 | Tornillo 1/4 | stock 40 | 0.55                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use mercantil_core::{Money, Product, ProductListing, SALE_PRICE_MARKUP_BPS};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{contains_pattern, first_token};
use crate::error::DbResult;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    is_active: bool,
    stock: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            stock: row.stock,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: String,
    name: String,
    is_active: bool,
    stock: i64,
    purchased_quantity: i64,
    purchased_cost_cents: i64,
}

impl From<ListingRow> for ProductListing {
    fn from(row: ListingRow) -> Self {
        let sale_price = Money::from_cents(row.purchased_cost_cents)
            .average_with_markup(row.purchased_quantity, SALE_PRICE_MARKUP_BPS)
            .unwrap_or_default();

        ProductListing {
            id: row.id,
            name: row.name,
            is_active: row.is_active,
            stock: row.stock,
            sale_price_cents: sale_price.cents(),
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// // Products that can be sold right now
/// let results = repo.search("torn", 20).await?;
///
/// // Get by ID
/// let product = repo.get_by_id("PR0003").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products that still have derived stock.
    ///
    /// ## Arguments
    /// * `query` - Trimmed search text; empty matches every product
    /// * `limit` - Maximum results to return
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<ProductListing>> {
        debug!(query = %query, limit = %limit, "Searching products");

        let rows: Vec<ListingRow> = sqlx::query_as(
            r#"
            SELECT
                p.id,
                p.name,
                p.is_active,
                COALESCE(bought.quantity, 0) - COALESCE(sold.quantity, 0) AS stock,
                COALESCE(bought.quantity, 0) AS purchased_quantity,
                COALESCE(bought.cost_cents, 0) AS purchased_cost_cents
            FROM products p
            LEFT JOIN (
                SELECT product_id,
                       SUM(quantity) AS quantity,
                       SUM(quantity * unit_cost_cents) AS cost_cents
                FROM purchase_lines
                GROUP BY product_id
            ) bought ON bought.product_id = p.id
            LEFT JOIN (
                SELECT product_id, SUM(quantity) AS quantity
                FROM sale_lines
                GROUP BY product_id
            ) sold ON sold.product_id = p.id
            WHERE p.is_active = 1
              AND COALESCE(bought.quantity, 0) - COALESCE(sold.quantity, 0) > 0
              AND (
                    p.name LIKE ?1 ESCAPE '\'
                 OR p.id LIKE ?1 ESCAPE '\'
                 OR p.id LIKE ?2 ESCAPE '\'
              )
            ORDER BY p.name ASC
            LIMIT ?3
            "#,
        )
        .bind(contains_pattern(query))
        .bind(contains_pattern(first_token(query)))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Product search complete");

        Ok(rows.into_iter().map(ProductListing::from).collect())
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as("SELECT id, name, is_active, stock FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Product::from))
    }

    /// Reads the maintained stock of a product. `None` if it does not exist.
    pub async fn stock(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(stock)
    }

    /// Removes `quantity` units from stock if at least that many remain.
    ///
    /// Returns `false` and changes nothing when stock is short.
    pub async fn take_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Decrementing stock");

        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2",
        )
        .bind(id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Puts `quantity` units back into stock.
    pub async fn restore_stock(conn: &mut SqliteConnection, id: &str, quantity: i64) -> DbResult<()> {
        debug!(id = %id, quantity = %quantity, "Restoring stock");

        sqlx::query("UPDATE products SET stock = stock + ?2 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_catalog, test_db};

    #[tokio::test]
    async fn test_search_derives_stock_and_price() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let results = db.products().search("Tornillo", 20).await.unwrap();
        assert_eq!(results.len(), 1);

        let screw = &results[0];
        assert_eq!(screw.id, "PR0001");
        // 10 bought @ 5.00 and 10 @ 5.00 → avg 5.00 → +10% = 5.50
        assert_eq!(screw.sale_price_cents, 550);
        assert_eq!(screw.stock, 20);
    }

    #[tokio::test]
    async fn test_search_by_id_token() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let results = db.products().search("PR0002 martillo", 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "PR0002");
    }

    #[tokio::test]
    async fn test_search_hides_products_without_stock() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        // PR0004 was never purchased; PR0005 is inactive.
        let ids: Vec<String> = db
            .products()
            .search("", 50)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["PR0002", "PR0003", "PR0001"]);
    }

    #[tokio::test]
    async fn test_search_is_idempotent() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;

        let first = db.products().search("o", 20).await.unwrap();
        let second = db.products().search("o", 20).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_take_stock_refuses_to_go_negative() {
        let db = test_db().await;
        seed_catalog(db.pool()).await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(ProductRepository::take_stock(&mut conn, "PR0002", 3).await.unwrap());
        assert!(!ProductRepository::take_stock(&mut conn, "PR0002", 3).await.unwrap());
        assert_eq!(ProductRepository::stock(&mut conn, "PR0002").await.unwrap(), Some(2));

        ProductRepository::restore_stock(&mut conn, "PR0002", 3).await.unwrap();
        assert_eq!(ProductRepository::stock(&mut conn, "PR0002").await.unwrap(), Some(5));
        assert_eq!(ProductRepository::stock(&mut conn, "NOPE").await.unwrap(), None);
    }
}
