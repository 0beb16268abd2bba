//! # Product Handlers
//!
//! ```text
//! GET /api/products?q=torn
//!      │
//!      ▼
//! active, derived stock > 0, name/id contains "torn"
//!      │
//!      ▼
//! [{ id, name, stock, sale_price_cents }]   ordered by name
//! ```

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use mercantil_core::validation::validate_search_query;
use mercantil_core::ProductListing;
use tracing::debug;

use super::SearchParams;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::AppState;

/// Searches products that can be sold right now.
pub async fn search_products(
    State(state): State<AppState>,
    Caller(_): Caller,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ProductListing>>, ApiError> {
    let start = Instant::now();
    let query = validate_search_query(params.q.as_deref().unwrap_or_default())?;

    let products = state.db.products().search(&query, params.limit()).await?;

    debug!(
        query = %query,
        results = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Product search served"
    );

    Ok(Json(products))
}
