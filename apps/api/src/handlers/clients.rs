//! # Client Handlers

use axum::extract::{Query, State};
use axum::Json;
use mercantil_core::validation::validate_search_query;
use mercantil_core::ClientSummary;

use super::SearchParams;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::AppState;

/// `GET /api/clients?q=`: active natural and legal clients, by name.
pub async fn search_clients(
    State(state): State<AppState>,
    Caller(_): Caller,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ClientSummary>>, ApiError> {
    let query = validate_search_query(params.q.as_deref().unwrap_or_default())?;
    let clients = state.db.clients().search(&query, params.limit()).await?;
    Ok(Json(clients))
}
