//! # Sale Handlers
//!
//! ## Create Flow
//! ```text
//! POST /api/sales { client_id, payment_type, term_months?, lines: [...] }
//!      │
//!      ├── body is not a JSON object ──► 400
//!      ▼
//! validate_sale_request()  ── missing / mistyped / out of range fields
//!      │                      ──► 422 { errors: { "lines.1.quantity": [...] } }
//!      │
//!      ▼
//! SaleRepository::create() ── one transaction ──┬─► 201 { type: "success", sale }
//!                                               ├─► 422 unknown client/product, short stock
//!                                               └─► 500 database failure
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use mercantil_core::validation::{validate_sale_request, SaleRequest};
use mercantil_core::{ClientFilter, PaymentFilter, Sale, SaleDetail, SaleFilter, SaleStatus, SaleSummary};
use mercantil_db::GuardedChange;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Notice, NoticeKind};
use crate::auth::Caller;
use crate::error::ApiError;
use crate::AppState;

/// Body of a successful `POST /api/sales`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCreated {
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    pub message: String,
    pub sale: Sale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextSaleId {
    pub id: String,
}

/// Creates a sale.
pub async fn create_sale(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    payload: Result<Json<SaleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleCreated>), ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let validated = validate_sale_request(&request).map_err(|errors| {
        warn!(employee_id = %ctx.employee_id, errors = errors.len(), "Sale request invalid");
        ApiError::from(errors)
    })?;

    let sale = state.db.sales().create(&ctx, &validated).await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleCreated {
            kind: NoticeKind::Success,
            message: format!("Sale {} registered", sale.id),
            sale,
        }),
    ))
}

/// Lists every sale visible to the caller.
pub async fn list_sales(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<SaleSummary>>, ApiError> {
    let sales = state.db.sales().list(&ctx, SaleFilter::default()).await?;
    Ok(Json(sales))
}

/// Lists sales filtered by payment and client tokens.
pub async fn filter_sales(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path((payment, client)): Path<(String, String)>,
) -> Result<Json<Vec<SaleSummary>>, ApiError> {
    debug!(payment = %payment, client = %client, "Filtering sales");

    let filter = SaleFilter {
        payment: payment.parse::<PaymentFilter>().map_err(ApiError::invalid_filter)?,
        client: client.parse::<ClientFilter>().map_err(ApiError::invalid_filter)?,
    };

    let sales = state.db.sales().list(&ctx, filter).await?;
    Ok(Json(sales))
}

/// Gets one sale with its lines.
pub async fn sale_detail(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<SaleDetail>, ApiError> {
    state
        .db
        .sales()
        .detail(&ctx, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale", &id))
}

/// Preview of the id the next sale will get.
pub async fn next_id(State(state): State<AppState>, Caller(_): Caller) -> Result<Json<NextSaleId>, ApiError> {
    let id = state.db.sales().next_id().await?;
    Ok(Json(NextSaleId { id: id.to_string() }))
}

pub async fn enable_sale(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<Notice>, ApiError> {
    let outcome = state.db.sales().set_status(&ctx, &id, SaleStatus::Active).await?;
    Ok(Json(notice(outcome, "The sale has been enabled", "enabled")))
}

pub async fn disable_sale(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<Notice>, ApiError> {
    let outcome = state.db.sales().set_status(&ctx, &id, SaleStatus::Disabled).await?;
    Ok(Json(notice(outcome, "The sale has been disabled", "disabled")))
}

/// Deletes a sale unless other records depend on it.
pub async fn delete_sale(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<Json<Notice>, ApiError> {
    let outcome = state.db.sales().delete(&ctx, &id).await?;
    Ok(Json(notice(outcome, "The sale has been deleted", "deleted")))
}

fn notice(outcome: GuardedChange, applied: &str, verb: &str) -> Notice {
    match outcome {
        GuardedChange::Applied => Notice::success(applied),
        GuardedChange::Blocked { dependents } => Notice::blocked(format!(
            "The sale cannot be {} because {} associated record(s) depend on it",
            verb, dependents
        )),
    }
}
