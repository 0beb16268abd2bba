//! # Report Handlers
//!
//! ## Depreciation Export
//! ```text
//! POST /api/reports/depreciation { kind, company_id, branch_id?, department_id?, sale_id? }
//!      │
//!      ▼
//! DepreciationSource::depreciation_rows()
//!      │
//!      ├── no rows ──► 200 { type: "info", message }
//!      ▼
//! DepreciationSource::company_name()  (header, "Unknown company" if absent)
//!      │
//!      ▼
//! DepreciationReport::new()  (totals)
//!      │
//!      ▼
//! DocumentRenderer::render(kind.template(), report)
//!      │
//!      ▼
//! 200 { type: "success", filename, content_type, document: <base64> }
//! ```

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{NaiveDate, Utc};
use mercantil_core::report::{DepreciationKind, DepreciationQuery, DepreciationReport};
use mercantil_core::{FieldErrors, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Notice, NoticeKind};
use crate::auth::Caller;
use crate::error::{ApiError, ErrorCode};
use crate::AppState;

/// Header name used when the company does not exist.
pub const UNKNOWN_COMPANY: &str = "Unknown company";

/// Body of `POST /api/reports/depreciation`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepreciationRequest {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub sale_id: Option<String>,
    /// Defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    pub filename: String,
    pub content_type: String,
    /// Base64 of the document bytes.
    pub document: String,
}

impl DepreciationRequest {
    fn into_query(self, today: NaiveDate) -> Result<DepreciationQuery, FieldErrors> {
        let mut errors = FieldErrors::new();

        let kind = match non_empty(self.kind) {
            Some(token) => DepreciationKind::from_str(&token).map_err(|e| errors.push(e)).ok(),
            None => {
                errors.push(ValidationError::Required {
                    field: "kind".to_string(),
                });
                None
            }
        };

        let company_id = non_empty(self.company_id);
        if company_id.is_none() {
            errors.push(ValidationError::Required {
                field: "company_id".to_string(),
            });
        }

        match (kind, company_id) {
            (Some(kind), Some(company_id)) if errors.is_empty() => Ok(DepreciationQuery {
                kind,
                company_id,
                branch_id: non_empty(self.branch_id),
                department_id: non_empty(self.department_id),
                sale_id: non_empty(self.sale_id),
                as_of: self.as_of.unwrap_or(today),
            }),
            _ => Err(errors),
        }
    }
}

/// Form selects send `""` for "any".
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds and renders the depreciation report.
pub async fn depreciation_report(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    payload: Result<Json<DepreciationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let today = Utc::now().date_naive();
    let query = request.into_query(today)?;

    debug!(employee_id = %ctx.employee_id, company_id = %query.company_id, kind = ?query.kind, "Building depreciation report");

    let rows = state.depreciation.depreciation_rows(&query).await?;
    if rows.is_empty() {
        return Ok(Json(Notice::info("There are no records to generate the report")).into_response());
    }

    let company_name = state
        .depreciation
        .company_name(&query.company_id)
        .await?
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

    let report = DepreciationReport::new(query.kind, company_name, today, rows);
    let document = state
        .renderer
        .render(query.kind.template(), &report)
        .await
        .map_err(|e| ApiError::internal(ErrorCode::Internal, "Failed to render the report", e.to_string()))?;

    info!(
        company_id = %query.company_id,
        rows = report.totals.rows,
        bytes = document.bytes.len(),
        "Depreciation report rendered"
    );

    Ok(Json(ReportDocument {
        kind: NoticeKind::Success,
        filename: document.filename,
        content_type: document.content_type.to_string(),
        document: STANDARD.encode(&document.bytes),
    })
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_request_defaults_and_blank_filters() {
        let request = DepreciationRequest {
            kind: Some("mensual".to_string()),
            company_id: Some("CO0001".to_string()),
            branch_id: Some("".to_string()),
            ..DepreciationRequest::default()
        };

        let query = request.into_query(today()).unwrap();
        assert_eq!(query.kind, DepreciationKind::Monthly);
        assert_eq!(query.branch_id, None);
        assert_eq!(query.as_of, today());
    }

    #[test]
    fn test_request_errors_per_field() {
        let request = DepreciationRequest {
            kind: Some("weekly".to_string()),
            ..DepreciationRequest::default()
        };

        let fields = request.into_query(today()).unwrap_err().by_field();
        assert!(fields.contains_key("kind"));
        assert!(fields.contains_key("company_id"));
    }
}
