//! # HTTP Handlers
//!
//! One module per resource. Handlers translate HTTP into repository calls
//! and back, nothing more; every rule lives in `mercantil-core` or
//! `mercantil-db`.
//!
//! ```text
//! handlers/
//! ├── sales.rs     create, list, filter, detail, next id, enable/disable, delete
//! ├── clients.rs   unified client search
//! ├── products.rs  sellable product search
//! └── reports.rs   depreciation report export
//! ```

pub mod clients;
pub mod products;
pub mod reports;
pub mod sales;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Kind of acknowledgment shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    /// A guarded operation was refused; nothing changed.
    Blocked,
    Info,
}

/// `{ "type": "...", "message": "..." }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Blocked,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// Query string of the search endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Results returned when no limit is given.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Upper bound of `limit`.
pub const MAX_SEARCH_LIMIT: u32 = 100;

impl SearchParams {
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe. Needs no token.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let status = if state.db.health_check().await { "ok" } else { "degraded" };
    Json(Health {
        status,
        version: env!("CARGO_PKG_VERSION"),
    })
}
