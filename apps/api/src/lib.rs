//! # Mercantil API
//!
//! JSON HTTP API over the Mercantil sales back office.
//!
//! ## Routes
//! ```text
//! GET    /api/health                               liveness, no token
//! POST   /api/sales                                create a sale
//! GET    /api/sales                                list visible sales
//! GET    /api/sales/filter/{payment}/{client}      filtered listing
//! GET    /api/sales/next-id                        next sale id preview
//! GET    /api/sales/{id}                           sale detail with lines
//! DELETE /api/sales/{id}                           guarded delete
//! POST   /api/sales/{id}/enable                    re-enable
//! POST   /api/sales/{id}/disable                   guarded disable
//! GET    /api/clients?q=                           client search
//! GET    /api/products?q=                          product search
//! POST   /api/reports/depreciation                 depreciation report export
//! ```
//!
//! Every route except health requires `Authorization: Bearer <jwt>`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod render;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use mercantil_db::{Database, DepreciationSource};

use crate::auth::JwtManager;
use crate::config::ApiConfig;
use crate::handlers::{clients, products, reports, sales};
use crate::render::{CsvRenderer, DocumentRenderer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub depreciation: Arc<dyn DepreciationSource>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub expose_error_details: bool,
}

impl AppState {
    /// State with the bundled SQLite report source and CSV renderer.
    pub fn new(db: Database, config: &ApiConfig) -> Self {
        AppState {
            depreciation: Arc::new(db.reports()),
            db,
            jwt: Arc::new(JwtManager::new(&config.jwt_secret)),
            renderer: Arc::new(CsvRenderer),
            expose_error_details: config.expose_error_details,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_depreciation_source(mut self, source: Arc<dyn DepreciationSource>) -> Self {
        self.depreciation = source;
        self
    }
}

/// Builds the router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/sales", get(sales::list_sales).post(sales::create_sale))
        .route("/api/sales/next-id", get(sales::next_id))
        .route("/api/sales/filter/:payment/:client", get(sales::filter_sales))
        .route("/api/sales/:id", get(sales::sale_detail).delete(sales::delete_sale))
        .route("/api/sales/:id/enable", post(sales::enable_sale))
        .route("/api/sales/:id/disable", post(sales::disable_sale))
        .route("/api/clients", get(clients::search_clients))
        .route("/api/products", get(products::search_products))
        .route("/api/reports/depreciation", post(reports::depreciation_report))
        .layer(middleware::from_fn_with_state(state.clone(), error::attach_error_details))
        .with_state(state)
}
