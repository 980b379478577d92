pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::config::ApiConfig;
use crate::service::BookkeepingService;

pub use handlers::*;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BookkeepingService>,
    pub api: ApiConfig,
}

impl AppState {
    pub fn new(service: Arc<BookkeepingService>, api: ApiConfig) -> Self {
        Self { service, api }
    }
}

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status))
        .route("/test", get(handlers::status))
        .route(
            "/invoices",
            post(handlers::create_invoice).get(handlers::list_invoices),
        )
        .route(
            "/bank-transactions",
            post(handlers::create_bank_transaction).get(handlers::list_bank_transactions),
        )
        .route("/match", post(handlers::run_match))
        .route("/matches", get(handlers::list_matches))
        .route("/matches/export", get(handlers::export_matches))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}
