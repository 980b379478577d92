use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::db::StoreStatus;
use crate::error::AppError;
use crate::models::{BankTransaction, Invoice, Match, MatchProposal, Stored};

/// 列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

impl ListParams {
    /// 不超过配置上限
    fn resolve(&self, cap: usize) -> usize {
        self.limit.map_or(cap, |l| l.min(cap))
    }
}

/// 创建响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
    pub status: String,
}

impl CreatedResponse {
    fn new(id: String) -> Self {
        Self {
            id,
            status: "created".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub store: StoreStatus,
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Bookkeeping Automation API running" }))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 服务与存储状态
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "running",
        store: state.service.status().await,
    })
}

pub async fn create_invoice(
    State(state): State<AppState>,
    payload: Result<Json<Invoice>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let Json(invoice) = payload?;
    let id = state.service.submit_invoice(invoice).await?;
    Ok(Json(CreatedResponse::new(id)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Stored<Invoice>>>, AppError> {
    let limit = params.resolve(state.api.invoice_list_limit);
    Ok(Json(state.service.list_invoices(limit).await?))
}

pub async fn create_bank_transaction(
    State(state): State<AppState>,
    payload: Result<Json<BankTransaction>, JsonRejection>,
) -> Result<Json<CreatedResponse>, AppError> {
    let Json(txn) = payload?;
    let id = state.service.submit_transaction(txn).await?;
    Ok(Json(CreatedResponse::new(id)))
}

pub async fn list_bank_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Stored<BankTransaction>>>, AppError> {
    let limit = params.resolve(state.api.transaction_list_limit);
    Ok(Json(state.service.list_transactions(limit).await?))
}

/// 触发一次对账, 返回匹配建议
pub async fn run_match(
    State(state): State<AppState>,
) -> Result<Json<Vec<MatchProposal>>, AppError> {
    let (proposals, stats) = state.service.reconcile().await?;
    tracing::info!(
        "Match request done: {} proposals, {} invoices unmatched",
        stats.proposed, stats.unmatched
    );
    Ok(Json(proposals))
}

pub async fn list_matches(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Match>>, AppError> {
    let limit = params.resolve(state.api.match_list_limit);
    Ok(Json(state.service.list_matches(limit).await?))
}

/// 导出已持久化的匹配 (CSV)
pub async fn export_matches(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let limit = params.resolve(state.api.match_list_limit);
    let body = state.service.export_matches_csv(limit).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"matches.csv\""),
        ],
        body,
    )
        .into_response())
}
