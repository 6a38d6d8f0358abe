use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::Lancamento;
use crate::error::RdoError;
use crate::middleware::AuthUser;
use crate::router::RdoState;
use crate::service::category_migration::{self, BulkUpdateReport};
use crate::service::csv_import::{self, ImportSummary};
use crate::types::payloads::{
    BulkCategoryRequest, ImportRequest, LancamentoFilter, LancamentoInput,
};

/// Cached client views that change after entries are written in bulk.
const INVALIDATE_AFTER_IMPORT: [&str; 2] = ["dashboard-metrics", "lancamentos"];

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    #[serde(flatten)]
    pub summary: ImportSummary,
    pub invalidate: [&'static str; 2],
}

fn validate(input: &LancamentoInput) -> Result<(), RdoError> {
    if input.descricao.trim().is_empty() {
        return Err(RdoError::BadRequest("descricao must not be empty".to_string()));
    }
    if !input.valor.is_finite() || input.valor < 0.0 {
        return Err(RdoError::BadRequest("valor must be a non-negative number".to_string()));
    }
    Ok(())
}

pub async fn list_lancamentos(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(filter): Query<LancamentoFilter>,
) -> Result<Json<Vec<Lancamento>>, RdoError> {
    Ok(Json(state.storage.list_lancamentos(user.id, &filter).await?))
}

pub async fn get_lancamento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Lancamento>, RdoError> {
    Ok(Json(state.storage.get_lancamento(user.id, id).await?))
}

pub async fn create_lancamento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<LancamentoInput>,
) -> Result<(StatusCode, Json<Lancamento>), RdoError> {
    validate(&input)?;
    let created = state.storage.create_lancamento(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_lancamento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<LancamentoInput>,
) -> Result<Json<Lancamento>, RdoError> {
    validate(&input)?;
    Ok(Json(state.storage.update_lancamento(user.id, id, input).await?))
}

pub async fn delete_lancamento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_lancamento(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn import_lancamentos(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, RdoError> {
    if req.content.trim().is_empty() {
        return Err(RdoError::BadRequest("content is empty".to_string()));
    }
    let summary =
        csv_import::import_lancamentos(&state.storage, user.id, req.obra_id, &req.content).await?;
    Ok(Json(ImportResponse {
        summary,
        invalidate: INVALIDATE_AFTER_IMPORT,
    }))
}

pub async fn bulk_update_categoria(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(req): Json<BulkCategoryRequest>,
) -> Result<Json<BulkUpdateReport>, RdoError> {
    let report =
        category_migration::bulk_reassign(&state.storage, user.id, &req.ids, req.categoria_id)
            .await?;
    Ok(Json(report))
}
