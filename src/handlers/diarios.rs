use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::db::models::Diario;
use crate::error::RdoError;
use crate::middleware::AuthUser;
use crate::router::RdoState;
use crate::service::metrics::{self, RdoMetrics};
use crate::service::rdo_report::{self, ReportDocument};
use crate::types::payloads::{DiarioInput, LancamentoFilter, ObraQuery};

fn validate(input: &DiarioInput) -> Result<(), RdoError> {
    if let Some(a) = input.atividades.iter().find(|a| a.progresso > 100) {
        return Err(RdoError::BadRequest(format!(
            "atividade '{}' has progresso above 100",
            a.descricao
        )));
    }
    if input.mao_de_obra.iter().any(|m| m.horas < 0.0)
        || input.equipamentos.iter().any(|e| e.horas < 0.0)
    {
        return Err(RdoError::BadRequest("horas must not be negative".to_string()));
    }
    Ok(())
}

pub async fn list_diarios(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ObraQuery>,
) -> Result<Json<Vec<Diario>>, RdoError> {
    Ok(Json(state.storage.list_diarios(user.id, q.obra_id).await?))
}

pub async fn get_diario(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Diario>, RdoError> {
    Ok(Json(state.storage.get_diario(user.id, id).await?))
}

pub async fn create_diario(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<DiarioInput>,
) -> Result<(StatusCode, Json<Diario>), RdoError> {
    validate(&input)?;
    let created = state.storage.create_diario(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_diario(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DiarioInput>,
) -> Result<Json<Diario>, RdoError> {
    validate(&input)?;
    Ok(Json(state.storage.update_diario(user.id, id, input).await?))
}

pub async fn delete_diario(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_diario(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Printable layout of one daily report.
pub async fn diario_report(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReportDocument>, RdoError> {
    let diario = state.storage.get_diario(user.id, id).await?;
    let obra = state.storage.get_obra(user.id, diario.obra_id).await?;
    Ok(Json(rdo_report::diario_report(&user, &obra, &diario)))
}

pub async fn rdo_metrics(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(obra_id): Path<Uuid>,
) -> Result<Json<RdoMetrics>, RdoError> {
    state.storage.get_obra(user.id, obra_id).await?;
    let diarios = state.storage.list_diarios(user.id, Some(obra_id)).await?;
    Ok(Json(metrics::rdo_metrics(&diarios)))
}

/// Printable financial summary of one obra.
pub async fn financial_report(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(obra_id): Path<Uuid>,
) -> Result<Json<ReportDocument>, RdoError> {
    let obra = state.storage.get_obra(user.id, obra_id).await?;
    let filter = LancamentoFilter {
        obra_id: Some(obra_id),
        ..LancamentoFilter::default()
    };
    let entries = state.storage.list_lancamentos(user.id, &filter).await?;
    let categorias = state.storage.list_categorias(user.id).await?;
    let diarios = state.storage.list_diarios(user.id, Some(obra_id)).await?;

    let analytics =
        metrics::financial_analytics(std::slice::from_ref(&obra), &entries, &categorias);
    let rdo = metrics::rdo_metrics(&diarios);
    Ok(Json(rdo_report::financial_report(
        &user, &obra, &analytics, &rdo,
    )))
}
