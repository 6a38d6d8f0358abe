use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{Obra, Plano};
use crate::error::RdoError;
use crate::middleware::AuthUser;
use crate::router::RdoState;
use crate::service::obra_cleanup::cleanup_obra_storage;
use crate::types::payloads::ObraInput;

fn validate(input: &ObraInput) -> Result<(), RdoError> {
    if input.nome.trim().is_empty() {
        return Err(RdoError::BadRequest("nome must not be empty".to_string()));
    }
    if !input.orcamento.is_finite() || input.orcamento < 0.0 {
        return Err(RdoError::BadRequest("orcamento must be a non-negative number".to_string()));
    }
    if let (Some(inicio), Some(fim)) = (input.data_inicio, input.data_previsao_fim)
        && fim < inicio
    {
        return Err(RdoError::BadRequest(
            "data_previsao_fim is before data_inicio".to_string(),
        ));
    }
    Ok(())
}

pub async fn list_obras(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Obra>>, RdoError> {
    Ok(Json(state.storage.list_obras(user.id).await?))
}

pub async fn get_obra(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Obra>, RdoError> {
    Ok(Json(state.storage.get_obra(user.id, id).await?))
}

pub async fn create_obra(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<ObraInput>,
) -> Result<(StatusCode, Json<Obra>), RdoError> {
    validate(&input)?;
    if user.plano == Plano::Free {
        let limit = state.cfg.plans.free_max_obras;
        let current = state.storage.count_obras(user.id).await?;
        if current >= limit {
            info!(user_id = %user.id, current, limit, "free plan obra limit reached");
            return Err(RdoError::PlanLimit(format!(
                "the free plan allows {limit} obra(s); upgrade to pro for more"
            )));
        }
    }
    let obra = state.storage.create_obra(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(obra)))
}

pub async fn update_obra(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ObraInput>,
) -> Result<Json<Obra>, RdoError> {
    validate(&input)?;
    Ok(Json(state.storage.update_obra(user.id, id, input).await?))
}

/// Deleting an obra cascades to its rows; its blobs are cleared afterwards.
pub async fn delete_obra(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_obra(user.id, id).await?;
    if let Err(e) = cleanup_obra_storage(&state.storage, &state.blobs, user.id, id).await {
        warn!(obra_id = %id, error = %e, "obra deleted but storage cleanup failed");
    }
    Ok(StatusCode::NO_CONTENT)
}
