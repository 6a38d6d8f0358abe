use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::db::models::{Cargo, ConfiguracaoGlobal, Maquina, RecebimentoMaterial};
use crate::error::RdoError;
use crate::middleware::{AuthUser, RequireAdmin};
use crate::router::RdoState;
use crate::types::payloads::{
    CargoInput, ConfiguracaoInput, MaquinaInput, ObraQuery, RecebimentoInput,
};

fn require_nome(nome: &str) -> Result<(), RdoError> {
    if nome.trim().is_empty() {
        return Err(RdoError::BadRequest("nome must not be empty".to_string()));
    }
    Ok(())
}

pub async fn list_cargos(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Cargo>>, RdoError> {
    Ok(Json(state.storage.list_cargos(user.id).await?))
}

pub async fn create_cargo(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CargoInput>,
) -> Result<(StatusCode, Json<Cargo>), RdoError> {
    require_nome(&input.nome)?;
    Ok((
        StatusCode::CREATED,
        Json(state.storage.create_cargo(user.id, input).await?),
    ))
}

pub async fn delete_cargo(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_cargo(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_maquinas(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Maquina>>, RdoError> {
    Ok(Json(state.storage.list_maquinas(user.id).await?))
}

pub async fn create_maquina(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<MaquinaInput>,
) -> Result<(StatusCode, Json<Maquina>), RdoError> {
    require_nome(&input.nome)?;
    Ok((
        StatusCode::CREATED,
        Json(state.storage.create_maquina(user.id, input).await?),
    ))
}

pub async fn delete_maquina(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_maquina(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_recebimentos(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ObraQuery>,
) -> Result<Json<Vec<RecebimentoMaterial>>, RdoError> {
    Ok(Json(state.storage.list_recebimentos(user.id, q.obra_id).await?))
}

pub async fn create_recebimento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<RecebimentoInput>,
) -> Result<(StatusCode, Json<RecebimentoMaterial>), RdoError> {
    if input.material.trim().is_empty() {
        return Err(RdoError::BadRequest("material must not be empty".to_string()));
    }
    if !input.quantidade.is_finite() || input.quantidade <= 0.0 {
        return Err(RdoError::BadRequest("quantidade must be positive".to_string()));
    }
    Ok((
        StatusCode::CREATED,
        Json(state.storage.create_recebimento(user.id, input).await?),
    ))
}

pub async fn delete_recebimento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_recebimento(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Global settings are readable by any signed-in user.
pub async fn list_configuracoes(
    State(state): State<RdoState>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<ConfiguracaoGlobal>>, RdoError> {
    Ok(Json(state.storage.list_configuracoes().await?))
}

pub async fn set_configuracao(
    State(state): State<RdoState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(chave): Path<String>,
    Json(input): Json<ConfiguracaoInput>,
) -> Result<Json<ConfiguracaoGlobal>, RdoError> {
    if chave.trim().is_empty() {
        return Err(RdoError::BadRequest("chave must not be empty".to_string()));
    }
    Ok(Json(state.storage.set_configuracao(chave.trim(), input.valor).await?))
}
