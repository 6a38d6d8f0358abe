use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::db::models::Categoria;
use crate::error::RdoError;
use crate::middleware::AuthUser;
use crate::router::RdoState;
use crate::service::category_migration::{self, MigrationReport};
use crate::types::payloads::CategoriaInput;

fn validate(input: &CategoriaInput) -> Result<&str, RdoError> {
    let nome = input.nome.trim();
    if nome.is_empty() {
        return Err(RdoError::BadRequest("nome must not be empty".to_string()));
    }
    Ok(nome)
}

pub async fn list_categorias(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Categoria>>, RdoError> {
    Ok(Json(state.storage.list_categorias(user.id).await?))
}

pub async fn create_categoria(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CategoriaInput>,
) -> Result<(StatusCode, Json<Categoria>), RdoError> {
    let nome = validate(&input)?;
    let created = state
        .storage
        .create_categoria(user.id, nome, input.cor.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_categoria(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoriaInput>,
) -> Result<Json<Categoria>, RdoError> {
    let nome = validate(&input)?;
    Ok(Json(
        state
            .storage
            .update_categoria(user.id, id, nome, input.cor.as_deref())
            .await?,
    ))
}

/// Plain delete; entries keep existing with no category.
pub async fn delete_categoria(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    state.storage.delete_categoria(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn migrate_categoria(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MigrationReport>, RdoError> {
    Ok(Json(
        category_migration::migrate_entries(&state.storage, user.id, id).await?,
    ))
}

pub async fn delete_categoria_with_migration(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MigrationReport>, RdoError> {
    Ok(Json(
        category_migration::delete_with_migration(&state.storage, user.id, id).await?,
    ))
}
