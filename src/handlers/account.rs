use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use crate::db::models::{Profile, Role};
use crate::error::RdoError;
use crate::middleware::{AuthUser, RequireServiceKey};
use crate::router::RdoState;
use crate::service::tokens::{generate_token, hash_token};
use crate::types::payloads::{IssueTokenRequest, IssueTokenResponse, ProfileUpdate};

/// Issue a bearer token for `email`, creating the profile on first sight.
/// Only trusted callers holding the service key may do this.
pub async fn issue_token(
    State(state): State<RdoState>,
    _key: RequireServiceKey,
    Json(req): Json<IssueTokenRequest>,
) -> Result<(StatusCode, Json<IssueTokenResponse>), RdoError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(RdoError::BadRequest("a valid email is required".to_string()));
    }
    let profile = state
        .storage
        .ensure_profile(&email, req.nome.as_deref(), req.role.unwrap_or(Role::User))
        .await?;
    let token = generate_token();
    state
        .storage
        .store_token(profile.id, &hash_token(&token))
        .await?;
    info!(user_id = %profile.id, "api token issued");
    Ok((
        StatusCode::CREATED,
        Json(IssueTokenResponse {
            user_id: profile.id,
            token,
        }),
    ))
}

pub async fn get_profile(AuthUser(user): AuthUser) -> Json<Profile> {
    Json(user)
}

pub async fn update_profile(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<ProfileUpdate>,
) -> Result<Json<Profile>, RdoError> {
    Ok(Json(
        state
            .storage
            .update_profile(user.id, input.nome.as_deref(), input.empresa.as_deref())
            .await?,
    ))
}
