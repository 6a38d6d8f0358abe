use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use uuid::Uuid;

use super::content_disposition;
use crate::db::NewDocumento;
use crate::db::models::{Bucket, Documento};
use crate::error::RdoError;
use crate::middleware::AuthUser;
use crate::router::RdoState;
use crate::service::blob_store::{BlobStore, guess_content_type, sanitize_segment};
use crate::types::payloads::UploadRequest;

#[derive(Debug, Default, Deserialize)]
pub struct DocumentoQuery {
    pub obra_id: Option<Uuid>,
    pub bucket: Option<Bucket>,
}

pub async fn upload_documento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(req): Json<UploadRequest>,
) -> Result<(StatusCode, Json<Documento>), RdoError> {
    let bytes = STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| RdoError::BadRequest(format!("content_base64 is not valid base64: {e}")))?;
    if bytes.len() > state.cfg.basic.body_limit_bytes {
        return Err(RdoError::PayloadTooLarge);
    }
    // company assets are not tied to an obra even if one is sent
    let obra_id = req.obra_id.filter(|_| req.bucket.is_obra_scoped());
    if let Some(obra_id) = obra_id {
        state.storage.get_obra(user.id, obra_id).await?;
    }

    let key = BlobStore::object_key(req.bucket, user.id, obra_id, &req.folder, &req.filename)?;
    let nome = sanitize_segment(&req.filename).unwrap_or_default();
    let content_type = req
        .content_type
        .filter(|ct| !ct.trim().is_empty())
        .unwrap_or_else(|| guess_content_type(&nome).to_string());

    state.blobs.put(req.bucket, &key, &bytes).await?;
    let doc = state
        .storage
        .upsert_documento(
            user.id,
            NewDocumento {
                obra_id,
                bucket: req.bucket,
                folder: sanitize_segment(&req.folder).unwrap_or_else(|| "geral".to_string()),
                nome,
                path: key,
                content_type,
                size_bytes: bytes.len() as i64,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn list_documentos(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<DocumentoQuery>,
) -> Result<Json<Vec<Documento>>, RdoError> {
    Ok(Json(
        state
            .storage
            .list_documentos(user.id, q.obra_id, q.bucket)
            .await?,
    ))
}

pub async fn download_documento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, RdoError> {
    let doc = state.storage.get_documento(user.id, id).await?;
    let bytes = state.blobs.get(doc.bucket, &doc.path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.clone()),
            (header::CONTENT_DISPOSITION, content_disposition("inline", &doc.nome)),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete_documento(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RdoError> {
    let doc = state.storage.get_documento(user.id, id).await?;
    state.blobs.delete(doc.bucket, &doc.path).await?;
    state.storage.delete_documento(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
