use crate::db::models::{Bucket, Documento};
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use chrono::Utc;
use uuid::Uuid;

const DOCUMENTO_COLUMNS: &str =
    "id, user_id, obra_id, bucket, folder, nome, path, content_type, size_bytes, created_at";

/// Metadata for a blob that has just been written.
#[derive(Debug, Clone)]
pub struct NewDocumento {
    pub obra_id: Option<Uuid>,
    pub bucket: Bucket,
    pub folder: String,
    pub nome: String,
    pub path: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl Storage {
    /// Insert, or refresh the metadata when the same path is uploaded again.
    pub async fn upsert_documento(
        &self,
        user_id: Uuid,
        doc: NewDocumento,
    ) -> Result<Documento, RdoError> {
        sqlx::query(
            r#"INSERT INTO documentos (
                 id, user_id, obra_id, bucket, folder, nome, path, content_type, size_bytes, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(bucket, path) DO UPDATE SET
                 content_type = excluded.content_type,
                 size_bytes = excluded.size_bytes,
                 created_at = excluded.created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(doc.obra_id)
        .bind(doc.bucket)
        .bind(doc.folder)
        .bind(doc.nome)
        .bind(&doc.path)
        .bind(doc.content_type)
        .bind(doc.size_bytes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let sql =
            format!("SELECT {DOCUMENTO_COLUMNS} FROM documentos WHERE bucket = ? AND path = ?");
        Ok(sqlx::query_as::<_, Documento>(&sql)
            .bind(doc.bucket)
            .bind(doc.path)
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn list_documentos(
        &self,
        user_id: Uuid,
        obra_id: Option<Uuid>,
        bucket: Option<Bucket>,
    ) -> Result<Vec<Documento>, RdoError> {
        let sql = format!(
            "SELECT {DOCUMENTO_COLUMNS} FROM documentos \
             WHERE user_id = ? AND (? IS NULL OR obra_id = ?) AND (? IS NULL OR bucket = ?) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Documento>(&sql)
            .bind(user_id)
            .bind(obra_id)
            .bind(obra_id)
            .bind(bucket)
            .bind(bucket)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_documento(&self, user_id: Uuid, id: Uuid) -> Result<Documento, RdoError> {
        let sql = format!("SELECT {DOCUMENTO_COLUMNS} FROM documentos WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Documento>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("documento"))
    }

    pub async fn delete_documento(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        sqlx::query("DELETE FROM documentos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Drop metadata rows left for a deleted obra. Returns rows removed.
    pub async fn delete_documentos_for_obra(
        &self,
        user_id: Uuid,
        obra_id: Uuid,
    ) -> Result<u64, RdoError> {
        let res = sqlx::query("DELETE FROM documentos WHERE user_id = ? AND obra_id = ?")
            .bind(user_id)
            .bind(obra_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}
