use crate::db::models::Bucket;
use crate::error::RdoError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_FOLDER: &str = "geral";

/// Filesystem object store: one directory per bucket under `root`, object keys
/// are relative paths inside it.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: Arc<PathBuf>,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Build the object key for an upload.
    /// Obra buckets use `{userId}/{obraId}/{folder}/{filename}`; `company_assets`
    /// has no obra segment.
    pub fn object_key(
        bucket: Bucket,
        user_id: Uuid,
        obra_id: Option<Uuid>,
        folder: &str,
        filename: &str,
    ) -> Result<String, RdoError> {
        let folder = sanitize_segment(folder).unwrap_or_else(|| DEFAULT_FOLDER.to_string());
        let filename = sanitize_segment(filename)
            .ok_or_else(|| RdoError::BadRequest("invalid filename".to_string()))?;
        match (bucket.is_obra_scoped(), obra_id) {
            (true, Some(obra_id)) => Ok(format!("{user_id}/{obra_id}/{folder}/{filename}")),
            (true, None) => Err(RdoError::BadRequest(format!(
                "bucket {} requires obra_id",
                bucket.as_str()
            ))),
            (false, _) => Ok(format!("{user_id}/{folder}/{filename}")),
        }
    }

    fn resolve(&self, bucket: Bucket, key: &str) -> PathBuf {
        let mut path = self.root.join(bucket.as_str());
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }

    pub async fn put(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> Result<(), RdoError> {
        let path = self.resolve(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(bucket = bucket.as_str(), key, size = bytes.len(), "blob written");
        Ok(())
    }

    pub async fn get(&self, bucket: Bucket, key: &str) -> Result<Vec<u8>, RdoError> {
        match tokio::fs::read(self.resolve(bucket, key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RdoError::NotFound("arquivo")),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns whether an object was removed. A missing object is not an error.
    pub async fn delete(&self, bucket: Bucket, key: &str) -> Result<bool, RdoError> {
        match tokio::fs::remove_file(self.resolve(bucket, key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove everything under `prefix` in `bucket`. Returns whether it existed.
    pub async fn delete_prefix(&self, bucket: Bucket, prefix: &str) -> Result<bool, RdoError> {
        let dir = self.resolve(bucket, prefix);
        if dir == self.root.join(bucket.as_str()) {
            return Err(RdoError::BadRequest("refusing to clear a whole bucket".to_string()));
        }
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce a user-supplied name to a single safe path segment.
/// Separators become `_`, runs of dots collapse to one, leading dots are dropped.
pub fn sanitize_segment(raw: &str) -> Option<String> {
    let mut cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.to_string())
}

/// Best-effort content type from the extension, for uploads that omit one.
pub fn guess_content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("meu-rdo-blobs-{}", Uuid::new_v4()))
    }

    #[test]
    fn sanitizes_traversal_attempts() {
        assert_eq!(sanitize_segment("../../etc/passwd").as_deref(), Some("_._etc_passwd"));
        assert_eq!(sanitize_segment(".."), None);
        assert_eq!(sanitize_segment("   "), None);
        assert_eq!(sanitize_segment(".env").as_deref(), Some("env"));
        assert_eq!(sanitize_segment("nota fiscal.pdf").as_deref(), Some("nota fiscal.pdf"));
    }

    #[test]
    fn keys_follow_bucket_layout() {
        let user = Uuid::new_v4();
        let obra = Uuid::new_v4();
        let key =
            BlobStore::object_key(Bucket::DocumentosObra, user, Some(obra), "plantas", "a.pdf")
                .unwrap();
        assert_eq!(key, format!("{user}/{obra}/plantas/a.pdf"));

        let key =
            BlobStore::object_key(Bucket::CompanyAssets, user, Some(obra), "", "logo.png").unwrap();
        assert_eq!(key, format!("{user}/geral/logo.png"));

        assert!(matches!(
            BlobStore::object_key(Bucket::DocumentosFinanceiros, user, None, "nf", "x.pdf"),
            Err(RdoError::BadRequest(_))
        ));
        assert!(BlobStore::object_key(Bucket::CompanyAssets, user, None, "", "..").is_err());
    }

    #[tokio::test]
    async fn write_read_and_clear_prefix() {
        let root = temp_root();
        let store = BlobStore::new(&root);
        let user = Uuid::new_v4();
        let obra = Uuid::new_v4();
        let key =
            BlobStore::object_key(Bucket::DocumentosObra, user, Some(obra), "fotos", "1.jpg")
                .unwrap();

        store.put(Bucket::DocumentosObra, &key, b"jpeg").await.unwrap();
        assert_eq!(store.get(Bucket::DocumentosObra, &key).await.unwrap(), b"jpeg");

        let prefix = format!("{user}/{obra}");
        assert!(store.delete_prefix(Bucket::DocumentosObra, &prefix).await.unwrap());
        assert!(matches!(
            store.get(Bucket::DocumentosObra, &key).await,
            Err(RdoError::NotFound(_))
        ));
        assert!(!store.delete(Bucket::DocumentosObra, &key).await.unwrap());
        assert!(store.delete_prefix(Bucket::DocumentosObra, "").await.is_err());

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn guesses_common_types() {
        assert_eq!(guess_content_type("Planta.PDF"), "application/pdf");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
