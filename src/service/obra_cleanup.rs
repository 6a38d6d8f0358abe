use crate::db::Storage;
use crate::db::models::Bucket;
use crate::error::RdoError;
use crate::service::blob_store::BlobStore;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub obra_id: Uuid,
    /// Buckets that actually held a `{userId}/{obraId}/` prefix.
    pub buckets_cleared: Vec<&'static str>,
    pub rows_deleted: u64,
}

/// Remove every blob stored under the obra's prefix plus the matching
/// `documentos` rows. Safe to run after the obra row is already gone.
pub async fn cleanup_obra_storage(
    storage: &Storage,
    blobs: &BlobStore,
    user_id: Uuid,
    obra_id: Uuid,
) -> Result<CleanupReport, RdoError> {
    let prefix = format!("{user_id}/{obra_id}");
    let mut report = CleanupReport {
        obra_id,
        ..CleanupReport::default()
    };

    for bucket in Bucket::ALL.into_iter().filter(|b| b.is_obra_scoped()) {
        match blobs.delete_prefix(bucket, &prefix).await {
            Ok(true) => report.buckets_cleared.push(bucket.as_str()),
            Ok(false) => {}
            Err(e) => {
                warn!(bucket = bucket.as_str(), %obra_id, error = %e, "obra storage cleanup failed");
                return Err(e);
            }
        }
    }
    report.rows_deleted = storage.delete_documentos_for_obra(user_id, obra_id).await?;

    info!(
        %user_id,
        %obra_id,
        buckets = ?report.buckets_cleared,
        rows = report.rows_deleted,
        "obra storage cleaned"
    );
    Ok(report)
}
