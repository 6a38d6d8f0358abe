use crate::db::Storage;
use crate::db::models::Categoria;
use crate::error::RdoError;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Name of the per-user fallback category entries are moved into.
pub const DEFAULT_CATEGORY: &str = "Sem Categoria";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub from: Uuid,
    pub to: Option<Uuid>,
    pub moved: u64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkUpdateReport {
    pub requested: usize,
    pub updated: u64,
}

/// Reassign a selection of entries to `categoria_id` with one batch update.
/// Ids that do not belong to the caller are silently left out of `updated`.
pub async fn bulk_reassign(
    storage: &Storage,
    user_id: Uuid,
    ids: &[Uuid],
    categoria_id: Uuid,
) -> Result<BulkUpdateReport, RdoError> {
    if ids.is_empty() {
        return Err(RdoError::BadRequest("no entries selected".to_string()));
    }
    storage.get_categoria(user_id, categoria_id).await?;
    let updated = storage
        .set_lancamentos_categoria(user_id, ids, categoria_id)
        .await?;
    info!(%user_id, %categoria_id, requested = ids.len(), updated, "bulk category update");
    Ok(BulkUpdateReport {
        requested: ids.len(),
        updated,
    })
}

/// Move every entry out of `from` into the default category, then re-count.
/// The re-count is a read-after-write check, not a transactional guarantee.
pub async fn migrate_entries(
    storage: &Storage,
    user_id: Uuid,
    from: Uuid,
) -> Result<MigrationReport, RdoError> {
    let source = storage.get_categoria(user_id, from).await?;
    let dependents = storage.count_entries_in_categoria(user_id, from).await?;
    if dependents == 0 {
        return Ok(MigrationReport {
            from,
            to: None,
            moved: 0,
            remaining: 0,
        });
    }
    if is_default(&source) {
        return Err(RdoError::BadRequest(format!(
            "'{DEFAULT_CATEGORY}' still holds {dependents} entries and cannot be migrated"
        )));
    }

    let target = storage
        .find_or_create_categoria(user_id, DEFAULT_CATEGORY)
        .await?;
    let moved = storage
        .move_categoria_entries(user_id, from, target.id)
        .await?;
    let remaining = storage.count_entries_in_categoria(user_id, from).await?;
    if remaining != 0 {
        warn!(%user_id, %from, remaining, "category migration incomplete");
        return Err(RdoError::MigrationIncomplete { remaining });
    }

    info!(%user_id, %from, to = %target.id, moved, "category entries migrated");
    Ok(MigrationReport {
        from,
        to: Some(target.id),
        moved,
        remaining,
    })
}

/// Migrate dependents if there are any, then delete the category.
pub async fn delete_with_migration(
    storage: &Storage,
    user_id: Uuid,
    categoria_id: Uuid,
) -> Result<MigrationReport, RdoError> {
    let report = migrate_entries(storage, user_id, categoria_id).await?;
    storage.delete_categoria(user_id, categoria_id).await?;
    Ok(report)
}

fn is_default(categoria: &Categoria) -> bool {
    categoria.nome.eq_ignore_ascii_case(DEFAULT_CATEGORY)
}
