use crate::db::models::Categoria;
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use chrono::Utc;
use uuid::Uuid;

const CATEGORIA_COLUMNS: &str = "id, user_id, nome, cor, created_at";

/// Uniqueness key for category names. SQLite's `lower()` only folds ASCII, so
/// the fold happens here.
pub fn nome_key(nome: &str) -> String {
    nome.trim().to_lowercase()
}

impl Storage {
    pub async fn list_categorias(&self, user_id: Uuid) -> Result<Vec<Categoria>, RdoError> {
        let sql = format!(
            "SELECT {CATEGORIA_COLUMNS} FROM categorias_despesa WHERE user_id = ? ORDER BY nome"
        );
        Ok(sqlx::query_as::<_, Categoria>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_categoria(&self, user_id: Uuid, id: Uuid) -> Result<Categoria, RdoError> {
        let sql = format!(
            "SELECT {CATEGORIA_COLUMNS} FROM categorias_despesa WHERE id = ? AND user_id = ?"
        );
        sqlx::query_as::<_, Categoria>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("categoria"))
    }

    /// Case-insensitive lookup by name, accents included.
    pub async fn find_categoria_by_name(
        &self,
        user_id: Uuid,
        nome: &str,
    ) -> Result<Option<Categoria>, RdoError> {
        let sql = format!(
            "SELECT {CATEGORIA_COLUMNS} FROM categorias_despesa \
             WHERE user_id = ? AND nome_key = ?"
        );
        Ok(sqlx::query_as::<_, Categoria>(&sql)
            .bind(user_id)
            .bind(nome_key(nome))
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn create_categoria(
        &self,
        user_id: Uuid,
        nome: &str,
        cor: Option<&str>,
    ) -> Result<Categoria, RdoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO categorias_despesa (id, user_id, nome, nome_key, cor, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(nome.trim())
        .bind(nome_key(nome))
        .bind(cor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        self.get_categoria(user_id, id).await
    }

    pub async fn find_or_create_categoria(
        &self,
        user_id: Uuid,
        nome: &str,
    ) -> Result<Categoria, RdoError> {
        if let Some(existing) = self.find_categoria_by_name(user_id, nome).await? {
            return Ok(existing);
        }
        self.create_categoria(user_id, nome, None).await
    }

    pub async fn update_categoria(
        &self,
        user_id: Uuid,
        id: Uuid,
        nome: &str,
        cor: Option<&str>,
    ) -> Result<Categoria, RdoError> {
        let res = sqlx::query(
            "UPDATE categorias_despesa SET nome = ?, nome_key = ?, cor = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(nome.trim())
        .bind(nome_key(nome))
        .bind(cor)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("categoria"));
        }
        self.get_categoria(user_id, id).await
    }

    pub async fn delete_categoria(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM categorias_despesa WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("categoria"));
        }
        Ok(())
    }

    pub async fn count_entries_in_categoria(
        &self,
        user_id: Uuid,
        categoria_id: Uuid,
    ) -> Result<i64, RdoError> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM lancamentos_financeiros WHERE user_id = ? AND categoria_id = ?",
        )
        .bind(user_id)
        .bind(categoria_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Move every entry of `from` into `to` with one statement. Returns rows moved.
    pub async fn move_categoria_entries(
        &self,
        user_id: Uuid,
        from: Uuid,
        to: Uuid,
    ) -> Result<u64, RdoError> {
        let res = sqlx::query(
            "UPDATE lancamentos_financeiros SET categoria_id = ? WHERE user_id = ? AND categoria_id = ?",
        )
        .bind(to)
        .bind(user_id)
        .bind(from)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
