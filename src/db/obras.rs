use crate::db::models::{Obra, ObraStatus};
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use crate::types::payloads::ObraInput;
use chrono::Utc;
use uuid::Uuid;

const OBRA_COLUMNS: &str = "id, user_id, nome, endereco, cliente, orcamento, status, \
     data_inicio, data_previsao_fim, created_at";

impl Storage {
    pub async fn list_obras(&self, user_id: Uuid) -> Result<Vec<Obra>, RdoError> {
        let sql = format!(
            "SELECT {OBRA_COLUMNS} FROM obras WHERE user_id = ? ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Obra>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_obra(&self, user_id: Uuid, id: Uuid) -> Result<Obra, RdoError> {
        let sql = format!("SELECT {OBRA_COLUMNS} FROM obras WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Obra>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("obra"))
    }

    pub async fn count_obras(&self, user_id: Uuid) -> Result<i64, RdoError> {
        let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM obras WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn create_obra(&self, user_id: Uuid, input: ObraInput) -> Result<Obra, RdoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO obras (
                 id, user_id, nome, endereco, cliente, orcamento, status,
                 data_inicio, data_previsao_fim, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.nome)
        .bind(input.endereco)
        .bind(input.cliente)
        .bind(input.orcamento)
        .bind(input.status.unwrap_or(ObraStatus::Planejamento))
        .bind(input.data_inicio)
        .bind(input.data_previsao_fim)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        self.get_obra(user_id, id).await
    }

    pub async fn update_obra(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: ObraInput,
    ) -> Result<Obra, RdoError> {
        let res = sqlx::query(
            r#"UPDATE obras SET
                 nome = ?, endereco = ?, cliente = ?, orcamento = ?,
                 status = COALESCE(?, status),
                 data_inicio = ?, data_previsao_fim = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(input.nome)
        .bind(input.endereco)
        .bind(input.cliente)
        .bind(input.orcamento)
        .bind(input.status)
        .bind(input.data_inicio)
        .bind(input.data_previsao_fim)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("obra"));
        }
        self.get_obra(user_id, id).await
    }

    /// Delete the obra row; child rows go with it through `ON DELETE CASCADE`.
    pub async fn delete_obra(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM obras WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("obra"));
        }
        Ok(())
    }
}
