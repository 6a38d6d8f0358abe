use crate::db::models::Diario;
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use crate::types::payloads::DiarioInput;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

const DIARIO_COLUMNS: &str = "id, user_id, obra_id, data, clima, observacoes, \
     mao_de_obra, equipamentos, materiais, atividades, created_at";

impl Storage {
    pub async fn list_diarios(
        &self,
        user_id: Uuid,
        obra_id: Option<Uuid>,
    ) -> Result<Vec<Diario>, RdoError> {
        let sql = format!(
            "SELECT {DIARIO_COLUMNS} FROM diarios_obra \
             WHERE user_id = ? AND (? IS NULL OR obra_id = ?) ORDER BY data DESC"
        );
        Ok(sqlx::query_as::<_, Diario>(&sql)
            .bind(user_id)
            .bind(obra_id)
            .bind(obra_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_diario(&self, user_id: Uuid, id: Uuid) -> Result<Diario, RdoError> {
        let sql = format!("SELECT {DIARIO_COLUMNS} FROM diarios_obra WHERE id = ? AND user_id = ?");
        sqlx::query_as::<_, Diario>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("diario"))
    }

    /// One report per obra per day; a second one for the same date is a conflict.
    pub async fn create_diario(&self, user_id: Uuid, input: DiarioInput) -> Result<Diario, RdoError> {
        self.get_obra(user_id, input.obra_id).await?;
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO diarios_obra (
                 id, user_id, obra_id, data, clima, observacoes,
                 mao_de_obra, equipamentos, materiais, atividades, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.obra_id)
        .bind(input.data)
        .bind(input.clima)
        .bind(input.observacoes)
        .bind(Json(input.mao_de_obra))
        .bind(Json(input.equipamentos))
        .bind(Json(input.materiais))
        .bind(Json(input.atividades))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        self.get_diario(user_id, id).await
    }

    pub async fn update_diario(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: DiarioInput,
    ) -> Result<Diario, RdoError> {
        self.get_obra(user_id, input.obra_id).await?;
        let res = sqlx::query(
            r#"UPDATE diarios_obra SET
                 obra_id = ?, data = ?, clima = ?, observacoes = ?,
                 mao_de_obra = ?, equipamentos = ?, materiais = ?, atividades = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(input.obra_id)
        .bind(input.data)
        .bind(input.clima)
        .bind(input.observacoes)
        .bind(Json(input.mao_de_obra))
        .bind(Json(input.equipamentos))
        .bind(Json(input.materiais))
        .bind(Json(input.atividades))
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("diario"));
        }
        self.get_diario(user_id, id).await
    }

    pub async fn delete_diario(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM diarios_obra WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("diario"));
        }
        Ok(())
    }
}
