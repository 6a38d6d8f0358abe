//! Small per-user catalogs (cargos, maquinas), material receipts and global settings.

use crate::db::models::{Cargo, ConfiguracaoGlobal, Maquina, RecebimentoMaterial};
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use crate::types::payloads::{CargoInput, MaquinaInput, RecebimentoInput};
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

impl Storage {
    pub async fn list_cargos(&self, user_id: Uuid) -> Result<Vec<Cargo>, RdoError> {
        Ok(sqlx::query_as::<_, Cargo>(
            "SELECT id, user_id, nome, valor_diaria, created_at FROM cargos WHERE user_id = ? ORDER BY nome",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create_cargo(&self, user_id: Uuid, input: CargoInput) -> Result<Cargo, RdoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO cargos (id, user_id, nome, valor_diaria, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(input.nome.trim())
        .bind(input.valor_diaria)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(sqlx::query_as::<_, Cargo>(
            "SELECT id, user_id, nome, valor_diaria, created_at FROM cargos WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn delete_cargo(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM cargos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("cargo"));
        }
        Ok(())
    }

    pub async fn list_maquinas(&self, user_id: Uuid) -> Result<Vec<Maquina>, RdoError> {
        Ok(sqlx::query_as::<_, Maquina>(
            "SELECT id, user_id, nome, valor_hora, created_at FROM maquinas WHERE user_id = ? ORDER BY nome",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create_maquina(
        &self,
        user_id: Uuid,
        input: MaquinaInput,
    ) -> Result<Maquina, RdoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO maquinas (id, user_id, nome, valor_hora, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(input.nome.trim())
        .bind(input.valor_hora)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(sqlx::query_as::<_, Maquina>(
            "SELECT id, user_id, nome, valor_hora, created_at FROM maquinas WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn delete_maquina(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM maquinas WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("maquina"));
        }
        Ok(())
    }

    pub async fn list_recebimentos(
        &self,
        user_id: Uuid,
        obra_id: Option<Uuid>,
    ) -> Result<Vec<RecebimentoMaterial>, RdoError> {
        Ok(sqlx::query_as::<_, RecebimentoMaterial>(
            r#"SELECT id, user_id, obra_id, material, quantidade, unidade, fornecedor,
                      data_recebimento, nota_fiscal, created_at
               FROM recebimento_materiais
               WHERE user_id = ? AND (? IS NULL OR obra_id = ?)
               ORDER BY data_recebimento DESC"#,
        )
        .bind(user_id)
        .bind(obra_id)
        .bind(obra_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create_recebimento(
        &self,
        user_id: Uuid,
        input: RecebimentoInput,
    ) -> Result<RecebimentoMaterial, RdoError> {
        self.get_obra(user_id, input.obra_id).await?;
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO recebimento_materiais (
                 id, user_id, obra_id, material, quantidade, unidade, fornecedor,
                 data_recebimento, nota_fiscal, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.obra_id)
        .bind(input.material)
        .bind(input.quantidade)
        .bind(input.unidade)
        .bind(input.fornecedor)
        .bind(input.data_recebimento)
        .bind(input.nota_fiscal)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(sqlx::query_as::<_, RecebimentoMaterial>(
            r#"SELECT id, user_id, obra_id, material, quantidade, unidade, fornecedor,
                      data_recebimento, nota_fiscal, created_at
               FROM recebimento_materiais WHERE id = ?"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn delete_recebimento(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM recebimento_materiais WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("recebimento"));
        }
        Ok(())
    }

    pub async fn list_configuracoes(&self) -> Result<Vec<ConfiguracaoGlobal>, RdoError> {
        Ok(sqlx::query_as::<_, ConfiguracaoGlobal>(
            "SELECT chave, valor, updated_at FROM configuracoes_globais ORDER BY chave",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn set_configuracao(
        &self,
        chave: &str,
        valor: Value,
    ) -> Result<ConfiguracaoGlobal, RdoError> {
        sqlx::query(
            r#"INSERT INTO configuracoes_globais (chave, valor, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(chave) DO UPDATE SET valor = excluded.valor, updated_at = excluded.updated_at"#,
        )
        .bind(chave)
        .bind(Json(valor))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(sqlx::query_as::<_, ConfiguracaoGlobal>(
            "SELECT chave, valor, updated_at FROM configuracoes_globais WHERE chave = ?",
        )
        .bind(chave)
        .fetch_one(&self.pool)
        .await?)
    }
}
