use crate::db::models::Lancamento;
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use crate::types::payloads::{LancamentoFilter, LancamentoInput};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

const LANCAMENTO_COLUMNS: &str = "id, user_id, obra_id, descricao, valor, data_gasto, \
     categoria_id, fornecedor, forma_pagamento, observacoes, created_at";

/// Ids bound per statement, well under SQLite's bind-variable limit.
const BULK_CHUNK: usize = 500;

impl Storage {
    pub async fn list_lancamentos(
        &self,
        user_id: Uuid,
        filter: &LancamentoFilter,
    ) -> Result<Vec<Lancamento>, RdoError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LANCAMENTO_COLUMNS} FROM lancamentos_financeiros WHERE user_id = "
        ));
        qb.push_bind(user_id);
        if let Some(obra_id) = filter.obra_id {
            qb.push(" AND obra_id = ").push_bind(obra_id);
        }
        if let Some(categoria_id) = filter.categoria_id {
            qb.push(" AND categoria_id = ").push_bind(categoria_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND data_gasto >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND data_gasto <= ").push_bind(to);
        }
        qb.push(" ORDER BY data_gasto DESC, created_at DESC");
        Ok(qb
            .build_query_as::<Lancamento>()
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_lancamento(&self, user_id: Uuid, id: Uuid) -> Result<Lancamento, RdoError> {
        let sql = format!(
            "SELECT {LANCAMENTO_COLUMNS} FROM lancamentos_financeiros WHERE id = ? AND user_id = ?"
        );
        sqlx::query_as::<_, Lancamento>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("lancamento"))
    }

    /// Insert one entry. The obra must belong to the caller; so must the category if set.
    pub async fn create_lancamento(
        &self,
        user_id: Uuid,
        input: LancamentoInput,
    ) -> Result<Lancamento, RdoError> {
        self.get_obra(user_id, input.obra_id).await?;
        if let Some(categoria_id) = input.categoria_id {
            self.get_categoria(user_id, categoria_id).await?;
        }
        let id = self.insert_lancamento(user_id, input).await?;
        self.get_lancamento(user_id, id).await
    }

    /// Raw insert without ownership checks; callers validate the obra first.
    pub(crate) async fn insert_lancamento(
        &self,
        user_id: Uuid,
        input: LancamentoInput,
    ) -> Result<Uuid, RdoError> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO lancamentos_financeiros (
                 id, user_id, obra_id, descricao, valor, data_gasto,
                 categoria_id, fornecedor, forma_pagamento, observacoes, created_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(input.obra_id)
        .bind(input.descricao)
        .bind(input.valor)
        .bind(input.data_gasto)
        .bind(input.categoria_id)
        .bind(input.fornecedor)
        .bind(input.forma_pagamento)
        .bind(input.observacoes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn update_lancamento(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: LancamentoInput,
    ) -> Result<Lancamento, RdoError> {
        self.get_obra(user_id, input.obra_id).await?;
        if let Some(categoria_id) = input.categoria_id {
            self.get_categoria(user_id, categoria_id).await?;
        }
        let res = sqlx::query(
            r#"UPDATE lancamentos_financeiros SET
                 obra_id = ?, descricao = ?, valor = ?, data_gasto = ?,
                 categoria_id = ?, fornecedor = ?, forma_pagamento = ?, observacoes = ?
               WHERE id = ? AND user_id = ?"#,
        )
        .bind(input.obra_id)
        .bind(input.descricao)
        .bind(input.valor)
        .bind(input.data_gasto)
        .bind(input.categoria_id)
        .bind(input.fornecedor)
        .bind(input.forma_pagamento)
        .bind(input.observacoes)
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("lancamento"));
        }
        self.get_lancamento(user_id, id).await
    }

    pub async fn delete_lancamento(&self, user_id: Uuid, id: Uuid) -> Result<(), RdoError> {
        let res = sqlx::query("DELETE FROM lancamentos_financeiros WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("lancamento"));
        }
        Ok(())
    }

    /// Batch `UPDATE ... WHERE id IN (...)` for the whole selection. Large
    /// selections are split to stay under SQLite's bind-variable limit; every
    /// chunk runs in one transaction.
    pub async fn set_lancamentos_categoria(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
        categoria_id: Uuid,
    ) -> Result<u64, RdoError> {
        if ids.is_empty() {
            return Ok(0);
        }
        // a repeated id would otherwise count once per chunk it lands in
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut tx = self.pool.begin().await?;
        let mut updated = 0;
        for chunk in ids.chunks(BULK_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("UPDATE lancamentos_financeiros SET categoria_id = ");
            qb.push_bind(categoria_id);
            qb.push(" WHERE user_id = ").push_bind(user_id);
            qb.push(" AND id IN (");
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            updated += qb.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }
}
