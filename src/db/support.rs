use crate::db::models::{Prioridade, SupportMessage, SupportTicket, TicketStatus};
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use chrono::Utc;
use uuid::Uuid;

const TICKET_COLUMNS: &str = "id, user_id, assunto, status, prioridade, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, ticket_id, sender_id, from_admin, conteudo, lido, created_at";

impl Storage {
    pub async fn create_ticket(
        &self,
        user_id: Uuid,
        assunto: &str,
        prioridade: Prioridade,
    ) -> Result<SupportTicket, RdoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO support_tickets (id, user_id, assunto, status, prioridade, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(id)
        .bind(user_id)
        .bind(assunto)
        .bind(TicketStatus::Aberto)
        .bind(prioridade)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        self.get_ticket(id).await
    }

    /// Unscoped lookup; handlers check ownership or admin rights.
    pub async fn get_ticket(&self, id: Uuid) -> Result<SupportTicket, RdoError> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM support_tickets WHERE id = ?");
        sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("ticket"))
    }

    pub async fn list_tickets_for_user(&self, user_id: Uuid) -> Result<Vec<SupportTicket>, RdoError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE user_id = ? ORDER BY updated_at DESC"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Admin view across tenants.
    pub async fn list_all_tickets(
        &self,
        status: Option<TicketStatus>,
    ) -> Result<Vec<SupportTicket>, RdoError> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM support_tickets \
             WHERE (? IS NULL OR status = ?) ORDER BY updated_at DESC"
        );
        Ok(sqlx::query_as::<_, SupportTicket>(&sql)
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn set_ticket_status(
        &self,
        id: Uuid,
        status: TicketStatus,
    ) -> Result<SupportTicket, RdoError> {
        let res = sqlx::query("UPDATE support_tickets SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(RdoError::NotFound("ticket"));
        }
        self.get_ticket(id).await
    }

    pub async fn insert_message(
        &self,
        ticket_id: Uuid,
        sender_id: Uuid,
        from_admin: bool,
        conteudo: &str,
    ) -> Result<SupportMessage, RdoError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO support_messages (id, ticket_id, sender_id, from_admin, conteudo, lido, created_at)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(id)
        .bind(ticket_id)
        .bind(sender_id)
        .bind(from_admin)
        .bind(conteudo)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE support_tickets SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM support_messages WHERE id = ?");
        Ok(sqlx::query_as::<_, SupportMessage>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn list_messages(&self, ticket_id: Uuid) -> Result<Vec<SupportMessage>, RdoError> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM support_messages WHERE ticket_id = ? ORDER BY created_at"
        );
        Ok(sqlx::query_as::<_, SupportMessage>(&sql)
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Mark messages written by the other side as read. Returns rows updated.
    pub async fn mark_messages_read(
        &self,
        ticket_id: Uuid,
        reader_is_admin: bool,
    ) -> Result<u64, RdoError> {
        let res = sqlx::query(
            "UPDATE support_messages SET lido = 1 WHERE ticket_id = ? AND from_admin = ? AND lido = 0",
        )
        .bind(ticket_id)
        .bind(!reader_is_admin)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Unread admin replies on the user's own tickets.
    pub async fn unread_count_for_user(&self, user_id: Uuid) -> Result<i64, RdoError> {
        let (n,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM support_messages m
               JOIN support_tickets t ON t.id = m.ticket_id
               WHERE t.user_id = ? AND m.from_admin = 1 AND m.lido = 0"#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Unread user messages across every ticket.
    pub async fn unread_count_for_admins(&self) -> Result<i64, RdoError> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM support_messages WHERE from_admin = 0 AND lido = 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }
}
