use crate::db::models::{Plano, Profile, Role, SubscriptionStatus};
use crate::db::sqlite::Storage;
use crate::error::RdoError;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, email, nome, empresa, role, plano, subscription_status, \
     stripe_customer_id, stripe_subscription_id, current_period_end, created_at, updated_at";

impl Storage {
    /// Return the profile for `email`, creating it on first sight.
    pub async fn ensure_profile(
        &self,
        email: &str,
        nome: Option<&str>,
        role: Role,
    ) -> Result<Profile, RdoError> {
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO profiles (id, email, nome, role, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(email) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(nome)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = ?");
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(email)
            .fetch_one(&self.pool)
            .await?)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, RdoError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?");
        sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RdoError::NotFound("profile"))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        nome: Option<&str>,
        empresa: Option<&str>,
    ) -> Result<Profile, RdoError> {
        sqlx::query(
            r#"UPDATE profiles SET
                 nome = COALESCE(?, nome),
                 empresa = COALESCE(?, empresa),
                 updated_at = ?
               WHERE id = ?"#,
        )
        .bind(nome)
        .bind(empresa)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        self.get_profile(user_id).await
    }

    pub async fn store_token(&self, user_id: Uuid, token_hash: &str) -> Result<(), RdoError> {
        sqlx::query("INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token_hash)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn profile_for_token(&self, token_hash: &str) -> Result<Option<Profile>, RdoError> {
        let sql = format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles \
             WHERE id = (SELECT user_id FROM api_tokens WHERE token_hash = ?)"
        );
        Ok(sqlx::query_as::<_, Profile>(&sql)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Record a completed checkout: the user becomes `pro` with an active subscription.
    pub async fn activate_subscription(
        &self,
        user_id: Uuid,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
    ) -> Result<u64, RdoError> {
        let res = sqlx::query(
            r#"UPDATE profiles SET
                 plano = ?,
                 subscription_status = ?,
                 stripe_customer_id = COALESCE(?, stripe_customer_id),
                 stripe_subscription_id = COALESCE(?, stripe_subscription_id),
                 updated_at = ?
               WHERE id = ?"#,
        )
        .bind(Plano::Pro)
        .bind(SubscriptionStatus::Active)
        .bind(customer_id)
        .bind(subscription_id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }

    /// Apply a subscription state change keyed by the provider's customer id.
    /// Canceled or inactive subscriptions drop the account back to `free`.
    pub async fn sync_subscription(
        &self,
        customer_id: &str,
        subscription_id: Option<&str>,
        status: SubscriptionStatus,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<u64, RdoError> {
        let plano = match status {
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => Plano::Pro,
            SubscriptionStatus::Inactive | SubscriptionStatus::Canceled => Plano::Free,
        };
        let res = sqlx::query(
            r#"UPDATE profiles SET
                 plano = ?,
                 subscription_status = ?,
                 stripe_subscription_id = COALESCE(?, stripe_subscription_id),
                 current_period_end = COALESCE(?, current_period_end),
                 updated_at = ?
               WHERE stripe_customer_id = ?"#,
        )
        .bind(plano)
        .bind(status)
        .bind(subscription_id)
        .bind(period_end)
        .bind(Utc::now())
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
