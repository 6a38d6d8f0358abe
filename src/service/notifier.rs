use crate::db::models::{Profile, SupportTicket};
use crate::error::RdoError;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Email that would be handed to the mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportEmail {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Support notification stub: renders the email, logs it, and throttles per user.
#[derive(Clone)]
pub struct SupportNotifier {
    to: Arc<str>,
    limiter: Arc<DefaultKeyedRateLimiter<Uuid>>,
}

/// Tracked senders above which idle limiter state is dropped.
const PRUNE_ABOVE: usize = 1024;

impl SupportNotifier {
    pub fn new(to: impl Into<Arc<str>>, per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(to, Quota::per_minute(per_minute))
    }

    pub fn with_quota(to: impl Into<Arc<str>>, quota: Quota) -> Self {
        Self {
            to: to.into(),
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }

    /// Forget senders whose quota has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_senders(&self) -> usize {
        self.limiter.len()
    }

    pub fn notify(
        &self,
        sender: &Profile,
        ticket: &SupportTicket,
        mensagem: Option<&str>,
    ) -> Result<SupportEmail, RdoError> {
        if self.limiter.check_key(&sender.id).is_err() {
            warn!(user_id = %sender.id, ticket_id = %ticket.id, "support notification throttled");
            return Err(RdoError::RateLimited);
        }
        if self.limiter.len() > PRUNE_ABOVE {
            self.prune();
        }

        let who = sender.nome.as_deref().unwrap_or(&sender.email);
        let mut body = format!(
            "Ticket: {}\nAssunto: {}\nPrioridade: {:?}\nUsuário: {} <{}>\n",
            ticket.id, ticket.assunto, ticket.prioridade, who, sender.email
        );
        if let Some(msg) = mensagem.map(str::trim).filter(|m| !m.is_empty()) {
            body.push('\n');
            body.push_str(msg);
            body.push('\n');
        }
        let email = SupportEmail {
            to: self.to.to_string(),
            reply_to: sender.email.clone(),
            subject: format!("[Suporte] {}", ticket.assunto),
            body,
        };

        info!(
            to = %email.to,
            reply_to = %email.reply_to,
            subject = %email.subject,
            "support notification dispatched"
        );
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Plano, Prioridade, Role, SubscriptionStatus, TicketStatus};
    use chrono::Utc;

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "mestre@obra.com".to_string(),
            nome: Some("Mestre de Obras".to_string()),
            empresa: None,
            role: Role::User,
            plano: Plano::Pro,
            subscription_status: SubscriptionStatus::Active,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            current_period_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ticket(user_id: Uuid) -> SupportTicket {
        SupportTicket {
            id: Uuid::new_v4(),
            user_id,
            assunto: "Erro na importação".to_string(),
            status: TicketStatus::Aberto,
            prioridade: Prioridade::Alta,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn renders_email_and_throttles_per_user() {
        let notifier = SupportNotifier::new("suporte@example.com", 2);
        let p = profile();
        let t = ticket(p.id);

        let email = notifier.notify(&p, &t, Some("  planilha não sobe ")).unwrap();
        assert_eq!(email.to, "suporte@example.com");
        assert_eq!(email.reply_to, "mestre@obra.com");
        assert!(email.subject.contains("Erro na importação"));
        assert!(email.body.contains("planilha não sobe"));

        assert!(notifier.notify(&p, &t, None).is_ok());
        assert!(matches!(notifier.notify(&p, &t, None), Err(RdoError::RateLimited)));

        let other = profile();
        assert!(notifier.notify(&other, &ticket(other.id), None).is_ok());
    }

    #[tokio::test]
    async fn idle_senders_are_forgotten() {
        let quota = Quota::with_period(std::time::Duration::from_millis(1)).unwrap();
        let notifier = SupportNotifier::with_quota("suporte@example.com", quota);
        for _ in 0..5 {
            let p = profile();
            notifier.notify(&p, &ticket(p.id), None).unwrap();
        }
        assert_eq!(notifier.tracked_senders(), 5);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        notifier.prune();
        assert_eq!(notifier.tracked_senders(), 0);
    }
}
