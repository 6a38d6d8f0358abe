use crate::config::BillingConfig;
use crate::error::RdoError;
use crate::types::billing::{CreatedCheckoutSession, CreatedPortalSession};
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Who is checking out: an existing customer, or a first-time email.
#[derive(Debug, Clone, Copy)]
pub enum CheckoutCustomer<'a> {
    Existing(&'a str),
    Email(&'a str),
}

/// Thin client for the payment provider's form-encoded REST API.
#[derive(Clone)]
pub struct StripeApi {
    client: reqwest::Client,
    cfg: BillingConfig,
    retry_policy: ExponentialBuilder,
}

impl StripeApi {
    pub fn new(cfg: BillingConfig) -> Result<Self, RdoError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("meu-rdo/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            cfg,
            retry_policy: default_retry_policy(),
        })
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        customer: CheckoutCustomer<'_>,
    ) -> Result<CreatedCheckoutSession, RdoError> {
        let user_id = user_id.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("mode", "subscription"),
            ("line_items[0][price]", self.cfg.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", self.cfg.success_url.as_str()),
            ("cancel_url", self.cfg.cancel_url.as_str()),
            ("client_reference_id", user_id.as_str()),
            ("metadata[user_id]", user_id.as_str()),
        ];
        match customer {
            CheckoutCustomer::Existing(id) => form.push(("customer", id)),
            CheckoutCustomer::Email(email) => form.push(("customer_email", email)),
        }
        self.post_form("v1/checkout/sessions", &form).await
    }

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
    ) -> Result<CreatedPortalSession, RdoError> {
        let form = [
            ("customer", customer_id),
            ("return_url", self.cfg.portal_return_url.as_str()),
        ];
        self.post_form("v1/billing_portal/sessions", &form).await
    }

    async fn post_form<T>(&self, path: &str, form: &[(&str, &str)]) -> Result<T, RdoError>
    where
        T: DeserializeOwned,
    {
        if self.cfg.secret_key.is_empty() {
            return Err(RdoError::BadRequest(
                "billing is not configured on this server".to_string(),
            ));
        }
        let url = self.cfg.api_base.join(path)?;

        let resp = (|| async {
            let resp = self
                .client
                .post(url.clone())
                .bearer_auth(&self.cfg.secret_key)
                .form(form)
                .send()
                .await?;
            if resp.status().is_server_error()
                && let Err(err) = resp.error_for_status_ref()
            {
                error!("Billing provider server error (will retry): {}", resp.status());
                return Err(err);
            }
            Ok(resp)
        })
        .retry(self.retry_policy)
        .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, path, "billing provider rejected request");
            return Err(RdoError::UpstreamStatus { status, body });
        }
        Ok(resp.json::<T>().await?)
    }
}
