use crate::db::Storage;
use crate::db::models::SubscriptionStatus;
use crate::error::RdoError;
use crate::service::tokens::to_hex;
use crate::types::billing::{
    CheckoutSessionObject, SubscriptionObject, WebhookEvent, WebhookOutcome,
};
use chrono::DateTime;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Check a `t=<unix>,v1=<hex>` signature header over the raw request body.
/// Any matching `v1` entry is accepted.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), RdoError> {
    if secret.is_empty() {
        warn!("webhook secret not configured; rejecting event");
        return Err(RdoError::InvalidSignature);
    }

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }
    let Some(timestamp) = timestamp else {
        return Err(RdoError::InvalidSignature);
    };
    if (now_unix - timestamp).abs() > tolerance_secs {
        debug!(timestamp, now_unix, "webhook signature outside tolerance");
        return Err(RdoError::InvalidSignature);
    }

    let expected = sign(secret, timestamp, payload)?;
    let matched = candidates
        .iter()
        .any(|c| bool::from(c.as_bytes().ct_eq(expected.as_bytes())));
    if matched {
        Ok(())
    } else {
        Err(RdoError::InvalidSignature)
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, RdoError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| RdoError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(to_hex(&mac.finalize().into_bytes()))
}

/// Apply a verified event to the subscriber's profile.
pub async fn handle_event(
    storage: &Storage,
    event: WebhookEvent,
) -> Result<WebhookOutcome, RdoError> {
    match event.kind.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSessionObject = serde_json::from_value(event.data.object)?;
            let Some(user_id) = session
                .client_reference_id
                .as_deref()
                .or(session.metadata.get("user_id").map(String::as_str))
                .and_then(|raw| Uuid::parse_str(raw).ok())
            else {
                warn!(event_id = %event.id, session = %session.id, "checkout session without user reference");
                return Ok(WebhookOutcome::Ignored);
            };
            let updated = storage
                .activate_subscription(
                    user_id,
                    session.customer.as_deref(),
                    session.subscription.as_deref(),
                )
                .await?;
            if updated == 0 {
                warn!(event_id = %event.id, %user_id, "checkout completed for unknown profile");
                return Ok(WebhookOutcome::Ignored);
            }
            info!(event_id = %event.id, %user_id, "subscription activated");
            Ok(WebhookOutcome::Activated)
        }
        "customer.subscription.updated" => {
            let sub: SubscriptionObject = serde_json::from_value(event.data.object)?;
            let status = SubscriptionStatus::from_provider(&sub.status);
            let period_end = sub
                .current_period_end
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            let updated = storage
                .sync_subscription(&sub.customer, Some(&sub.id), status, period_end)
                .await?;
            info!(event_id = %event.id, customer = %sub.customer, ?status, updated, "subscription synced");
            Ok(WebhookOutcome::Synced)
        }
        "customer.subscription.deleted" => {
            let sub: SubscriptionObject = serde_json::from_value(event.data.object)?;
            let updated = storage
                .sync_subscription(&sub.customer, None, SubscriptionStatus::Canceled, None)
                .await?;
            info!(event_id = %event.id, customer = %sub.customer, updated, "subscription canceled");
            Ok(WebhookOutcome::Canceled)
        }
        other => {
            debug!(event_id = %event.id, kind = other, "webhook event acknowledged");
            Ok(WebhookOutcome::Ignored)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn accepts_fresh_valid_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let sig = sign(SECRET, 1_700_000_000, body).unwrap();
        let header = format!("t=1700000000,v0=deadbeef,v1={sig}");
        assert!(verify_signature(SECRET, &header, body, 300, 1_700_000_100).is_ok());
    }

    #[test]
    fn rejects_stale_tampered_or_malformed() {
        let body = br#"{"id":"evt_1"}"#;
        let sig = sign(SECRET, 1_700_000_000, body).unwrap();
        let header = format!("t=1700000000,v1={sig}");

        assert!(matches!(
            verify_signature(SECRET, &header, body, 300, 1_700_000_301),
            Err(RdoError::InvalidSignature)
        ));
        assert!(verify_signature(SECRET, &header, br#"{"id":"evt_2"}"#, 300, 1_700_000_000).is_err());
        assert!(verify_signature("other", &header, body, 300, 1_700_000_000).is_err());
        assert!(verify_signature(SECRET, "v1=abc", body, 300, 1_700_000_000).is_err());
        assert!(verify_signature("", &header, body, 300, 1_700_000_000).is_err());
    }
}
