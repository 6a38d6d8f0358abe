//! Function-style endpoints under `/functions`: billing, exports, metrics and
//! the hooks called by trusted infrastructure.

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::content_disposition;
use crate::api::CheckoutCustomer;
use crate::db::models::Obra;
use crate::error::RdoError;
use crate::middleware::{AuthUser, RequireServiceKey};
use crate::router::RdoState;
use crate::service::billing;
use crate::service::csv_export;
use crate::service::metrics::{self, DashboardMetrics, FinancialAnalytics};
use crate::service::obra_cleanup::{CleanupReport, cleanup_obra_storage};
use crate::service::support;
use crate::types::billing::{CheckoutResponse, PortalResponse, WebhookAck, WebhookEvent};
use crate::types::payloads::{
    AnalyticsQuery, LancamentoFilter, ObraDeletedHook, ObraQuery, SupportNotificationRequest,
};

const SIGNATURE_HEADER: &str = "stripe-signature";

pub async fn create_checkout_session(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CheckoutResponse>, RdoError> {
    let customer = match user.stripe_customer_id.as_deref() {
        Some(id) => CheckoutCustomer::Existing(id),
        None => CheckoutCustomer::Email(&user.email),
    };
    let session = state
        .stripe
        .create_checkout_session(user.id, customer)
        .await?;
    info!(user_id = %user.id, session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutResponse {
        url: session.url,
        session_id: session.id,
    }))
}

pub async fn create_portal_session(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PortalResponse>, RdoError> {
    let Some(customer_id) = user.stripe_customer_id.as_deref() else {
        return Err(RdoError::BadRequest(
            "no billing customer on file; subscribe first".to_string(),
        ));
    };
    let portal = state.stripe.create_portal_session(customer_id).await?;
    Ok(Json(PortalResponse { url: portal.url }))
}

/// Verified provider webhook. The signature covers the raw body, so this
/// handler must see the bytes before any JSON parsing.
pub async fn stripe_webhook(
    State(state): State<RdoState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, RdoError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(RdoError::InvalidSignature)?;
    billing::verify_signature(
        &state.cfg.billing.webhook_secret,
        signature,
        &body,
        state.cfg.billing.webhook_tolerance_secs,
        Utc::now().timestamp(),
    )?;

    let event: WebhookEvent = serde_json::from_slice(&body)?;
    let outcome = billing::handle_event(&state.storage, event).await?;
    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}

pub async fn dashboard_metrics(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<DashboardMetrics>, RdoError> {
    let obras = state.storage.list_obras(user.id).await?;
    let entries = state
        .storage
        .list_lancamentos(user.id, &LancamentoFilter::default())
        .await?;
    let diarios = state.storage.list_diarios(user.id, None).await?;
    Ok(Json(metrics::dashboard_metrics(
        &obras,
        &entries,
        diarios.len(),
        Utc::now().date_naive(),
    )))
}

pub async fn financial_analytics(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<AnalyticsQuery>,
) -> Result<Json<FinancialAnalytics>, RdoError> {
    if let (Some(from), Some(to)) = (q.from, q.to)
        && to < from
    {
        return Err(RdoError::BadRequest("`to` is before `from`".to_string()));
    }
    let obras = obras_in_scope(&state, user.id, q.obra_id).await?;
    let filter = LancamentoFilter {
        obra_id: q.obra_id,
        categoria_id: None,
        from: q.from,
        to: q.to,
    };
    let entries = state.storage.list_lancamentos(user.id, &filter).await?;
    let categorias = state.storage.list_categorias(user.id).await?;
    Ok(Json(metrics::financial_analytics(
        &obras,
        &entries,
        &categorias,
    )))
}

async fn obras_in_scope(
    state: &RdoState,
    user_id: Uuid,
    obra_id: Option<Uuid>,
) -> Result<Vec<Obra>, RdoError> {
    match obra_id {
        Some(id) => Ok(vec![state.storage.get_obra(user_id, id).await?]),
        None => state.storage.list_obras(user_id).await,
    }
}

fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition("attachment", filename),
            ),
        ],
        body,
    )
        .into_response()
}

pub async fn export_financial_csv(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ObraQuery>,
) -> Result<Response, RdoError> {
    let obras = obras_in_scope(&state, user.id, q.obra_id).await?;
    let filter = LancamentoFilter {
        obra_id: q.obra_id,
        ..LancamentoFilter::default()
    };
    let entries = state.storage.list_lancamentos(user.id, &filter).await?;
    let categorias = state.storage.list_categorias(user.id).await?;
    let body = csv_export::export_lancamentos(&entries, &obras, &categorias)?;
    Ok(csv_response(
        &format!("lancamentos-{}.csv", Utc::now().format("%Y%m%d")),
        body,
    ))
}

pub async fn export_activities_csv(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ObraQuery>,
) -> Result<Response, RdoError> {
    let obras = obras_in_scope(&state, user.id, q.obra_id).await?;
    let diarios = state.storage.list_diarios(user.id, q.obra_id).await?;
    let body = csv_export::export_atividades(&diarios, &obras)?;
    Ok(csv_response(
        &format!("atividades-{}.csv", Utc::now().format("%Y%m%d")),
        body,
    ))
}

#[derive(Debug, Serialize)]
pub struct NotificationAck {
    pub sent: bool,
    pub subject: String,
}

pub async fn support_notification(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(req): Json<SupportNotificationRequest>,
) -> Result<Json<NotificationAck>, RdoError> {
    let ticket = support::visible_ticket(&state.storage, &user, req.ticket_id).await?;
    let email = state
        .notifier
        .notify(&user, &ticket, req.mensagem.as_deref())?;
    Ok(Json(NotificationAck {
        sent: true,
        subject: email.subject,
    }))
}

/// Database webhook fired after an obra row is deleted.
pub async fn cleanup_obra_storage_hook(
    State(state): State<RdoState>,
    _key: RequireServiceKey,
    Json(hook): Json<ObraDeletedHook>,
) -> Result<Json<CleanupReport>, RdoError> {
    if hook.table != "obras" || !hook.kind.eq_ignore_ascii_case("DELETE") {
        warn!(table = %hook.table, kind = %hook.kind, "unexpected cleanup hook payload");
        return Err(RdoError::BadRequest(
            "expected a DELETE event on table obras".to_string(),
        ));
    }
    let record = hook.old_record;
    Ok(Json(
        cleanup_obra_storage(&state.storage, &state.blobs, record.user_id, record.id).await?,
    ))
}
