use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::api::StripeApi;
use crate::config::Config;
use crate::db::Storage;
use crate::error::RdoError;
use crate::handlers::{
    account, catalogs, categorias, diarios, documentos, functions, lancamentos, obras, support,
};
use crate::service::blob_store::BlobStore;
use crate::service::notifier::SupportNotifier;
use crate::service::realtime_actor::{self, RealtimeHandle};

#[derive(Clone)]
pub struct RdoState {
    pub storage: Storage,
    pub blobs: BlobStore,
    pub stripe: StripeApi,
    pub realtime: RealtimeHandle,
    pub notifier: SupportNotifier,
    pub cfg: Arc<Config>,
}

impl RdoState {
    /// Wire the services around an opened database and spawn the realtime hub.
    pub async fn new(storage: Storage, cfg: Config) -> Result<Self, RdoError> {
        let realtime = realtime_actor::spawn().await?;
        Ok(Self {
            blobs: BlobStore::new(cfg.storage.root.clone()),
            stripe: StripeApi::new(cfg.billing.clone())?,
            notifier: SupportNotifier::new(
                cfg.support.notify_email.as_str(),
                cfg.support.notify_per_minute,
            ),
            storage,
            realtime,
            cfg: Arc::new(cfg),
        })
    }
}

/// Body-limit rejections come back as plain text; keep the JSON error shape.
async fn json_payload_too_large(resp: Response) -> Response {
    let is_json = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if resp.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return RdoError::PayloadTooLarge.into_response();
    }
    resp
}

pub fn rdo_router(state: RdoState) -> Router {
    let body_limit = state.cfg.basic.body_limit_bytes;

    let api = Router::new()
        .route(
            "/profile",
            get(account::get_profile).put(account::update_profile),
        )
        // Obras
        .route("/obras", get(obras::list_obras).post(obras::create_obra))
        .route(
            "/obras/{id}",
            get(obras::get_obra)
                .put(obras::update_obra)
                .delete(obras::delete_obra),
        )
        .route("/obras/{id}/rdo-metrics", get(diarios::rdo_metrics))
        .route("/obras/{id}/financial-report", get(diarios::financial_report))
        // Lancamentos
        .route(
            "/lancamentos",
            get(lancamentos::list_lancamentos).post(lancamentos::create_lancamento),
        )
        .route("/lancamentos/import", post(lancamentos::import_lancamentos))
        .route(
            "/lancamentos/bulk-categoria",
            post(lancamentos::bulk_update_categoria),
        )
        .route(
            "/lancamentos/{id}",
            get(lancamentos::get_lancamento)
                .put(lancamentos::update_lancamento)
                .delete(lancamentos::delete_lancamento),
        )
        // Categorias
        .route(
            "/categorias",
            get(categorias::list_categorias).post(categorias::create_categoria),
        )
        .route(
            "/categorias/{id}",
            put(categorias::update_categoria).delete(categorias::delete_categoria),
        )
        .route("/categorias/{id}/migrate", post(categorias::migrate_categoria))
        .route(
            "/categorias/{id}/delete-with-migration",
            post(categorias::delete_categoria_with_migration),
        )
        // Diarios
        .route(
            "/diarios",
            get(diarios::list_diarios).post(diarios::create_diario),
        )
        .route(
            "/diarios/{id}",
            get(diarios::get_diario)
                .put(diarios::update_diario)
                .delete(diarios::delete_diario),
        )
        .route("/diarios/{id}/report", get(diarios::diario_report))
        // Documentos
        .route(
            "/documentos",
            get(documentos::list_documentos).post(documentos::upload_documento),
        )
        .route("/documentos/{id}", delete(documentos::delete_documento))
        .route("/documentos/{id}/download", get(documentos::download_documento))
        // Support
        .route(
            "/support/tickets",
            get(support::list_my_tickets).post(support::open_ticket),
        )
        .route("/support/tickets/{id}", get(support::get_thread))
        .route("/support/tickets/{id}/messages", post(support::post_message))
        .route("/support/tickets/{id}/read", post(support::mark_read))
        .route("/support/tickets/{id}/close", post(support::close_ticket))
        .route("/support/unread", get(support::unread_count))
        .route("/support/unread/stream", get(support::unread_stream))
        .route("/admin/support/tickets", get(support::admin_list_tickets))
        .route(
            "/admin/support/tickets/{id}/status",
            patch(support::admin_set_status),
        )
        .route(
            "/admin/support/tickets/{id}/messages",
            post(support::admin_reply),
        )
        // Catalogs
        .route(
            "/cargos",
            get(catalogs::list_cargos).post(catalogs::create_cargo),
        )
        .route("/cargos/{id}", delete(catalogs::delete_cargo))
        .route(
            "/maquinas",
            get(catalogs::list_maquinas).post(catalogs::create_maquina),
        )
        .route("/maquinas/{id}", delete(catalogs::delete_maquina))
        .route(
            "/recebimentos",
            get(catalogs::list_recebimentos).post(catalogs::create_recebimento),
        )
        .route(
            "/recebimentos/{id}",
            delete(catalogs::delete_recebimento),
        )
        .route("/configuracoes", get(catalogs::list_configuracoes))
        .route("/configuracoes/{chave}", put(catalogs::set_configuracao));

    let function_routes = Router::new()
        .route(
            "/create-checkout-session",
            post(functions::create_checkout_session),
        )
        .route(
            "/create-portal-session",
            post(functions::create_portal_session),
        )
        .route("/dashboard-metrics", get(functions::dashboard_metrics))
        .route(
            "/cleanup-obra-storage",
            post(functions::cleanup_obra_storage_hook),
        )
        .route("/export-financial-csv", get(functions::export_financial_csv))
        .route(
            "/export-activities-csv",
            get(functions::export_activities_csv),
        )
        .route("/financial-analytics", get(functions::financial_analytics))
        .route(
            "/support-notification",
            post(functions::support_notification),
        )
        .route("/stripe-webhook", post(functions::stripe_webhook));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/auth/tokens", post(account::issue_token))
        .nest("/api", api)
        .nest("/functions", function_routes)
        .layer(middleware::map_response(json_payload_too_large))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
