use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{SupportMessage, SupportTicket};
use crate::error::RdoError;
use crate::middleware::{AuthUser, RequireAdmin};
use crate::router::RdoState;
use crate::service::support::{self, TicketThread};
use crate::types::payloads::{NewMessage, NewTicket, TicketFilter, TicketStatusUpdate};

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked: u64,
}

pub async fn open_ticket(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewTicket>,
) -> Result<(StatusCode, Json<TicketThread>), RdoError> {
    let thread = support::open_ticket(&state.storage, &state.realtime, &user, input).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_my_tickets(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<SupportTicket>>, RdoError> {
    Ok(Json(state.storage.list_tickets_for_user(user.id).await?))
}

pub async fn get_thread(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketThread>, RdoError> {
    Ok(Json(support::thread(&state.storage, &user, id).await?))
}

pub async fn post_message(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<NewMessage>,
) -> Result<(StatusCode, Json<SupportMessage>), RdoError> {
    let ticket = support::visible_ticket(&state.storage, &user, id).await?;
    let message =
        support::post_message(&state.storage, &state.realtime, &user, &ticket, &input.conteudo)
            .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkedRead>, RdoError> {
    let marked = support::mark_read(&state.storage, &user, id).await?;
    Ok(Json(MarkedRead { marked }))
}

pub async fn close_ticket(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SupportTicket>, RdoError> {
    Ok(Json(support::close_ticket(&state.storage, &user, id).await?))
}

pub async fn unread_count(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UnreadCount>, RdoError> {
    let unread = support::unread_count(&state.storage, &user).await?;
    Ok(Json(UnreadCount { unread }))
}

/// Server-sent events: the current unread count first, then each new message
/// addressed to the caller.
pub async fn unread_stream(
    State(state): State<RdoState>,
    AuthUser(user): AuthUser,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RdoError> {
    // Subscribe before counting so nothing lands in between.
    let rx = state
        .realtime
        .subscribe(support::audience_for(&user))
        .await?;
    let unread = support::unread_count(&state.storage, &user).await?;

    let initial = stream::once(async move {
        Ok(Event::default().event("unread").data(unread.to_string()))
    });
    let user_id = user.id;
    let updates = BroadcastStream::new(rx).filter_map(move |item| async move {
        match item {
            Ok(ev) => Event::default().event("message").json_data(&ev).ok().map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                debug!(%user_id, skipped, "support stream subscriber lagged");
                None
            }
        }
    });

    Ok(Sse::new(initial.chain(updates)).keep_alive(KeepAlive::default()))
}

pub async fn admin_list_tickets(
    State(state): State<RdoState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(filter): Query<TicketFilter>,
) -> Result<Json<Vec<SupportTicket>>, RdoError> {
    Ok(Json(state.storage.list_all_tickets(filter.status).await?))
}

pub async fn admin_set_status(
    State(state): State<RdoState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(input): Json<TicketStatusUpdate>,
) -> Result<Json<SupportTicket>, RdoError> {
    Ok(Json(state.storage.set_ticket_status(id, input.status).await?))
}

pub async fn admin_reply(
    State(state): State<RdoState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(input): Json<NewMessage>,
) -> Result<(StatusCode, Json<SupportMessage>), RdoError> {
    let ticket = state.storage.get_ticket(id).await?;
    let message =
        support::post_message(&state.storage, &state.realtime, &admin, &ticket, &input.conteudo)
            .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
