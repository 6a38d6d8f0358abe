use crate::db::Storage;
use crate::db::models::{Prioridade, Profile, SupportMessage, SupportTicket, TicketStatus};
use crate::error::RdoError;
use crate::service::realtime_actor::{Audience, RealtimeHandle, SupportEvent};
use crate::types::payloads::NewTicket;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct TicketThread {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub mensagens: Vec<SupportMessage>,
}

/// Load a ticket the caller may see. Other users' tickets look missing.
pub async fn visible_ticket(
    storage: &Storage,
    caller: &Profile,
    ticket_id: Uuid,
) -> Result<SupportTicket, RdoError> {
    let ticket = storage.get_ticket(ticket_id).await?;
    if ticket.user_id != caller.id && !caller.is_admin() {
        return Err(RdoError::NotFound("ticket"));
    }
    Ok(ticket)
}

fn non_empty(field: &str, value: &str) -> Result<(), RdoError> {
    if value.trim().is_empty() {
        return Err(RdoError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

pub async fn open_ticket(
    storage: &Storage,
    realtime: &RealtimeHandle,
    caller: &Profile,
    input: NewTicket,
) -> Result<TicketThread, RdoError> {
    non_empty("assunto", &input.assunto)?;
    non_empty("mensagem", &input.mensagem)?;
    let ticket = storage
        .create_ticket(
            caller.id,
            input.assunto.trim(),
            input.prioridade.unwrap_or(Prioridade::Media),
        )
        .await?;
    let first = post_message(storage, realtime, caller, &ticket, &input.mensagem).await?;
    info!(ticket_id = %ticket.id, user_id = %caller.id, "support ticket opened");
    Ok(TicketThread {
        ticket,
        mensagens: vec![first],
    })
}

pub async fn thread(
    storage: &Storage,
    caller: &Profile,
    ticket_id: Uuid,
) -> Result<TicketThread, RdoError> {
    let ticket = visible_ticket(storage, caller, ticket_id).await?;
    let mensagens = storage.list_messages(ticket.id).await?;
    Ok(TicketThread { ticket, mensagens })
}

/// Store a message and push it to the other side of the conversation.
/// Admins answering someone else's ticket post as support staff.
pub async fn post_message(
    storage: &Storage,
    realtime: &RealtimeHandle,
    caller: &Profile,
    ticket: &SupportTicket,
    conteudo: &str,
) -> Result<SupportMessage, RdoError> {
    non_empty("conteudo", conteudo)?;
    if ticket.status == TicketStatus::Fechado {
        return Err(RdoError::BadRequest("ticket is closed".to_string()));
    }
    let from_admin = caller.is_admin() && ticket.user_id != caller.id;
    let message = storage
        .insert_message(ticket.id, caller.id, from_admin, conteudo.trim())
        .await?;

    let audience = if from_admin {
        Audience::User(ticket.user_id)
    } else {
        Audience::Admins
    };
    realtime.publish(
        audience,
        SupportEvent {
            ticket_id: ticket.id,
            message: message.clone(),
        },
    );
    Ok(message)
}

/// Mark the other side's messages on a ticket as read.
pub async fn mark_read(
    storage: &Storage,
    caller: &Profile,
    ticket_id: Uuid,
) -> Result<u64, RdoError> {
    let ticket = visible_ticket(storage, caller, ticket_id).await?;
    let reader_is_admin = caller.is_admin() && ticket.user_id != caller.id;
    storage.mark_messages_read(ticket.id, reader_is_admin).await
}

pub async fn unread_count(storage: &Storage, caller: &Profile) -> Result<i64, RdoError> {
    if caller.is_admin() {
        storage.unread_count_for_admins().await
    } else {
        storage.unread_count_for_user(caller.id).await
    }
}

/// Channel a caller listens on for new messages.
pub fn audience_for(caller: &Profile) -> Audience {
    if caller.is_admin() {
        Audience::Admins
    } else {
        Audience::User(caller.id)
    }
}

pub async fn close_ticket(
    storage: &Storage,
    caller: &Profile,
    ticket_id: Uuid,
) -> Result<SupportTicket, RdoError> {
    let ticket = visible_ticket(storage, caller, ticket_id).await?;
    storage.set_ticket_status(ticket.id, TicketStatus::Fechado).await
}
