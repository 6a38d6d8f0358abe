use crate::db::models::SupportMessage;
use crate::error::RdoError;

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-channel buffer. Subscribers that fall further behind lose events.
const CHANNEL_CAPACITY: usize = 64;

/// Who a realtime event is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    User(Uuid),
    Admins,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportEvent {
    pub ticket_id: Uuid,
    pub message: SupportMessage,
}

#[derive(Debug)]
pub enum RealtimeMessage {
    /// Open a receiver on the audience's channel, creating it if needed.
    Subscribe(Audience, RpcReplyPort<broadcast::Receiver<SupportEvent>>),
    /// Fan an event out to whoever is listening; dropped if nobody is.
    Publish(Audience, SupportEvent),
    /// Number of channels currently held.
    ChannelCount(RpcReplyPort<usize>),
}

/// Handle for interacting with the realtime hub.
#[derive(Clone)]
pub struct RealtimeHandle {
    actor: ActorRef<RealtimeMessage>,
}

impl RealtimeHandle {
    pub async fn subscribe(
        &self,
        audience: Audience,
    ) -> Result<broadcast::Receiver<SupportEvent>, RdoError> {
        ractor::call!(self.actor, RealtimeMessage::Subscribe, audience)
            .map_err(|e| RdoError::RactorError(format!("Subscribe RPC failed: {e}")))
    }

    pub fn publish(&self, audience: Audience, event: SupportEvent) {
        let _ = ractor::cast!(self.actor, RealtimeMessage::Publish(audience, event));
    }

    pub async fn channel_count(&self) -> Result<usize, RdoError> {
        ractor::call!(self.actor, RealtimeMessage::ChannelCount)
            .map_err(|e| RdoError::RactorError(format!("ChannelCount RPC failed: {e}")))
    }
}

struct RealtimeState {
    channels: HashMap<Audience, broadcast::Sender<SupportEvent>>,
}

struct RealtimeActor;

#[ractor::async_trait]
impl Actor for RealtimeActor {
    type Msg = RealtimeMessage;
    type State = RealtimeState;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _arguments: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        info!("RealtimeActor started");
        Ok(RealtimeState {
            channels: HashMap::new(),
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RealtimeMessage::Subscribe(audience, rp) => {
                // Closed SSE streams leave senders nobody reads from.
                state.channels.retain(|_, tx| tx.receiver_count() > 0);
                let rx = state
                    .channels
                    .entry(audience)
                    .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                    .subscribe();
                debug!(?audience, channels = state.channels.len(), "realtime subscribe");
                let _ = rp.send(rx);
            }
            RealtimeMessage::Publish(audience, event) => {
                let Some(tx) = state.channels.get(&audience) else {
                    return Ok(());
                };
                match tx.send(event) {
                    Ok(n) => debug!(?audience, receivers = n, "realtime event published"),
                    Err(_) => {
                        // Every receiver is gone; forget the channel.
                        state.channels.remove(&audience);
                    }
                }
            }
            RealtimeMessage::ChannelCount(rp) => {
                let _ = rp.send(state.channels.len());
            }
        }
        Ok(())
    }
}

/// Spawn the realtime hub and return a handle to it.
pub async fn spawn() -> Result<RealtimeHandle, RdoError> {
    let (actor, _jh) = Actor::spawn(None, RealtimeActor, ())
        .await
        .map_err(|e| RdoError::RactorError(format!("failed to spawn RealtimeActor: {e}")))?;
    Ok(RealtimeHandle { actor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(ticket_id: Uuid) -> SupportEvent {
        SupportEvent {
            ticket_id,
            message: SupportMessage {
                id: Uuid::new_v4(),
                ticket_id,
                sender_id: Uuid::new_v4(),
                from_admin: true,
                conteudo: "Olá".to_string(),
                lido: false,
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn delivers_only_to_the_addressed_audience() {
        let hub = spawn().await.unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let mut rx_alice = hub.subscribe(Audience::User(alice)).await.unwrap();
        let mut rx_bob = hub.subscribe(Audience::User(bob)).await.unwrap();

        let ticket = Uuid::new_v4();
        hub.publish(Audience::User(alice), event(ticket));

        let got = rx_alice.recv().await.unwrap();
        assert_eq!(got.ticket_id, ticket);
        assert!(matches!(
            rx_bob.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn abandoned_channels_are_pruned_on_subscribe() {
        let hub = spawn().await.unwrap();
        for _ in 0..10 {
            let rx = hub.subscribe(Audience::User(Uuid::new_v4())).await.unwrap();
            drop(rx);
        }
        let _admins = hub.subscribe(Audience::Admins).await.unwrap();
        assert_eq!(hub.channel_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn publishing_without_listeners_is_harmless() {
        let hub = spawn().await.unwrap();
        hub.publish(Audience::Admins, event(Uuid::new_v4()));
        let mut rx = hub.subscribe(Audience::Admins).await.unwrap();
        let ticket = Uuid::new_v4();
        hub.publish(Audience::Admins, event(ticket));
        assert_eq!(rx.recv().await.unwrap().ticket_id, ticket);
    }
}
