//! Monitor event hub.
//!
//! Delay updates and auto-filed claims are published to a broadcast channel
//! that interested clients consume over a WebSocket. The hub is injected
//! through application state; nothing holds notification state at module
//! level.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_BUFFER: usize = 64;

/// Event emitted by the delay monitor
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    TicketDelayUpdated {
        ticket_id: Uuid,
        user_id: Uuid,
        delay_minutes: i32,
    },
    ClaimCreated {
        claim_id: Uuid,
        ticket_id: Uuid,
        user_id: Uuid,
        amount: i32,
    },
}

/// Shared broadcast hub for monitor events
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<MonitorEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Publish an event to all subscribers. Lagging or absent subscribers
    /// are not an error.
    pub fn publish(&self, event: MonitorEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

/// Forward monitor events to one WebSocket client until it disconnects.
pub async fn stream_events(socket: WebSocket, notifier: Notifier) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = notifier.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    // dropped messages on lag; resubscription not needed
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "websocket client lagged behind monitor events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("failed to serialize monitor event: {e}");
                        continue;
                    }
                };

                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // clients only listen; ignore anything else they send
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        let user_id = Uuid::new_v4();
        let ticket_id = Uuid::new_v4();
        notifier.publish(MonitorEvent::TicketDelayUpdated {
            ticket_id,
            user_id,
            delay_minutes: 65,
        });

        match rx.recv().await.unwrap() {
            MonitorEvent::TicketDelayUpdated { delay_minutes, .. } => {
                assert_eq!(delay_minutes, 65);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publishing_without_subscribers_is_not_an_error() {
        let notifier = Notifier::new();
        notifier.publish(MonitorEvent::ClaimCreated {
            claim_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: 145,
        });
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = MonitorEvent::ClaimCreated {
            claim_id: Uuid::nil(),
            ticket_id: Uuid::nil(),
            user_id: Uuid::nil(),
            amount: 145,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"claim_created""#));
        assert!(json.contains(r#""amount":145"#));
    }
}
