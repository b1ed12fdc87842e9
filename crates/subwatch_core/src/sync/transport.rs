//! Surface-to-surface event transport.
//!
//! The real IPC layer implements `EventTransport`; `MemoryTransport` is the
//! in-process version used by single-process hosts and tests.

use crate::sync::event::BroadcastEvent;
use async_trait::async_trait;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::broadcast;

/// Reliable, per-sender ordered, at-least-once event channel.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn send(&self, event: BroadcastEvent) -> Result<(), TransportError>;

    /// Opens one inbox. Each surface subscribes exactly once.
    fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Closed,
    Send(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "event transport is closed"),
            Self::Send(reason) => write!(f, "event send failed: {reason}"),
        }
    }
}

impl Error for TransportError {}

/// In-process broadcast transport.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl MemoryTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn inbox_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventTransport for MemoryTransport {
    async fn send(&self, event: BroadcastEvent) -> Result<(), TransportError> {
        // No receivers is not an error: the sender may be the only surface.
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!("event=transport_send module=sync status=ok receivers={receivers}");
            }
            Err(_) => {
                debug!("event=transport_send module=sync status=ok receivers=0");
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::{EventTransport, MemoryTransport};
    use crate::model::task::SubscriptionTask;
    use crate::sync::event::{BroadcastEvent, SurfaceId};

    #[tokio::test]
    async fn delivers_to_every_inbox_in_order() {
        let transport = MemoryTransport::new(8);
        let mut first = transport.subscribe();
        let mut second = transport.subscribe();
        let origin = SurfaceId::new();

        for action in ["subscribe:chain:timestamp", "subscribe:chain:currentBlock"] {
            let task = SubscriptionTask::new("Polkadot", action, "Chain");
            transport
                .send(BroadcastEvent::upsert(origin, task))
                .await
                .expect("send should succeed");
        }

        for inbox in [&mut first, &mut second] {
            let a = inbox.recv().await.expect("first event");
            let b = inbox.recv().await.expect("second event");
            assert_eq!(a.task.action, "subscribe:chain:timestamp");
            assert_eq!(b.task.action, "subscribe:chain:currentBlock");
        }
    }

    #[tokio::test]
    async fn send_without_inboxes_succeeds() {
        let transport = MemoryTransport::new(4);
        let task = SubscriptionTask::new("Polkadot", "subscribe:chain:timestamp", "Chain");
        transport
            .send(BroadcastEvent::upsert(SurfaceId::new(), task))
            .await
            .expect("send without receivers is fine");
        assert_eq!(transport.inbox_count(), 0);
    }
}
