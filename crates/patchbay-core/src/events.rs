// ── Routing event bus ──
//
// Bounded broadcast of connection and status changes. Publishing never
// blocks: when the ring is full the oldest event is overwritten, and a
// subscriber that fell behind is told how many it missed before it
// resumes with the oldest retained event.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use strum::Display;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::trace;

use crate::model::{BridgeHealth, ConnectionKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChangeAction {
    Connected,
    Disconnected,
    Cleared,
    Restored,
    PresetApplied,
}

/// Detail of a `ConnectionChanged` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionChange {
    pub action: ChangeAction,
    /// The affected pair, for single-connection actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ConnectionChange {
    pub fn pair(action: ChangeAction, key: ConnectionKey) -> Self {
        Self {
            action,
            connection: Some(key),
            detail: None,
        }
    }

    pub fn detail(action: ChangeAction, detail: impl Into<String>) -> Self {
        Self {
            action,
            connection: None,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum RoutingEvent {
    ConnectionChanged(ConnectionChange),
    StatusChanged(BridgeHealth),
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Event(Arc<RoutingEvent>),
    /// The subscriber lagged and this many events were overwritten.
    Missed(u64),
}

/// Fire-and-forget publisher. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Arc<RoutingEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: RoutingEvent) {
        let receivers = self.tx.send(Arc::new(event)).unwrap_or(0);
        trace!(receivers, "event published");
    }

    pub(crate) fn connection_changed(&self, change: ConnectionChange) {
        self.publish(RoutingEvent::ConnectionChanged(change));
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A live subscription. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) detaches from the bus.
pub struct Subscription {
    rx: broadcast::Receiver<Arc<RoutingEvent>>,
}

impl Subscription {
    /// Wait for the next delivery. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        match self.rx.recv().await {
            Ok(event) => Some(Delivery::Event(event)),
            Err(RecvError::Lagged(n)) => Some(Delivery::Missed(n)),
            Err(RecvError::Closed) => None,
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` when nothing
    /// is queued or the bus is gone.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        match self.rx.try_recv() {
            Ok(event) => Some(Delivery::Event(event)),
            Err(TryRecvError::Lagged(n)) => Some(Delivery::Missed(n)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> impl Stream<Item = Delivery> + Send + Unpin {
        BroadcastStream::new(self.rx).map(|item| match item {
            Ok(event) => Delivery::Event(event),
            Err(BroadcastStreamRecvError::Lagged(n)) => Delivery::Missed(n),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cleared(n: u32) -> RoutingEvent {
        RoutingEvent::ConnectionChanged(ConnectionChange::detail(
            ChangeAction::Cleared,
            n.to_string(),
        ))
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new(4);
        bus.publish(cleared(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn lagging_subscriber_is_told_what_it_missed() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for n in 0..5 {
            bus.publish(cleared(n));
        }

        // Capacity 2: events 0..=2 were overwritten, 3 and 4 remain.
        assert_eq!(sub.try_recv(), Some(Delivery::Missed(3)));
        assert_eq!(sub.try_recv(), Some(Delivery::Event(Arc::new(cleared(3)))));
        assert_eq!(sub.try_recv(), Some(Delivery::Event(Arc::new(cleared(4)))));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn unsubscribe_detaches() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn stream_yields_events() {
        let bus = EventBus::new(4);
        let mut stream = bus.subscribe().into_stream();
        bus.publish(cleared(7));
        assert_eq!(
            stream.next().await,
            Some(Delivery::Event(Arc::new(cleared(7))))
        );
    }

    #[test]
    fn events_serialize_tagged() {
        let json = serde_json::to_value(RoutingEvent::ConnectionChanged(ConnectionChange::pair(
            ChangeAction::Connected,
            ConnectionKey::new("a:out", "b:in"),
        )))
        .unwrap();
        assert_eq!(json["type"], "connection_changed");
        assert_eq!(json["detail"]["action"], "connected");
        assert_eq!(json["detail"]["connection"]["from"], "a:out");
    }
}
