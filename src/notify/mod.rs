// notify/mod.rs - Fan-out of normalized change events to subscribers
//
// Delivery is fire-and-forget, at-least-once: a lagging or dropped
// subscriber is skipped, never waited on.

use crate::types::NotifyMessage;
use log::debug;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Broadcast hub shared by all exchange services.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<NotifyMessage>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        NotificationHub { tx }
    }

    /// New subscription; events published before this call are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<NotifyMessage> {
        self.tx.subscribe()
    }

    /// Publish to every active subscriber. With no subscribers the event is
    /// simply dropped.
    pub fn publish(&self, message: NotifyMessage) {
        debug!("notify: {}", message.store_name());
        let _ = self.tx.send(message);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExchangeId, StorePayload};

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = NotificationHub::new();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.publish(NotifyMessage::store(
            ExchangeId::Bitget,
            StorePayload::Positions { positions: vec![] },
        ));

        assert_eq!(rx1.recv().await.unwrap().store_name(), "bitget.positions");
        assert_eq!(rx2.recv().await.unwrap().store_name(), "bitget.positions");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = NotificationHub::new();
        // Must not panic or block.
        hub.publish(NotifyMessage::store(
            ExchangeId::Bingx,
            StorePayload::Balance { balance: None },
        ));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_skipped() {
        let hub = NotificationHub::new();
        let rx = hub.subscribe();
        drop(rx);

        let mut live = hub.subscribe();
        hub.publish(NotifyMessage::store(
            ExchangeId::Kucoin,
            StorePayload::Trades { trades: vec![] },
        ));
        assert_eq!(live.recv().await.unwrap().store_name(), "kucoin.trades");
    }
}
