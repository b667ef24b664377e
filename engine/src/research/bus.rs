//! Thought bus
//!
//! Pub/sub delivery of thought events to progress observers. The orchestrator
//! publishes; any number of display surfaces subscribe, either to one kind of
//! event or to all of them. Channels are bounded and publishing never waits
//! on a slow subscriber: a research run must not stall because nobody is
//! draining the progress stream.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use super::thought_log::{ThoughtEvent, ThoughtKind};

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Subscription filter
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Subscription {
    /// Only events of this kind
    Kind(ThoughtKind),
    /// Every event
    All,
}

/// Pub/sub hub for thought events
#[derive(Clone, Default)]
pub struct ThoughtBus {
    channels: Arc<Mutex<HashMap<Subscription, Vec<mpsc::Sender<ThoughtEvent>>>>>,
}

impl ThoughtBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to thought events matching `filter`.
    ///
    /// The returned receiver is bounded at `CHANNEL_BUFFER_SIZE`; events that
    /// do not fit are dropped for that subscriber only.
    pub async fn subscribe(&self, filter: Subscription) -> mpsc::Receiver<ThoughtEvent> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(filter).or_default().push(tx);
        rx
    }

    /// Publish an event to subscribers of its kind and to `All` subscribers.
    ///
    /// Subscribers whose receiver has been dropped are pruned.
    pub async fn publish(&self, event: &ThoughtEvent) {
        let mut channels = self.channels.lock().await;

        for filter in [Subscription::Kind(event.kind), Subscription::All] {
            if let Some(subscribers) = channels.get_mut(&filter) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("Thought subscriber lagging, dropped {} event", event.kind);
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }

    /// Number of live subscriptions
    pub async fn subscriber_count(&self) -> usize {
        let channels = self.channels.lock().await;
        channels.values().map(|subs| subs.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(kind: ThoughtKind, detail: &str) -> ThoughtEvent {
        ThoughtEvent {
            kind,
            detail: detail.to_string(),
            elapsed: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = ThoughtBus::new();
        let mut rx = bus.subscribe(Subscription::Kind(ThoughtKind::Initialize)).await;

        bus.publish(&event(ThoughtKind::Initialize, "3 passes")).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, ThoughtKind::Initialize);
        assert_eq!(received.detail, "3 passes");
    }

    #[tokio::test]
    async fn test_all_subscription() {
        let bus = ThoughtBus::new();
        let mut rx_all = bus.subscribe(Subscription::All).await;
        let mut rx_errors = bus.subscribe(Subscription::Kind(ThoughtKind::Error)).await;

        bus.publish(&event(ThoughtKind::PassStart, "INITIAL ANALYSIS"))
            .await;
        bus.publish(&event(ThoughtKind::Error, "rate limited")).await;

        assert_eq!(rx_all.recv().await.unwrap().kind, ThoughtKind::PassStart);
        assert_eq!(rx_all.recv().await.unwrap().kind, ThoughtKind::Error);

        assert_eq!(rx_errors.recv().await.unwrap().detail, "rate limited");
        assert!(rx_errors.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_never_blocks_on_full_subscriber() {
        let bus = ThoughtBus::new();
        let _rx = bus.subscribe(Subscription::All).await;

        let publish_all = async {
            for i in 0..CHANNEL_BUFFER_SIZE + 10 {
                bus.publish(&event(ThoughtKind::PassComplete, &i.to_string()))
                    .await;
            }
        };

        tokio::time::timeout(Duration::from_secs(1), publish_all)
            .await
            .expect("publish should not wait on a full channel");
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let bus = ThoughtBus::new();
        let rx = bus.subscribe(Subscription::All).await;
        assert_eq!(bus.subscriber_count().await, 1);

        drop(rx);
        bus.publish(&event(ThoughtKind::Complete, "done")).await;

        assert_eq!(bus.subscriber_count().await, 0);
    }
}
