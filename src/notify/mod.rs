//! Observer notification fan-out
//!
//! Fire-and-forget, at-least-once delivery keyed by topic + count. The
//! transport that pushes notifications to connected clients lives in an
//! outer layer; it subscribes to the broadcast channel exposed here.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::analysis::Notifier;

/// Notification topics observed by outer layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyTopic {
    /// One or more events changed (re-stats or new analysis persisted)
    EventsUpdated,
    /// One or more usage log rows were appended
    UsageUpdated,
}

impl NotifyTopic {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotifyTopic::EventsUpdated => "events-updated",
            NotifyTopic::UsageUpdated => "usage-updated",
        }
    }
}

impl std::fmt::Display for NotifyTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One notification: a topic and how many records it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub topic: NotifyTopic,
    pub count: usize,
}

/// Broadcast-channel notifier.
///
/// Sends never fail the pipeline: with no subscribers (or lagging ones)
/// the notification is simply dropped, which is acceptable for a
/// fire-and-forget change signal.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe an observer. Each subscriber sees every notification sent
    /// after its subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn send(&self, topic: NotifyTopic, count: usize) {
        let delivered = self.tx.send(Notification { topic, count }).is_ok();
        debug!(topic = %topic, count, delivered, "Notification dispatched");
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify(&self, topic: NotifyTopic, count: usize) {
        self.send(topic, count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_in_order() {
        tokio_test::block_on(async {
            let notifier = BroadcastNotifier::new(8);
            let mut rx = notifier.subscribe();

            notifier.send(NotifyTopic::EventsUpdated, 1);
            notifier.send(NotifyTopic::UsageUpdated, 1);

            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            assert_eq!(first.topic, NotifyTopic::EventsUpdated);
            assert_eq!(second.topic, NotifyTopic::UsageUpdated);
        });
    }

    #[test]
    fn send_without_subscribers_is_silent() {
        let notifier = BroadcastNotifier::new(8);
        notifier.send(NotifyTopic::UsageUpdated, 1);
    }
}
