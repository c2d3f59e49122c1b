use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use warden_types::events::GatewayEvent;

/// Fans committed mutations out to every connected subscriber.
///
/// Delivery is at-most-once and best-effort: there is no outbox, no retry and
/// no replay. The controller publishes only after the store commit succeeded,
/// so subscribers never observe a change that was not persisted; the reverse
/// does not hold — a commit whose publish finds no receivers is simply logged.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner { broadcast_tx }),
        }
    }

    /// Subscribe to mutation events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish one event for a committed mutation. Never fails the caller:
    /// a publish with no live subscribers is a non-fatal background condition.
    pub fn publish(&self, event: GatewayEvent) {
        if let Err(e) = self.inner.broadcast_tx.send(event) {
            debug!("No gateway subscribers for event: {}", e.0.guild_id().unwrap_or("-"));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.broadcast_tx.receiver_count()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_types::models::SelfAssignableRole;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish(GatewayEvent::SelfRoleCreate {
            role: SelfAssignableRole {
                guild_id: "g1".into(),
                role_id: "r1".into(),
            },
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.guild_id(), Some("g1"));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_swallowed() {
        let dispatcher = Dispatcher::new();
        // Must not panic or error back to the caller.
        dispatcher.publish(GatewayEvent::GuildDelete { guild_id: "g1".into() });
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        for id in ["a", "b", "c"] {
            dispatcher.publish(GatewayEvent::GuildDelete { guild_id: id.into() });
        }

        for expected in ["a", "b", "c"] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.guild_id(), Some(expected));
        }
    }
}
