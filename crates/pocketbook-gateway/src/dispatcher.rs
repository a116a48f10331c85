use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use pocketbook_types::events::GatewayEvent;

/// Routes notifications to connected users. Each user holds at most one
/// live connection; registering again replaces the previous one.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// Per-user targeted send channels: user_id -> (conn_id, sender)
    user_channels: RwLock<HashMap<Uuid, (Uuid, mpsc::UnboundedSender<GatewayEvent>)>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a per-user targeted channel. Returns (conn_id, receiver).
    /// Dropping the previous sender ends the older connection's loop.
    pub async fn register_user_channel(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let previous = self.inner.user_channels.write().await.insert(user_id, (conn_id, tx));
        if previous.is_some() {
            debug!("User {} reconnected; replacing older gateway connection", user_id);
        }
        (conn_id, rx)
    }

    /// Unregister a per-user targeted channel, but only if conn_id matches.
    pub async fn unregister_user_channel(&self, user_id: Uuid, conn_id: Uuid) {
        let mut channels = self.inner.user_channels.write().await;
        if let Some((stored_conn_id, _)) = channels.get(&user_id) {
            if *stored_conn_id == conn_id {
                channels.remove(&user_id);
            }
        }
    }

    /// Send a targeted event to a specific user. Offline users miss it.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let channels = self.inner.user_channels.read().await;
        if let Some((_, tx)) = channels.get(&user_id) {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn targeted_events_reach_only_their_user() {
        let dispatcher = Dispatcher::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (_, mut alice_rx) = dispatcher.register_user_channel(alice).await;
        let (_, mut bob_rx) = dispatcher.register_user_channel(bob).await;

        dispatcher
            .send_to_user(alice, GatewayEvent::MessagesRead { reader_id: bob, count: 2 })
            .await;

        assert!(matches!(
            alice_rx.recv().await,
            Some(GatewayEvent::MessagesRead { count: 2, .. })
        ));
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn reconnect_replaces_old_channel() {
        let dispatcher = Dispatcher::new();
        let alice = Uuid::new_v4();
        let (old_conn, mut old_rx) = dispatcher.register_user_channel(alice).await;
        let (_, mut new_rx) = dispatcher.register_user_channel(alice).await;

        // Old sender was dropped, so the old loop sees the channel close
        assert!(old_rx.recv().await.is_none());

        // A stale unregister must not evict the newer connection
        dispatcher.unregister_user_channel(alice, old_conn).await;
        dispatcher
            .send_to_user(alice, GatewayEvent::MessagesRead { reader_id: alice, count: 1 })
            .await;
        assert!(matches!(
            new_rx.recv().await,
            Some(GatewayEvent::MessagesRead { count: 1, .. })
        ));
    }
}
