use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use bazaar_types::events::ServerEvent;

/// Identifies one live socket. A user may hold several over time.
pub type ConnId = Uuid;

/// Conversation channel membership plus the outbound pipe of every live
/// connection.
#[derive(Clone, Default)]
pub struct ConversationRouter {
    inner: Arc<RwLock<RouterState>>,
}

#[derive(Default)]
struct RouterState {
    connections: HashMap<ConnId, mpsc::UnboundedSender<ServerEvent>>,
    /// conversation_id -> joined connections
    channels: HashMap<Uuid, HashSet<ConnId>>,
    /// conn_id -> joined conversations, for cleanup on disconnect
    memberships: HashMap<ConnId, HashSet<Uuid>>,
}

impl ConversationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, conn_id: ConnId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.inner.write().await.connections.insert(conn_id, tx);
    }

    /// Forget the connection and every channel it joined. Returns how many
    /// channels it was removed from.
    pub async fn drop_connection(&self, conn_id: ConnId) -> usize {
        let mut state = self.inner.write().await;
        state.connections.remove(&conn_id);
        let joined = state.memberships.remove(&conn_id).unwrap_or_default();
        for conversation_id in &joined {
            if let Some(members) = state.channels.get_mut(conversation_id) {
                members.remove(&conn_id);
                if members.is_empty() {
                    state.channels.remove(conversation_id);
                }
            }
        }
        joined.len()
    }

    /// Idempotent. Returns false for a connection that is not attached.
    pub async fn join(&self, conn_id: ConnId, conversation_id: Uuid) -> bool {
        let mut state = self.inner.write().await;
        if !state.connections.contains_key(&conn_id) {
            return false;
        }
        state.channels.entry(conversation_id).or_default().insert(conn_id);
        state.memberships.entry(conn_id).or_default().insert(conversation_id);
        debug!("Connection {} joined conversation {}", conn_id, conversation_id);
        true
    }

    /// Leaving a channel never joined is a no-op.
    pub async fn leave(&self, conn_id: ConnId, conversation_id: Uuid) -> bool {
        let mut state = self.inner.write().await;
        let removed = match state.channels.get_mut(&conversation_id) {
            Some(members) => {
                let removed = members.remove(&conn_id);
                if members.is_empty() {
                    state.channels.remove(&conversation_id);
                }
                removed
            }
            None => false,
        };
        if let Some(joined) = state.memberships.get_mut(&conn_id) {
            joined.remove(&conversation_id);
        }
        removed
    }

    /// Deliver to every connection joined to the conversation at call time.
    /// Returns the number of connections the event was handed to.
    pub async fn broadcast(&self, conversation_id: Uuid, event: ServerEvent) -> usize {
        let state = self.inner.read().await;
        let Some(members) = state.channels.get(&conversation_id) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|conn_id| state.connections.get(conn_id))
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Deliver to every live connection regardless of membership.
    pub async fn broadcast_all(&self, event: ServerEvent) -> usize {
        let state = self.inner.read().await;
        state
            .connections
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    pub async fn send_to(&self, conn_id: ConnId, event: ServerEvent) -> bool {
        let state = self.inner.read().await;
        match state.connections.get(&conn_id) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}
