use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use bazaar_types::events::ServerEvent;

use crate::router::{ConnId, ConversationRouter};

/// Which users currently have a live connection, and which one.
///
/// At most one entry per user. A newer connection replaces the old entry,
/// and a late disconnect from the replaced connection leaves it alone.
#[derive(Clone)]
pub struct PresenceRegistry {
    entries: Arc<RwLock<HashMap<Uuid, ConnId>>>,
    router: ConversationRouter,
}

impl PresenceRegistry {
    pub fn new(router: ConversationRouter) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            router,
        }
    }

    /// Record `conn_id` as the user's live connection and announce it.
    /// Returns the connection it replaced, if any.
    pub async fn register(&self, user_id: Uuid, conn_id: ConnId) -> Option<ConnId> {
        let previous = self.entries.write().await.insert(user_id, conn_id);
        if let Some(prev) = previous {
            debug!("User {} reconnected, replacing connection {}", user_id, prev);
        }
        info!("User {} online ({})", user_id, conn_id);
        self.router.broadcast_all(ServerEvent::UserOnline { user_id }).await;
        previous
    }

    /// Remove the user's entry only if it still points at `conn_id`.
    /// Returns true (and announces offline) when an entry was removed.
    pub async fn unregister(&self, user_id: Uuid, conn_id: ConnId) -> bool {
        let removed = {
            let mut entries = self.entries.write().await;
            if entries.get(&user_id) == Some(&conn_id) {
                entries.remove(&user_id);
                true
            } else {
                false
            }
        };

        if removed {
            info!("User {} offline", user_id);
            self.router.broadcast_all(ServerEvent::UserOffline { user_id }).await;
        } else {
            debug!("Stale disconnect for user {} on {}, ignoring", user_id, conn_id);
        }
        removed
    }

    pub async fn lookup(&self, user_id: Uuid) -> Option<ConnId> {
        self.entries.read().await.get(&user_id).copied()
    }

    pub async fn online_users(&self) -> Vec<Uuid> {
        self.entries.read().await.keys().copied().collect()
    }
}
