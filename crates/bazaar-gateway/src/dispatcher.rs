use tokio::sync::mpsc;
use uuid::Uuid;

use bazaar_types::events::ServerEvent;

use crate::presence::PresenceRegistry;
use crate::router::{ConnId, ConversationRouter};

/// Ties the presence registry to the conversation router so connect and
/// disconnect update both in the right order.
#[derive(Clone)]
pub struct Dispatcher {
    router: ConversationRouter,
    presence: PresenceRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        let router = ConversationRouter::new();
        let presence = PresenceRegistry::new(router.clone());
        Self { router, presence }
    }

    pub fn router(&self) -> &ConversationRouter {
        &self.router
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Open a connection for `user_id`. Returns (conn_id, receiver).
    pub async fn connect(&self, user_id: Uuid) -> (ConnId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.router.attach(conn_id, tx).await;
        self.presence.register(user_id, conn_id).await;
        (conn_id, rx)
    }

    /// Tear down a connection. Channel memberships go first so nothing is
    /// routed to it after the user is announced offline.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: ConnId) -> bool {
        self.router.drop_connection(conn_id).await;
        self.presence.unregister(user_id, conn_id).await
    }

    /// Send a targeted event to the user's live connection, if any.
    pub async fn send_to_user(&self, user_id: Uuid, event: ServerEvent) -> bool {
        match self.presence.lookup(user_id).await {
            Some(conn_id) => self.router.send_to(conn_id, event).await,
            None => false,
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
