use std::sync::Arc;

use bazaar_db::Database;
use bazaar_gateway::Dispatcher;
use bazaar_gateway::auth::{Authenticator, ExpiryPolicy, IdentityResolver, TokenVerifier};
use bazaar_gateway::chat::ChatService;
use bazaar_gateway::connection::GatewayContext;
use bazaar_gateway::pipeline::MessagePipeline;
use bazaar_notify::NotificationQueue;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub auth: Authenticator,
    pub gateway: GatewayContext,
    pub notifications: NotificationQueue,
}

impl AppStateInner {
    /// Wire every service around one store and one notification queue.
    pub fn new(db: Arc<Database>, expiry: ExpiryPolicy, notifications: NotificationQueue) -> AppState {
        let dispatcher = Dispatcher::new();
        let auth = Authenticator::new(TokenVerifier::new(expiry), IdentityResolver::new(db.clone()));
        let gateway = GatewayContext {
            chat: ChatService::new(db.clone()),
            pipeline: MessagePipeline::new(db.clone(), dispatcher.clone(), notifications.clone()),
            dispatcher,
        };
        Arc::new(Self {
            db,
            auth,
            gateway,
            notifications,
        })
    }
}
