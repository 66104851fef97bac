use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use bazaar_db::{Database, format_timestamp};
use bazaar_notify::NotificationQueue;
use bazaar_types::events::ServerEvent;
use bazaar_types::models::PersistedMessage;
use bazaar_types::notification::NotificationEvent;

use crate::dispatcher::Dispatcher;
use crate::error::{CoreError, blocking};

/// Persist, broadcast, then notify. Once the message is stored the send has
/// succeeded; delivery problems after that point are logged, never returned.
#[derive(Clone)]
pub struct MessagePipeline {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    notifications: NotificationQueue,
    /// Held from commit through channel broadcast, so members see messages
    /// in the order they were stored.
    commit_order: Arc<Mutex<()>>,
}

impl MessagePipeline {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, notifications: NotificationQueue) -> Self {
        Self {
            db,
            dispatcher,
            notifications,
            commit_order: Arc::new(Mutex::new(())),
        }
    }

    pub async fn send(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: &str,
    ) -> Result<PersistedMessage, CoreError> {
        if body.trim().is_empty() {
            return Err(CoreError::Validation("Message cannot be empty".into()));
        }
        if sender_id == receiver_id {
            return Err(CoreError::Validation("Cannot send a message to yourself".into()));
        }

        let db = self.db.clone();
        let conversation = blocking(move || db.get_conversation(&conversation_id.to_string()))
            .await?
            .ok_or(CoreError::NotFound("conversation"))?
            .into_conversation()?;
        if !conversation.has_participant(sender_id) || !conversation.has_participant(receiver_id) {
            return Err(CoreError::Validation("sender and receiver must both be in the conversation".into()));
        }

        // Past validation the send runs on its own task: a caller that goes
        // away (socket teardown aborts the reader) cannot stop a committed
        // message from being broadcast and pushed.
        let pipeline = self.clone();
        let body = body.to_string();
        tokio::spawn(async move { pipeline.deliver(conversation_id, sender_id, receiver_id, body).await })
            .await
            .map_err(|e| anyhow::anyhow!("message delivery task failed: {}", e))?
    }

    async fn deliver(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: String,
    ) -> Result<PersistedMessage, CoreError> {
        let message = {
            let _ordered = self.commit_order.lock().await;

            let db = self.db.clone();
            let message = blocking(move || {
                let id = Uuid::new_v4().to_string();
                db.append_message(
                    &id,
                    &conversation_id.to_string(),
                    &sender_id.to_string(),
                    &receiver_id.to_string(),
                    &body,
                    &format_timestamp(Utc::now()),
                )?;
                db.get_message(&id)?
                    .ok_or_else(|| anyhow::anyhow!("message {} missing after insert", id))
            })
            .await?
            .into_message()?;

            let delivered = self
                .dispatcher
                .router()
                .broadcast(conversation_id, ServerEvent::NewMessage(message.clone()))
                .await;
            debug!("Message {} delivered to {} joined connections", message.id, delivered);
            message
        };

        self.notify_receiver(&message).await;
        Ok(message)
    }

    /// A connected receiver gets a targeted heads-up; an absent one gets a push.
    async fn notify_receiver(&self, message: &PersistedMessage) {
        match self.dispatcher.presence().lookup(message.receiver_id).await {
            Some(conn_id) => {
                let event = ServerEvent::MessageNotification {
                    conversation_id: message.conversation_id,
                    message: message.clone(),
                };
                if !self.dispatcher.router().send_to(conn_id, event).await {
                    warn!("Receiver {} connection {} closed mid-send", message.receiver_id, conn_id);
                }
            }
            None => {
                self.notifications.enqueue(
                    message.receiver_id,
                    NotificationEvent::NewMessage {
                        sender_id: message.sender_id,
                        sender_name: message.sender.full_name.clone(),
                        conversation_id: message.conversation_id,
                        message: message.message.clone(),
                    },
                );
            }
        }
    }
}
