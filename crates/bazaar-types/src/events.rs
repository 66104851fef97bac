use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PersistedMessage;

/// Events sent FROM server TO client over the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A user opened a connection
    UserOnline { user_id: Uuid },

    /// A user's live connection went away
    UserOffline { user_id: Uuid },

    /// A message was persisted in a conversation the client has joined
    NewMessage(PersistedMessage),

    /// Targeted heads-up to a connected receiver, independent of channel membership
    MessageNotification {
        conversation_id: Uuid,
        message: PersistedMessage,
    },

    /// Acknowledgement to the sender
    MessageSent {
        success: bool,
        message: PersistedMessage,
    },

    /// Send failed; nothing was broadcast
    MessageError { error: String },

    UserTyping { conversation_id: Uuid, user_id: Uuid },

    UserStopTyping { conversation_id: Uuid, user_id: Uuid },
}

impl ServerEvent {
    /// Wire name of the event, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserOnline { .. } => "user-online",
            Self::UserOffline { .. } => "user-offline",
            Self::NewMessage(_) => "new-message",
            Self::MessageNotification { .. } => "message-notification",
            Self::MessageSent { .. } => "message-sent",
            Self::MessageError { .. } => "message-error",
            Self::UserTyping { .. } => "user-typing",
            Self::UserStopTyping { .. } => "user-stop-typing",
        }
    }
}

/// Commands sent FROM client TO server over the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinConversation(Uuid),

    LeaveConversation(Uuid),

    SendMessage {
        conversation_id: Uuid,
        receiver_id: Uuid,
        message: String,
    },

    Typing {
        conversation_id: Uuid,
        receiver_id: Uuid,
    },

    StopTyping {
        conversation_id: Uuid,
        receiver_id: Uuid,
    },
}
