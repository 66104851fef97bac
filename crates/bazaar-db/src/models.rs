//! Database row types. These map directly to SQLite rows; `into_*` converts
//! them into the shared domain types from `bazaar-types`.

use anyhow::{Result, anyhow};
use bazaar_types::models::{
    Conversation, DeviceClass, DeviceEndpoint, Listing, ListingStatus, PersistedMessage, User,
    UserSummary,
};
use uuid::Uuid;

use crate::parse_timestamp;

pub struct UserRow {
    pub id: String,
    pub subject: String,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub avatar: Option<String>,
    pub created_at: String,
}

pub struct ListingRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub price: String,
    pub status: String,
    pub expires_at: Option<String>,
}

pub struct ConversationRow {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub listing_id: String,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

/// A conversation as seen by one participant, with the other side's display
/// attributes and the viewer's unread count.
pub struct ConversationSummaryRow {
    pub conversation: ConversationRow,
    pub other_user_id: String,
    pub other_full_name: String,
    pub other_avatar: Option<String>,
    pub unread_count: u32,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
    pub sender_full_name: String,
    pub sender_avatar: Option<String>,
}

pub struct DeviceEndpointRow {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub device_class: String,
    pub is_active: bool,
}

fn uuid(field: &str, raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| anyhow!("corrupt {} '{}': {}", field, raw, e))
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: uuid("user id", &self.id)?,
            subject: self.subject,
            email: self.email,
            full_name: self.full_name,
            phone_number: self.phone_number,
            avatar: self.avatar,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }

    pub fn summary(&self) -> Result<UserSummary> {
        Ok(UserSummary {
            id: uuid("user id", &self.id)?,
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
        })
    }
}

impl ListingRow {
    pub fn into_listing(self) -> Result<Listing> {
        Ok(Listing {
            id: uuid("listing id", &self.id)?,
            owner_id: uuid("owner id", &self.owner_id)?,
            status: ListingStatus::parse(&self.status)
                .ok_or_else(|| anyhow!("unknown listing status '{}'", self.status))?,
            expires_at: self.expires_at.as_deref().map(parse_timestamp).transpose()?,
            title: self.title,
            price: self.price,
        })
    }
}

impl ConversationRow {
    pub fn into_conversation(self) -> Result<Conversation> {
        Ok(Conversation {
            id: uuid("conversation id", &self.id)?,
            user1_id: uuid("user1_id", &self.user1_id)?,
            user2_id: uuid("user2_id", &self.user2_id)?,
            listing_id: uuid("listing id", &self.listing_id)?,
            last_message_at: self.last_message_at.as_deref().map(parse_timestamp).transpose()?,
            last_message: self.last_message,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<PersistedMessage> {
        let sender_id = uuid("sender id", &self.sender_id)?;
        Ok(PersistedMessage {
            id: uuid("message id", &self.id)?,
            conversation_id: uuid("conversation id", &self.conversation_id)?,
            sender_id,
            receiver_id: uuid("receiver id", &self.receiver_id)?,
            message: self.body,
            is_read: self.is_read,
            created_at: parse_timestamp(&self.created_at)?,
            read_at: self.read_at.as_deref().map(parse_timestamp).transpose()?,
            sender: UserSummary {
                id: sender_id,
                full_name: self.sender_full_name,
                avatar: self.sender_avatar,
            },
        })
    }
}

impl DeviceEndpointRow {
    pub fn into_endpoint(self) -> Result<DeviceEndpoint> {
        Ok(DeviceEndpoint {
            id: uuid("endpoint id", &self.id)?,
            user_id: uuid("user id", &self.user_id)?,
            device_class: DeviceClass::parse(&self.device_class).unwrap_or_default(),
            token: self.token,
            is_active: self.is_active,
        })
    }
}
