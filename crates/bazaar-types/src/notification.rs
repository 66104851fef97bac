use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// A notification-worthy occurrence. Each variant carries exactly what its
/// template needs, and `render` is an exhaustive match so a new variant cannot
/// ship without a template.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    NewMessage {
        sender_id: Uuid,
        sender_name: String,
        conversation_id: Uuid,
        message: String,
    },
    NewOffer {
        listing_id: Uuid,
        listing_title: String,
        conversation_id: Uuid,
    },
    ListingSold {
        listing_id: Uuid,
        listing_title: String,
    },
    ListingFavorited {
        listing_id: Uuid,
        listing_title: String,
        user_name: String,
    },
    ListingExpiring {
        listing_id: Uuid,
        listing_title: String,
        days_left: i64,
    },
    PriceDrop {
        listing_id: Uuid,
        listing_title: String,
        new_price: String,
    },
    System {
        title: String,
        body: String,
    },
}

/// Title, body and data payload handed to the push gateway.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedNotification {
    pub title: String,
    pub body: String,
    pub data: Value,
}

/// Android notification channel the push lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelClass {
    Messages,
    Default,
}

impl ChannelClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Default => "default",
        }
    }
}

impl NotificationEvent {
    /// Stable tag written into the `type` field of the data payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::NewOffer { .. } => "new_offer",
            Self::ListingSold { .. } => "listing_sold",
            Self::ListingFavorited { .. } => "listing_favorited",
            Self::ListingExpiring { .. } => "listing_expiring",
            Self::PriceDrop { .. } => "price_drop",
            Self::System { .. } => "system",
        }
    }

    pub fn channel_class(&self) -> ChannelClass {
        match self {
            Self::NewMessage { .. } => ChannelClass::Messages,
            _ => ChannelClass::Default,
        }
    }

    pub fn render(&self) -> RenderedNotification {
        let kind = self.kind();
        let (title, body, data) = match self {
            Self::NewMessage {
                sender_id,
                sender_name,
                conversation_id,
                message,
            } => (
                sender_name.clone(),
                message.clone(),
                json!({ "type": kind, "conversationId": conversation_id, "senderId": sender_id }),
            ),
            Self::NewOffer {
                listing_id,
                listing_title,
                conversation_id,
            } => (
                "New Offer on Your Listing".to_string(),
                format!("Someone is interested in \"{}\"", listing_title),
                json!({ "type": kind, "listingId": listing_id, "conversationId": conversation_id }),
            ),
            Self::ListingSold {
                listing_id,
                listing_title,
            } => (
                "Listing Marked as Sold".to_string(),
                format!("Your listing \"{}\" has been marked as sold", listing_title),
                json!({ "type": kind, "listingId": listing_id }),
            ),
            Self::ListingFavorited {
                listing_id,
                listing_title,
                user_name,
            } => (
                "Someone Liked Your Listing".to_string(),
                format!("{} favorited \"{}\"", user_name, listing_title),
                json!({ "type": kind, "listingId": listing_id }),
            ),
            Self::ListingExpiring {
                listing_id,
                listing_title,
                days_left,
            } => (
                "Listing Expiring Soon".to_string(),
                format!("Your listing \"{}\" expires in {} days", listing_title, days_left),
                json!({ "type": kind, "listingId": listing_id }),
            ),
            Self::PriceDrop {
                listing_id,
                listing_title,
                new_price,
            } => (
                "Price Drop Alert!".to_string(),
                format!("\"{}\" price reduced to Rs {}", listing_title, new_price),
                json!({ "type": kind, "listingId": listing_id }),
            ),
            Self::System { title, body } => (title.clone(), body.clone(), json!({ "type": kind })),
        };

        RenderedNotification { title, body, data }
    }
}
