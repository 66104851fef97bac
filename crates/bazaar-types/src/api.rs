use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, DeviceClass, PersistedMessage, User, UserSummary};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub full_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: Option<String>,
    pub user: User,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: UserSummary,
    pub unread_count: u32,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: ConversationView,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub success: bool,
    pub conversations: Vec<ConversationView>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub total: u32,
    pub page: u32,
    pub limit: u32,
    pub pages: u32,
}

impl Pagination {
    pub fn new(total: u32, page: u32, limit: u32) -> Self {
        let pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self { total, page, limit, pages }
    }
}

#[derive(Debug, Serialize)]
pub struct MessagePage {
    pub success: bool,
    /// Oldest first.
    pub messages: Vec<PersistedMessage>,
    pub pagination: Pagination,
}

// -- Device endpoints --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub token: String,
    pub device_type: Option<DeviceClass>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDeviceRequest {
    pub token: String,
}

// -- Listings --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub success: bool,
    pub is_favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}
