use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use bazaar_gateway::chat::DEFAULT_PAGE_SIZE;
use bazaar_types::api::{ConversationListResponse, ConversationResponse, OpenConversationRequest};
use bazaar_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .gateway
        .chat
        .open_conversation(user.id, req.user_id, req.listing_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(ConversationResponse {
            success: true,
            conversation,
        }),
    ))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state.gateway.chat.list_conversations(user.id).await?;
    Ok(Json(ConversationListResponse {
        success: true,
        conversations,
    }))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .gateway
        .chat
        .get_messages(conversation_id, user.id, query.page, query.limit)
        .await?;
    Ok(Json(page))
}
