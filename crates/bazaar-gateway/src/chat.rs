use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use bazaar_db::{Database, format_timestamp};
use bazaar_types::api::{ConversationView, MessagePage, Pagination};
use bazaar_types::models::{Conversation, UserSummary, canonical_pair};

use crate::error::{CoreError, blocking};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Conversation lookup and history, shared by HTTP handlers and the socket.
#[derive(Clone)]
pub struct ChatService {
    db: Arc<Database>,
}

impl ChatService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find the conversation between `current_user` and `other_user` about
    /// `listing_id`, creating it on first contact.
    pub async fn open_conversation(
        &self,
        current_user: Uuid,
        other_user: Uuid,
        listing_id: Uuid,
    ) -> Result<ConversationView, CoreError> {
        if current_user == other_user {
            return Err(CoreError::Validation("Cannot start a conversation with yourself".into()));
        }

        let db = self.db.clone();
        let other = blocking(move || db.get_user_by_id(&other_user.to_string()))
            .await?
            .ok_or(CoreError::NotFound("user"))?;
        let db = self.db.clone();
        blocking(move || db.get_listing(&listing_id.to_string()))
            .await?
            .ok_or(CoreError::NotFound("listing"))?;

        let (user1, user2) = canonical_pair(current_user, other_user);
        let db = self.db.clone();
        let (row, created, unread) = blocking(move || {
            let (row, created) = db.find_or_create_conversation(
                &Uuid::new_v4().to_string(),
                &user1.to_string(),
                &user2.to_string(),
                &listing_id.to_string(),
                &format_timestamp(Utc::now()),
            )?;
            let unread = db.count_unread(&row.id, &current_user.to_string())?;
            Ok((row, created, unread))
        })
        .await?;
        let conversation = row.into_conversation()?;

        if created {
            info!(
                "Opened conversation {} between {} and {} on listing {}",
                conversation.id, current_user, other_user, listing_id
            );
        }

        Ok(ConversationView {
            conversation,
            other_user: other.summary()?,
            unread_count: unread,
        })
    }

    /// Every conversation the user takes part in, most recently active first.
    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationView>, CoreError> {
        let db = self.db.clone();
        let rows = blocking(move || db.list_conversations(&user_id.to_string())).await?;

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let other_user = UserSummary {
                id: row
                    .other_user_id
                    .parse()
                    .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", row.other_user_id, e))?,
                full_name: row.other_full_name,
                avatar: row.other_avatar,
            };
            views.push(ConversationView {
                conversation: row.conversation.into_conversation()?,
                other_user,
                unread_count: row.unread_count,
            });
        }
        Ok(views)
    }

    /// Load a conversation and require `user_id` to be one of its parties.
    pub async fn participant_conversation(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Conversation, CoreError> {
        let db = self.db.clone();
        let row = blocking(move || db.get_conversation(&conversation_id.to_string()))
            .await?
            .ok_or(CoreError::NotFound("conversation"))?;
        let conversation = row.into_conversation()?;
        if !conversation.has_participant(user_id) {
            return Err(CoreError::Forbidden("not a participant in this conversation".into()));
        }
        Ok(conversation)
    }

    /// One page of history, oldest first within the page. Page 1 holds the
    /// newest messages. Everything addressed to `user_id` is marked read
    /// after the page is read, so the returned page still shows it unread.
    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<MessagePage, CoreError> {
        self.participant_conversation(conversation_id, user_id).await?;

        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let db = self.db.clone();
        let (rows, total) = blocking(move || {
            let id = conversation_id.to_string();
            let rows = db.get_messages(&id, limit, offset)?;
            let total = db.count_messages(&id)?;
            Ok((rows, total))
        })
        .await?;

        let mut messages = rows
            .into_iter()
            .map(|row| row.into_message())
            .collect::<anyhow::Result<Vec<_>>>()?;
        messages.reverse();

        let marked = self.mark_conversation_read(conversation_id, user_id).await?;
        if marked > 0 {
            debug!("Marked {} messages read in {} for {}", marked, conversation_id, user_id);
        }

        Ok(MessagePage {
            success: true,
            messages,
            pagination: Pagination::new(total, page, limit),
        })
    }

    /// Mark every unread message addressed to `user_id` in the conversation as read.
    pub async fn mark_conversation_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<usize, CoreError> {
        let db = self.db.clone();
        blocking(move || {
            db.mark_conversation_read(
                &conversation_id.to_string(),
                &user_id.to_string(),
                &format_timestamp(Utc::now()),
            )
        })
        .await
    }
}
