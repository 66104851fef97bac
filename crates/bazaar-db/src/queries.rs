use crate::Database;
use crate::models::{
    ConversationRow, ConversationSummaryRow, DeviceEndpointRow, ListingRow, MessageRow, UserRow,
};
use anyhow::{Result, bail};
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, subject, email, full_name, phone_number, avatar, created_at";
const LISTING_COLUMNS: &str = "id, owner_id, title, price, status, expires_at";
const CONVERSATION_COLUMNS: &str =
    "c.id, c.user1_id, c.user2_id, c.listing_id, c.last_message, c.last_message_at, c.created_at";
const ENDPOINT_COLUMNS: &str = "id, user_id, token, device_class, is_active";

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        subject: &str,
        email: &str,
        full_name: &str,
        phone_number: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, subject, email, full_name, phone_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, subject, email, full_name, phone_number, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_subject(&self, subject: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE subject = ?1", USER_COLUMNS);
            conn.query_row(&sql, [subject], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Listings --

    pub fn create_listing(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        price: &str,
        expires_at: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO listings (id, owner_id, title, price, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, owner_id, title, price, expires_at, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM listings WHERE id = ?1", LISTING_COLUMNS);
            conn.query_row(&sql, [id], listing_from_row).optional()
        })
    }

    pub fn set_listing_status(&self, id: &str, status: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("UPDATE listings SET status = ?2 WHERE id = ?1", (id, status))?)
        })
    }

    /// Active listings with `now < expires_at <= horizon`.
    pub fn get_expiring_listings(&self, now: &str, horizon: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM listings
                 WHERE status = 'active'
                   AND expires_at IS NOT NULL
                   AND expires_at > ?1
                   AND expires_at <= ?2
                 ORDER BY expires_at",
                LISTING_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((now, horizon), listing_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Toggle a favorite: removes if exists, inserts if not. Returns true when added.
    pub fn toggle_favorite(
        &self,
        id: &str,
        user_id: &str,
        listing_id: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM favorites WHERE user_id = ?1 AND listing_id = ?2",
                    (user_id, listing_id),
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM favorites WHERE id = ?1", [&existing_id])?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO favorites (id, user_id, listing_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![id, user_id, listing_id, created_at],
                )?;
                Ok(true)
            }
        })
    }

    // -- Conversations --

    /// Returns the conversation for the (already canonicalized) pair and listing,
    /// creating it with `id` if none exists. The bool is true when created.
    pub fn find_or_create_conversation(
        &self,
        id: &str,
        user1_id: &str,
        user2_id: &str,
        listing_id: &str,
        created_at: &str,
    ) -> Result<(ConversationRow, bool)> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO conversations (id, user1_id, user2_id, listing_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user1_id, user2_id, listing_id, created_at],
            )?;

            let sql = format!(
                "SELECT {} FROM conversations c
                 WHERE c.user1_id = ?1 AND c.user2_id = ?2 AND c.listing_id = ?3",
                CONVERSATION_COLUMNS
            );
            let row = conn.query_row(&sql, (user1_id, user2_id, listing_id), conversation_from_row)?;
            Ok((row, inserted == 1))
        })
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM conversations c WHERE c.id = ?1", CONVERSATION_COLUMNS);
            conn.query_row(&sql, [id], conversation_from_row).optional()
        })
    }

    /// All conversations `user_id` takes part in, most recently active first.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, u.id, u.full_name, u.avatar,
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.conversation_id = c.id
                            AND m.receiver_id = ?1
                            AND m.is_read = 0)
                 FROM conversations c
                 JOIN users u
                   ON u.id = CASE WHEN c.user1_id = ?1 THEN c.user2_id ELSE c.user1_id END
                 WHERE c.user1_id = ?1 OR c.user2_id = ?1
                 ORDER BY c.last_message_at IS NULL, c.last_message_at DESC, c.created_at DESC",
                CONVERSATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationSummaryRow {
                        conversation: conversation_from_row(row)?,
                        other_user_id: row.get(7)?,
                        other_full_name: row.get(8)?,
                        other_avatar: row.get(9)?,
                        unread_count: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message and point the parent conversation's last-message
    /// fields at it, in one transaction.
    pub fn append_message(
        &self,
        id: &str,
        conversation_id: &str,
        sender_id: &str,
        receiver_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, conversation_id, sender_id, receiver_id, body, created_at],
            )?;
            let updated = tx.execute(
                "UPDATE conversations SET last_message = ?2, last_message_at = ?3 WHERE id = ?1",
                (conversation_id, body, created_at),
            )?;
            if updated != 1 {
                bail!("conversation {} vanished while appending message", conversation_id);
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT m.id, m.conversation_id, m.sender_id, m.receiver_id, m.body, m.is_read,
                        m.created_at, m.read_at, u.full_name, u.avatar
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.id = ?1",
                [id],
                message_from_row,
            )
            .optional()
        })
    }

    /// One page of a conversation, newest first.
    pub fn get_messages(&self, conversation_id: &str, limit: u32, offset: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch sender display fields in a single query (eliminates N+1)
            let mut stmt = conn.prepare(
                "SELECT m.id, m.conversation_id, m.sender_id, m.receiver_id, m.body, m.is_read,
                        m.created_at, m.read_at, u.full_name, u.avatar
                 FROM messages m
                 LEFT JOIN users u ON m.sender_id = u.id
                 WHERE m.conversation_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![conversation_id, limit, offset], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_messages(&self, conversation_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                [conversation_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_unread(&self, conversation_id: &str, receiver_id: &str) -> Result<u32> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM messages
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                (conversation_id, receiver_id),
                |row| row.get(0),
            )?)
        })
    }

    /// Flip every unread message addressed to `receiver_id` in the conversation
    /// to read. Already-read rows are untouched, so repeating this is a no-op.
    pub fn mark_conversation_read(
        &self,
        conversation_id: &str,
        receiver_id: &str,
        read_at: &str,
    ) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE messages SET is_read = 1, read_at = ?3
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                (conversation_id, receiver_id, read_at),
            )?)
        })
    }

    // -- Device endpoints --

    /// Register a token for `user_id`. A token already known under any owner is
    /// reassigned to this user and reactivated rather than duplicated.
    pub fn upsert_device_endpoint(
        &self,
        id: &str,
        user_id: &str,
        token: &str,
        device_class: &str,
        now: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO device_endpoints (id, user_id, token, device_class, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
                 ON CONFLICT(token) DO UPDATE SET
                    user_id = excluded.user_id,
                    device_class = excluded.device_class,
                    is_active = 1,
                    updated_at = excluded.updated_at",
                rusqlite::params![id, user_id, token, device_class, now],
            )?;
            Ok(())
        })
    }

    pub fn deactivate_user_endpoint(&self, user_id: &str, token: &str, now: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE device_endpoints SET is_active = 0, updated_at = ?3
                 WHERE user_id = ?1 AND token = ?2",
                (user_id, token, now),
            )?)
        })
    }

    /// Single-row deactivation, used when the push gateway reports a token dead.
    pub fn deactivate_endpoint(&self, token: &str, now: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE device_endpoints SET is_active = 0, updated_at = ?2 WHERE token = ?1",
                (token, now),
            )?)
        })
    }

    pub fn get_active_endpoints(&self, user_id: &str) -> Result<Vec<DeviceEndpointRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM device_endpoints WHERE user_id = ?1 AND is_active = 1 ORDER BY created_at",
                ENDPOINT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], endpoint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
    conn.query_row(&sql, [id], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        subject: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        phone_number: row.get(4)?,
        avatar: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        price: row.get(3)?,
        status: row.get(4)?,
        expires_at: row.get(5)?,
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user1_id: row.get(1)?,
        user2_id: row.get(2)?,
        listing_id: row.get(3)?,
        last_message: row.get(4)?,
        last_message_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        receiver_id: row.get(3)?,
        body: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
        read_at: row.get(7)?,
        sender_full_name: row.get::<_, Option<String>>(8)?.unwrap_or_else(|| "unknown".to_string()),
        sender_avatar: row.get(9)?,
    })
}

fn endpoint_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceEndpointRow> {
    Ok(DeviceEndpointRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        token: row.get(2)?,
        device_class: row.get(3)?,
        is_active: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
