use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, listings, chat)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                subject         TEXT NOT NULL UNIQUE,
                email           TEXT NOT NULL UNIQUE,
                full_name       TEXT NOT NULL,
                phone_number    TEXT UNIQUE,
                avatar          TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE listings (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                title       TEXT NOT NULL,
                price       TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active',
                expires_at  TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_listings_expiry
                ON listings(status, expires_at);

            CREATE TABLE favorites (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                listing_id  TEXT NOT NULL REFERENCES listings(id),
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, listing_id)
            );

            CREATE TABLE conversations (
                id              TEXT PRIMARY KEY,
                user1_id        TEXT NOT NULL REFERENCES users(id),
                user2_id        TEXT NOT NULL REFERENCES users(id),
                listing_id      TEXT NOT NULL REFERENCES listings(id),
                last_message    TEXT,
                last_message_at TEXT,
                created_at      TEXT NOT NULL,
                UNIQUE(user1_id, user2_id, listing_id)
            );

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id),
                sender_id       TEXT NOT NULL REFERENCES users(id),
                receiver_id     TEXT NOT NULL REFERENCES users(id),
                body            TEXT NOT NULL,
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL,
                read_at         TEXT
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            CREATE INDEX idx_messages_unread
                ON messages(conversation_id, receiver_id, is_read);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (device endpoints)");
        conn.execute_batch(
            "
            CREATE TABLE device_endpoints (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL REFERENCES users(id),
                token           TEXT NOT NULL UNIQUE,
                device_class    TEXT NOT NULL DEFAULT 'android',
                is_active       INTEGER NOT NULL DEFAULT 1,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX idx_device_endpoints_user
                ON device_endpoints(user_id, is_active);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
