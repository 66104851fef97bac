#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bazaar_db::{Database, format_timestamp};
use bazaar_notify::error::DeliveryError;
use bazaar_notify::push::{PushGateway, PushMessage, PushTicket};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Fake gateway: records every batch, reports configured tokens as
/// unregistered, and can fail whole batches that contain a poison token.
/// `missing_tickets` drops that many receipts from the end of each batch.
pub struct RecordingGateway {
    pub batches: Mutex<Vec<Vec<PushMessage>>>,
    pub batch_size: usize,
    pub unregistered: HashSet<String>,
    pub poison: Option<String>,
    pub missing_tickets: usize,
}

impl RecordingGateway {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            batch_size,
            unregistered: HashSet::new(),
            poison: None,
            missing_tickets: 0,
        }
    }

    pub async fn sent_tokens(&self) -> Vec<String> {
        self.batches
            .lock()
            .await
            .iter()
            .flatten()
            .map(|m| m.to.clone())
            .collect()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    fn max_batch_size(&self) -> usize {
        self.batch_size
    }

    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushTicket>, DeliveryError> {
        self.batches.lock().await.push(batch.to_vec());

        if let Some(poison) = &self.poison {
            if batch.iter().any(|m| &m.to == poison) {
                return Err(DeliveryError::Rejected {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
        }

        let answered = batch.len().saturating_sub(self.missing_tickets);
        Ok(batch[..answered]
            .iter()
            .map(|m| {
                if self.unregistered.contains(&m.to) {
                    PushTicket::error("DeviceNotRegistered", "not registered")
                } else {
                    PushTicket::ok(Uuid::new_v4().to_string())
                }
            })
            .collect())
    }
}

pub fn now() -> String {
    format_timestamp(Utc::now())
}

pub fn seed_user(db: &Database, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(
        &id.to_string(),
        &format!("sub-{}", name),
        &format!("{}@example.com", name),
        name,
        None,
        &now(),
    )
    .unwrap();
    id
}

pub fn seed_endpoint(db: &Database, user: Uuid, token: &str) {
    db.upsert_device_endpoint(&Uuid::new_v4().to_string(), &user.to_string(), token, "android", &now())
        .unwrap();
}

/// Rows stored for `token`, active or not.
pub fn endpoint_rows(db: &Database, token: &str) -> u32 {
    db.with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM device_endpoints WHERE token = ?1", [token], |r| r.get(0))?))
        .unwrap()
}

pub fn seed_listing(db: &Database, owner: Uuid, title: &str, expires_in: Option<Duration>) -> Uuid {
    let id = Uuid::new_v4();
    let expires = expires_in.map(|d| format_timestamp(Utc::now() + d));
    db.create_listing(&id.to_string(), &owner.to_string(), title, "999", expires.as_deref(), &now())
        .unwrap();
    id
}

pub fn memory_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().unwrap())
}
