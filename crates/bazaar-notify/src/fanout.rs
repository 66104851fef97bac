use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bazaar_db::{Database, format_timestamp};
use bazaar_types::notification::NotificationEvent;

use crate::push::{PushGateway, PushMessage, PushTicket};

/// What happened during one dispatch. Callers are free to ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub endpoints: usize,
    pub delivered: usize,
    pub failed: usize,
    pub failed_chunks: usize,
    pub deactivated: usize,
}

/// Delivers one logical notification to every active device of a user.
#[derive(Clone)]
pub struct FanOut {
    db: Arc<Database>,
    gateway: Arc<dyn PushGateway>,
}

impl FanOut {
    pub fn new(db: Arc<Database>, gateway: Arc<dyn PushGateway>) -> Self {
        Self { db, gateway }
    }

    /// Render, resolve endpoints, deliver in chunks. Never returns an error:
    /// every failure is logged and reflected in the report.
    pub async fn dispatch(&self, user_id: Uuid, event: &NotificationEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        let rendered = event.render();
        info!("Sending {} notification to user {}: {}", event.kind(), user_id, rendered.title);

        let db = self.db.clone();
        let uid = user_id.to_string();
        let endpoints = match tokio::task::spawn_blocking(move || db.get_active_endpoints(&uid)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                error!("Failed to load endpoints for {}: {}", user_id, e);
                return report;
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                return report;
            }
        };

        if endpoints.is_empty() {
            debug!("No push endpoints for user {}", user_id);
            return report;
        }
        report.endpoints = endpoints.len();

        let channel_id = event.channel_class().as_str().to_string();
        let messages: Vec<PushMessage> = endpoints
            .into_iter()
            .map(|ep| PushMessage {
                to: ep.token,
                sound: "default".into(),
                title: rendered.title.clone(),
                body: rendered.body.clone(),
                data: rendered.data.clone(),
                priority: "high".into(),
                channel_id: channel_id.clone(),
                badge: 1,
            })
            .collect();

        let chunk_size = self.gateway.max_batch_size().max(1);
        let chunks: Vec<&[PushMessage]> = messages.chunks(chunk_size).collect();

        // Chunks are submitted concurrently and fail independently.
        let results = join_all(chunks.iter().map(|chunk| self.gateway.send_batch(chunk))).await;

        for (chunk, result) in chunks.iter().zip(results) {
            let tickets = match result {
                Ok(tickets) => tickets,
                Err(e) => {
                    error!("Error sending push chunk of {} to user {}: {}", chunk.len(), user_id, e);
                    report.failed_chunks += 1;
                    report.failed += chunk.len();
                    continue;
                }
            };

            // Messages left without a ticket have no receipt and count as failed.
            if tickets.len() != chunk.len() {
                warn!(
                    "Push gateway returned {} tickets for {} messages",
                    tickets.len(),
                    chunk.len()
                );
                report.failed += chunk.len().saturating_sub(tickets.len());
            }

            for (message, ticket) in chunk.iter().zip(tickets.iter()) {
                if self.handle_ticket(message, ticket).await {
                    report.deactivated += 1;
                }
                match ticket.error_class() {
                    None => report.delivered += 1,
                    Some(_) => report.failed += 1,
                }
            }
        }

        report
    }

    /// Returns true if the endpoint was deactivated.
    async fn handle_ticket(&self, message: &PushMessage, ticket: &PushTicket) -> bool {
        let Some(class) = ticket.error_class() else {
            return false;
        };

        warn!(
            "Push to {} failed: {:?} {}",
            message.to,
            class,
            ticket.message.as_deref().unwrap_or("")
        );

        if !class.is_permanent() {
            return false;
        }

        let db = self.db.clone();
        let token = message.to.clone();
        let now = format_timestamp(Utc::now());
        match tokio::task::spawn_blocking(move || db.deactivate_endpoint(&token, &now)).await {
            Ok(Ok(n)) => {
                info!("Deactivated unregistered push endpoint {}", message.to);
                n > 0
            }
            Ok(Err(e)) => {
                error!("Failed to deactivate endpoint {}: {}", message.to, e);
                false
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                false
            }
        }
    }
}
