#![allow(dead_code)]

use std::sync::Arc;

use bazaar_db::{Database, format_timestamp};
use bazaar_gateway::Dispatcher;
use bazaar_gateway::chat::ChatService;
use bazaar_gateway::connection::{GatewayContext, Session};
use bazaar_gateway::pipeline::MessagePipeline;
use bazaar_notify::{NotificationJob, NotificationQueue};
use bazaar_types::events::ServerEvent;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct Harness {
    pub db: Arc<Database>,
    pub ctx: GatewayContext,
    pub jobs: mpsc::UnboundedReceiver<NotificationJob>,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let dispatcher = Dispatcher::new();
        let (queue, jobs) = NotificationQueue::new();
        let ctx = GatewayContext {
            dispatcher: dispatcher.clone(),
            chat: ChatService::new(db.clone()),
            pipeline: MessagePipeline::new(db.clone(), dispatcher, queue),
        };
        Self { db, ctx, jobs }
    }

    pub fn user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .create_user(
                &id.to_string(),
                &format!("sub-{}", name),
                &format!("{}@example.com", name),
                name,
                None,
                &format_timestamp(Utc::now()),
            )
            .unwrap();
        id
    }

    pub fn listing(&self, owner: Uuid, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.db
            .create_listing(
                &id.to_string(),
                &owner.to_string(),
                title,
                "15000",
                None,
                &format_timestamp(Utc::now()),
            )
            .unwrap();
        id
    }

    /// Connect `user_id` and return its session plus the outbound queue,
    /// drained of the connect-time presence events.
    pub async fn connect(&self, user_id: Uuid, name: &str) -> (Session, mpsc::UnboundedReceiver<ServerEvent>) {
        let (conn_id, mut rx) = self.ctx.dispatcher.connect(user_id).await;
        drain(&mut rx);
        let session = Session {
            user_id,
            full_name: name.to_string(),
            conn_id,
        };
        (session, rx)
    }

    pub fn drain_jobs(&mut self) -> Vec<NotificationJob> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.jobs.try_recv() {
            jobs.push(job);
        }
        jobs
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
