use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use bazaar_types::events::{ClientCommand, ServerEvent};
use bazaar_types::models::User;

use crate::chat::ChatService;
use crate::dispatcher::Dispatcher;
use crate::pipeline::MessagePipeline;
use crate::router::ConnId;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Everything a socket needs to serve commands.
#[derive(Clone)]
pub struct GatewayContext {
    pub dispatcher: Dispatcher,
    pub chat: ChatService,
    pub pipeline: MessagePipeline,
}

/// The authenticated party behind one connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub full_name: String,
    pub conn_id: ConnId,
}

/// Serve a socket whose bearer token was already checked at the HTTP upgrade.
pub async fn handle_connection(socket: WebSocket, ctx: GatewayContext, user: User) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut user_rx) = ctx.dispatcher.connect(user.id).await;
    let session = Session {
        user_id: user.id,
        full_name: user.full_name,
        conn_id,
    };
    info!("{} ({}) connected on {}", session.full_name, session.user_id, conn_id);

    // Let the newcomer see who was already here
    for other in ctx.dispatcher.presence().online_users().await {
        if other != session.user_id {
            ctx.dispatcher
                .router()
                .send_to(conn_id, ServerEvent::UserOnline { user_id: other })
                .await;
        }
    }

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = user_rx.recv() => {
                    let Some(event) = result else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("Failed to encode {} event: {}", event.name(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let recv_ctx = ctx.clone();
    let recv_session = session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => handle_command(&recv_ctx, &recv_session, cmd).await,
                    Err(e) => {
                        let preview: String = text.chars().take(200).collect();
                        warn!(
                            "{} ({}) bad command: {} -- raw: {}",
                            recv_session.full_name, recv_session.user_id, e, preview
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    ctx.dispatcher.disconnect(session.user_id, conn_id).await;
    info!("{} ({}) disconnected from {}", session.full_name, session.user_id, conn_id);
}

/// Apply one client command on behalf of `session`.
pub async fn handle_command(ctx: &GatewayContext, session: &Session, cmd: ClientCommand) {
    let router = ctx.dispatcher.router();

    match cmd {
        ClientCommand::JoinConversation(conversation_id) => {
            match ctx.chat.participant_conversation(conversation_id, session.user_id).await {
                Ok(_) => {
                    router.join(session.conn_id, conversation_id).await;
                }
                Err(e) => warn!(
                    "{} ({}) refused join of {}: {}",
                    session.full_name, session.user_id, conversation_id, e
                ),
            }
        }

        ClientCommand::LeaveConversation(conversation_id) => {
            router.leave(session.conn_id, conversation_id).await;
            debug!("{} left conversation {}", session.conn_id, conversation_id);
        }

        ClientCommand::SendMessage {
            conversation_id,
            receiver_id,
            message,
        } => {
            let reply = match ctx
                .pipeline
                .send(conversation_id, session.user_id, receiver_id, &message)
                .await
            {
                Ok(message) => ServerEvent::MessageSent {
                    success: true,
                    message,
                },
                Err(e) => {
                    warn!(
                        "{} ({}) send to {} failed: {}",
                        session.full_name, session.user_id, conversation_id, e
                    );
                    ServerEvent::MessageError {
                        error: e.client_message(),
                    }
                }
            };
            router.send_to(session.conn_id, reply).await;
        }

        ClientCommand::Typing {
            conversation_id,
            receiver_id,
        } => {
            ctx.dispatcher
                .send_to_user(
                    receiver_id,
                    ServerEvent::UserTyping {
                        conversation_id,
                        user_id: session.user_id,
                    },
                )
                .await;
        }

        ClientCommand::StopTyping {
            conversation_id,
            receiver_id,
        } => {
            ctx.dispatcher
                .send_to_user(
                    receiver_id,
                    ServerEvent::UserStopTyping {
                        conversation_id,
                        user_id: session.user_id,
                    },
                )
                .await;
        }
    }
}
