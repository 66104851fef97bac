use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use tracing::warn;

use bazaar_gateway::CoreError;
use bazaar_gateway::connection;
use bazaar_types::models::User;

use crate::error::ApiError;
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// The handshake token: the Authorization header wins over `?token=`.
pub fn handshake_token(headers: &HeaderMap, query: &SocketQuery) -> Option<String> {
    bearer_token(headers)
        .map(str::to_string)
        .or_else(|| query.token.clone().filter(|t| !t.trim().is_empty()))
}

/// Authenticate a socket handshake. Nothing is registered if this fails.
pub async fn authenticate_handshake(
    state: &AppState,
    headers: &HeaderMap,
    query: &SocketQuery,
) -> Result<User, ApiError> {
    let token = handshake_token(headers, query)
        .ok_or_else(|| ApiError(CoreError::Authentication("No token provided".into())))?;
    state.auth.authenticate(&token).await.map_err(|e| {
        warn!("Socket handshake rejected: {}", e);
        ApiError(e)
    })
}

/// Authenticate at the HTTP layer, then hand the socket to the gateway.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user = authenticate_handshake(&state, &headers, &query).await?;
    let ctx = state.gateway.clone();
    Ok(ws.on_upgrade(move |socket| connection::handle_connection(socket, ctx, user)))
}
