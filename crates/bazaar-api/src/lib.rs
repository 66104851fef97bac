pub mod auth;
pub mod conversations;
pub mod error;
pub mod listings;
pub mod middleware;
pub mod notifications;
pub mod socket;
pub mod state;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use crate::middleware::{require_auth, require_identity};
use crate::state::AppState;

/// Every HTTP and socket route. Cross-cutting layers (CORS, tracing) are
/// added by the binary.
pub fn router(state: AppState) -> Router {
    // Registration only needs a valid token; the user row may not exist yet
    let registration = Router::new()
        .route("/api/auth/register", post(auth::register))
        .layer(from_fn_with_state(state.clone(), require_identity));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route(
            "/api/chat/conversations",
            post(conversations::open_conversation).get(conversations::list_conversations),
        )
        .route("/api/chat/conversations/{conversation_id}/messages", get(conversations::get_messages))
        .route("/api/notifications/register", post(notifications::register_device))
        .route("/api/notifications/delete", post(notifications::delete_device))
        .route("/api/listings/{listing_id}/favorite", post(listings::toggle_favorite))
        .route("/api/listings/{listing_id}/sold", post(listings::mark_sold))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(health))
        .route("/socket", get(socket::upgrade))
        .merge(registration)
        .merge(protected)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "bazaar" }))
}
