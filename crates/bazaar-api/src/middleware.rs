use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use bazaar_gateway::CoreError;

use crate::error::ApiError;
use crate::state::AppState;

/// Token from `Authorization: Bearer <token>`, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn required_token(req: &Request) -> Result<String, ApiError> {
    bearer_token(req.headers())
        .map(str::to_string)
        .ok_or_else(|| ApiError(CoreError::Authentication("No token provided".into())))
}

/// Verify the bearer token and attach the decoded `Identity`.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = required_token(&req)?;
    let identity = state.auth.verify(&token)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Verify the bearer token, resolve the user, and attach both the `Identity`
/// and the `User`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = required_token(&req)?;
    let identity = state.auth.verify(&token)?;
    let user = state.auth.resolver().resolve(&identity).await?;
    req.extensions_mut().insert(identity);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
