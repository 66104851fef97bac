use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use bazaar_gateway::auth::Identity;
use bazaar_types::api::{RegisterUserRequest, UserResponse};
use bazaar_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Create the user row for a verified identity. Repeating it is harmless and
/// returns the existing user.
pub async fn register(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<RegisterUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, created) = state
        .auth
        .resolver()
        .register(&identity, &req.full_name, req.phone_number.as_deref())
        .await?;

    let (status, message) = if created {
        (StatusCode::CREATED, "User registered successfully")
    } else {
        (StatusCode::OK, "User already exists")
    };

    Ok((
        status,
        Json(UserResponse {
            success: true,
            message: Some(message.into()),
            user,
        }),
    ))
}

pub async fn me(Extension(user): Extension<User>) -> impl IntoResponse {
    Json(UserResponse {
        success: true,
        message: None,
        user,
    })
}
