use axum::{Extension, Json, extract::State, response::IntoResponse};

use bazaar_notify::endpoints::{deregister_endpoint, register_endpoint};
use bazaar_types::api::{AckResponse, DeleteDeviceRequest, RegisterDeviceRequest};
use bazaar_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn register_device(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    register_endpoint(&state.db, user.id, &req.token, req.device_type).await?;
    Ok(Json(AckResponse {
        success: true,
        message: "Push token registered successfully".into(),
    }))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(req): Json<DeleteDeviceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    deregister_endpoint(&state.db, user.id, &req.token).await?;
    Ok(Json(AckResponse {
        success: true,
        message: "Push token removed successfully".into(),
    }))
}
