use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bazaar_db::{Database, format_timestamp};
use bazaar_types::models::DeviceClass;

use crate::error::EndpointError;

/// Accepts `ExponentPushToken[...]`, `ExpoPushToken[...]`, or a bare
/// UUID-shaped device id.
pub fn is_valid_push_token(token: &str) -> bool {
    let bracketed = (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']');
    if bracketed {
        return true;
    }

    let groups: Vec<&str> = token.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Register a device for `user_id`. An existing registration of the same
/// token, under any user, is reassigned and reactivated.
pub async fn register_endpoint(
    db: &Arc<Database>,
    user_id: Uuid,
    token: &str,
    device_class: Option<DeviceClass>,
) -> Result<(), EndpointError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(EndpointError::MissingToken);
    }
    if !is_valid_push_token(token) {
        return Err(EndpointError::InvalidToken);
    }

    let db = db.clone();
    let token_owned = token.to_string();
    let class = device_class.unwrap_or_default();
    tokio::task::spawn_blocking(move || {
        db.upsert_device_endpoint(
            &Uuid::new_v4().to_string(),
            &user_id.to_string(),
            &token_owned,
            class.as_str(),
            &format_timestamp(Utc::now()),
        )
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    info!("Registered {} push endpoint for {}", class.as_str(), user_id);
    Ok(())
}

/// Deactivate `token` if it belongs to `user_id`. Unknown tokens are a no-op.
pub async fn deregister_endpoint(
    db: &Arc<Database>,
    user_id: Uuid,
    token: &str,
) -> Result<bool, EndpointError> {
    if token.trim().is_empty() {
        return Err(EndpointError::MissingToken);
    }

    let db = db.clone();
    let token = token.trim().to_string();
    let changed = tokio::task::spawn_blocking(move || {
        db.deactivate_user_endpoint(&user_id.to_string(), &token, &format_timestamp(Utc::now()))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(changed > 0)
}
