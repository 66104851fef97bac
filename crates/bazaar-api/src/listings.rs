use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bazaar_db::format_timestamp;
use bazaar_gateway::CoreError;
use bazaar_types::api::{AckResponse, FavoriteResponse};
use bazaar_types::models::{Listing, ListingStatus, User};
use bazaar_types::notification::NotificationEvent;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

async fn load_listing(state: &AppState, listing_id: Uuid) -> Result<Listing, ApiError> {
    let db = state.db.clone();
    let row = blocking(move || db.get_listing(&listing_id.to_string()))
        .await?
        .ok_or(ApiError(CoreError::NotFound("listing")))?;
    Ok(row.into_listing()?)
}

/// Add or remove a favorite. Adding someone else's listing tells the owner.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = load_listing(&state, listing_id).await?;

    let db = state.db.clone();
    let user_id = user.id;
    let added = blocking(move || {
        db.toggle_favorite(
            &Uuid::new_v4().to_string(),
            &user_id.to_string(),
            &listing_id.to_string(),
            &format_timestamp(Utc::now()),
        )
    })
    .await?;

    if added && listing.owner_id != user.id {
        state.notifications.enqueue(
            listing.owner_id,
            NotificationEvent::ListingFavorited {
                listing_id,
                listing_title: listing.title,
                user_name: user.full_name,
            },
        );
    }

    Ok(Json(FavoriteResponse {
        success: true,
        is_favorite: added,
    }))
}

/// Owner-only. Marks the listing sold and confirms it to the owner's devices.
pub async fn mark_sold(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = load_listing(&state, listing_id).await?;
    if listing.owner_id != user.id {
        return Err(ApiError(CoreError::Forbidden("not the listing owner".into())));
    }

    let db = state.db.clone();
    blocking(move || db.set_listing_status(&listing_id.to_string(), ListingStatus::Sold.as_str())).await?;
    info!("Listing {} marked sold by {}", listing_id, user.id);

    state.notifications.enqueue(
        user.id,
        NotificationEvent::ListingSold {
            listing_id,
            listing_title: listing.title,
        },
    );

    Ok(Json(AckResponse {
        success: true,
        message: "Listing marked as sold".into(),
    }))
}
