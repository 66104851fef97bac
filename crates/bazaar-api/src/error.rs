use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};

use bazaar_gateway::CoreError;
use bazaar_notify::error::EndpointError;

/// HTTP face of `CoreError`.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }
        (
            status,
            Json(json!({ "success": false, "error": self.0.client_message() })),
        )
            .into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(CoreError::Persistence(e))
    }
}

impl From<EndpointError> for ApiError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::MissingToken | EndpointError::InvalidToken => {
                Self(CoreError::Validation(e.to_string()))
            }
            EndpointError::Store(inner) => Self(CoreError::Persistence(inner)),
        }
    }
}

/// Run a store call off the async runtime, mapping failures to 500.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;
    Ok(result)
}
