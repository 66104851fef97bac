use axum::http::StatusCode;
use thiserror::Error;

/// Failure taxonomy shared by the socket and HTTP surfaces.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}

impl CoreError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show a client. Store errors stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::Persistence(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, CoreError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(CoreError::Persistence)
}
