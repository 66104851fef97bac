use thiserror::Error;

/// Failures talking to the push gateway. These never leave the fan-out.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("push gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("push gateway rejected batch ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("token is required")]
    MissingToken,
    #[error("invalid push token")]
    InvalidToken,
    #[error("store: {0}")]
    Store(#[from] anyhow::Error),
}
