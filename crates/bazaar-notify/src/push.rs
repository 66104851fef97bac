use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::DeliveryError;

/// Expo accepts at most this many messages per request.
pub const EXPO_MAX_BATCH: usize = 100;

pub const EXPO_DEFAULT_URL: &str = "https://exp.host";

const EXPO_SEND_PATH: &str = "/--/api/v2/push/send";

/// One push for one device endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: Value,
    pub priority: String,
    pub channel_id: String,
    pub badge: u32,
}

/// Per-message delivery result returned by the gateway, in request order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PushTicket {
    pub status: TicketStatus,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<TicketDetails>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TicketDetails {
    #[serde(default)]
    pub error: Option<String>,
}

/// Error classes the gateway reports per ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// The endpoint is permanently gone; stop sending to it.
    DeviceNotRegistered,
    MessageTooBig,
    MessageRateExceeded,
    InvalidCredentials,
    Other(String),
}

impl TicketError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::DeviceNotRegistered)
    }
}

impl PushTicket {
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Ok,
            id: Some(id.into()),
            message: None,
            details: None,
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            status: TicketStatus::Error,
            id: None,
            message: Some(message.into()),
            details: Some(TicketDetails {
                error: Some(code.to_string()),
            }),
        }
    }

    /// `None` for successful tickets.
    pub fn error_class(&self) -> Option<TicketError> {
        if self.status == TicketStatus::Ok {
            return None;
        }
        let code = self.details.as_ref().and_then(|d| d.error.as_deref());
        Some(match code {
            Some("DeviceNotRegistered") => TicketError::DeviceNotRegistered,
            Some("MessageTooBig") => TicketError::MessageTooBig,
            Some("MessageRateExceeded") => TicketError::MessageRateExceeded,
            Some("InvalidCredentials") => TicketError::InvalidCredentials,
            Some(other) => TicketError::Other(other.to_string()),
            None => TicketError::Other(self.message.clone().unwrap_or_default()),
        })
    }
}

/// A third-party push delivery service.
#[async_trait]
pub trait PushGateway: Send + Sync {
    fn max_batch_size(&self) -> usize {
        EXPO_MAX_BATCH
    }

    /// Submit one batch. On success returns one ticket per message, in order.
    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushTicket>, DeliveryError>;
}

#[derive(Deserialize)]
struct ExpoResponse {
    data: Vec<PushTicket>,
}

/// Expo push service client.
pub struct ExpoGateway {
    client: reqwest::Client,
    send_url: String,
    access_token: Option<String>,
}

impl ExpoGateway {
    pub fn new(base_url: &str, access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_url: format!("{}{}", base_url.trim_end_matches('/'), EXPO_SEND_PATH),
            access_token,
        }
    }
}

#[async_trait]
impl PushGateway for ExpoGateway {
    async fn send_batch(&self, batch: &[PushMessage]) -> Result<Vec<PushTicket>, DeliveryError> {
        let mut req = self
            .client
            .post(&self.send_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(batch);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ExpoResponse = resp.json().await?;
        debug!("Expo accepted batch of {}, {} tickets", batch.len(), parsed.data.len());
        Ok(parsed.data)
    }
}
