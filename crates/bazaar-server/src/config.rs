use std::net::SocketAddr;
use std::path::PathBuf;

use bazaar_gateway::auth::ExpiryPolicy;
use bazaar_notify::push::EXPO_DEFAULT_URL;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got '{value}'")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// The expiry sweep looks at most a year ahead.
const MAX_SWEEP_LOOKAHEAD_DAYS: i64 = 365;

/// Runtime settings, read from `BAZAAR_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub expiry: ExpiryPolicy,
    pub push_url: String,
    pub push_access_token: Option<String>,
    pub sweep_hour: u32,
    pub sweep_lookahead_days: i64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("BAZAAR_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: "BAZAAR_PORT",
                expected: "a port number",
                value: raw,
            })?,
            None => 3000,
        };

        let expiry = match get("BAZAAR_STRICT_TOKEN_EXPIRY").as_deref() {
            None | Some("0") | Some("false") => ExpiryPolicy::Lenient,
            Some("1") | Some("true") => ExpiryPolicy::Strict,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "BAZAAR_STRICT_TOKEN_EXPIRY",
                    expected: "true or false",
                    value: other.to_string(),
                });
            }
        };

        let sweep_hour = match get("BAZAAR_SWEEP_HOUR") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(hour) if hour < 24 => hour,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BAZAAR_SWEEP_HOUR",
                        expected: "an hour between 0 and 23",
                        value: raw,
                    });
                }
            },
            None => 9,
        };

        let sweep_lookahead_days = match get("BAZAAR_SWEEP_LOOKAHEAD_DAYS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(days) if (1..=MAX_SWEEP_LOOKAHEAD_DAYS).contains(&days) => days,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BAZAAR_SWEEP_LOOKAHEAD_DAYS",
                        expected: "a number of days between 1 and 365",
                        value: raw,
                    });
                }
            },
            None => 30,
        };

        Ok(Self {
            host: get("BAZAAR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: PathBuf::from(get("BAZAAR_DB_PATH").unwrap_or_else(|| "bazaar.db".into())),
            expiry,
            push_url: get("BAZAAR_PUSH_URL").unwrap_or_else(|| EXPO_DEFAULT_URL.into()),
            push_access_token: get("BAZAAR_PUSH_ACCESS_TOKEN"),
            sweep_hour,
            sweep_lookahead_days,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}
