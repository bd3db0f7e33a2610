use std::env;
use std::time::Duration;

use crate::engine::Timeouts;
use crate::error::AppError;

pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_USER_AGENT: &str = "parcel-dispatch/0.1 (ops@parcel-dispatch.invalid)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub event_buffer_size: usize,
    pub store_timeout_ms: u64,
    pub geocode_timeout_ms: u64,
    pub notify_timeout_ms: u64,
    pub admin_token: String,
    pub notify_webhook_url: Option<String>,
    /// Empty disables network geocoding in favour of the depot postal codes.
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let admin_token = env::var("ADMIN_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AppError::Internal("ADMIN_TOKEN must be set".to_string()))?;

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact/json"
                )));
            }
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            store_timeout_ms: parse_or_default("STORE_TIMEOUT_MS", 2_000)?,
            geocode_timeout_ms: parse_or_default("GEOCODE_TIMEOUT_MS", 5_000)?,
            notify_timeout_ms: parse_or_default("NOTIFY_TIMEOUT_MS", 3_000)?,
            admin_token,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            geocoder_url: env::var("GEOCODER_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_URL.to_string()),
            geocoder_user_agent: env::var("GEOCODER_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
        })
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            store: Duration::from_millis(self.store_timeout_ms),
            geocode: Duration::from_millis(self.geocode_timeout_ms),
            notify: Duration::from_millis(self.notify_timeout_ms),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
