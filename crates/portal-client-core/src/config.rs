use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const TOKEN_KEY: &str = "access_token";
pub const USERNAME_KEY: &str = "username";
pub const DRAFT_KEY_PREFIX: &str = "draft_";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Longest delay a browser timer honours (`i32::MAX` ms).
pub const MAX_TIMER_DELAY_MS: u64 = 2_147_483_647;
pub const LOGIN_URL: &str = "index.html";
pub const DASHBOARD_URL: &str = "dashboard.html";
pub const TOKEN_EXPIRY_MINUTES: u64 = 30;
pub const ADMIN_ROLE: &str = "admin";
pub const DEFAULT_LOGOUT_CONFIRM_MESSAGE: &str = "Do you want to log out?";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Page-wide settings. Every field can be overridden from a JSON document;
/// omitted fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub api_base: String,
    pub token_key: String,
    pub username_key: String,
    pub request_timeout_ms: u64,
    /// Entry page; unauthenticated visitors and logouts land here.
    pub login_url: String,
    pub dashboard_url: String,
    /// Hint only; the backend owns real expiry.
    pub token_expiry_minutes: u64,
    pub admin_role: String,
    pub logout_confirm_message: String,
    pub log_level: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_key: TOKEN_KEY.to_string(),
            username_key: USERNAME_KEY.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            login_url: LOGIN_URL.to_string(),
            dashboard_url: DASHBOARD_URL.to_string(),
            token_expiry_minutes: TOKEN_EXPIRY_MINUTES,
            admin_role: ADMIN_ROLE.to_string(),
            logout_confirm_message: DEFAULT_LOGOUT_CONFIRM_MESSAGE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl PortalConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_json::from_str(raw).map_err(|error| ConfigError::Decode(error.to_string()))?;
        config.api_base = normalize_base_url(&config.api_base)?;
        if !(1..=MAX_TIMER_DELAY_MS).contains(&config.request_timeout_ms) {
            return Err(ConfigError::InvalidTimeout {
                timeout_ms: config.request_timeout_ms,
            });
        }
        Ok(config)
    }

    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn draft_key(page_key: &str) -> String {
        format!("{DRAFT_KEY_PREFIX}{page_key}")
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyBaseUrl);
    }
    let Some((scheme, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if !matches!(scheme, "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl);
    }
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}
