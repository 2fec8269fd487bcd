//! Session engine configuration.
//!
//! Every field has a default so a partial (or missing) `config.toml` still
//! yields a complete configuration.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AuthConfig {
    #[serde(default = "default_otp_send_delay_ms")]
    pub otp_send_delay_ms: u64,
    #[serde(default = "default_otp_verify_delay_ms")]
    pub otp_verify_delay_ms: u64,
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
    #[serde(default = "default_min_phone_digits")]
    pub min_phone_digits: usize,
    #[serde(default = "default_otp_length")]
    pub otp_length: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ChatConfig {
    #[serde(default = "default_response_delay_min_ms")]
    pub response_delay_min_ms: u64,
    #[serde(default = "default_response_delay_max_ms")]
    pub response_delay_max_ms: u64,
    #[serde(default = "default_page_load_delay_ms")]
    pub page_load_delay_ms: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LookupConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_otp_send_delay_ms() -> u64 {
    1200
}

fn default_otp_verify_delay_ms() -> u64 {
    900
}

fn default_country_code() -> String {
    "+91".to_string()
}

fn default_min_phone_digits() -> usize {
    10
}

fn default_otp_length() -> usize {
    6
}

fn default_response_delay_min_ms() -> u64 {
    1000
}

fn default_response_delay_max_ms() -> u64 {
    3000
}

fn default_page_load_delay_ms() -> u64 {
    1000
}

fn default_page_size() -> usize {
    20
}

fn default_max_attachment_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_debounce_ms() -> u64 {
    400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp_send_delay_ms: default_otp_send_delay_ms(),
            otp_verify_delay_ms: default_otp_verify_delay_ms(),
            default_country_code: default_country_code(),
            min_phone_digits: default_min_phone_digits(),
            otp_length: default_otp_length(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            response_delay_min_ms: default_response_delay_min_ms(),
            response_delay_max_ms: default_response_delay_max_ms(),
            page_load_delay_ms: default_page_load_delay_ms(),
            page_size: default_page_size(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AuthConfig {
    pub fn send_delay(&self) -> Duration {
        Duration::from_millis(self.otp_send_delay_ms)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.otp_verify_delay_ms)
    }
}

impl ChatConfig {
    /// Inclusive bounds of the simulated reply delay.
    pub fn response_window(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.response_delay_min_ms),
            Duration::from_millis(self.response_delay_max_ms),
        )
    }

    pub fn page_load_delay(&self) -> Duration {
        Duration::from_millis(self.page_load_delay_ms)
    }
}

impl LookupConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl SessionConfig {
    /// Checks cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chat.response_delay_min_ms > self.chat.response_delay_max_ms {
            return Err(SessionError::config(format!(
                "chat.response_delay_min_ms ({}) exceeds chat.response_delay_max_ms ({})",
                self.chat.response_delay_min_ms, self.chat.response_delay_max_ms
            )));
        }
        if self.chat.page_size == 0 {
            return Err(SessionError::config("chat.page_size must be at least 1"));
        }
        if !(4..=10).contains(&self.auth.otp_length) {
            return Err(SessionError::config(format!(
                "auth.otp_length must be between 4 and 10, got {}",
                self.auth.otp_length
            )));
        }
        if self.auth.min_phone_digits == 0 {
            return Err(SessionError::config("auth.min_phone_digits must be at least 1"));
        }
        Ok(())
    }
}
