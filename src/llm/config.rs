//! Analyzer endpoint configuration parsed from environment variables.

use crate::config::parse_or;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    }
}

/// Where and how to reach the OpenAI-compatible analyzer. The credential is
/// not part of it: it comes from the settings store per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Without trailing slash.
    pub base_url: String,
    pub model: String,
    pub timeouts: LlmTimeouts,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeouts: LlmTimeouts::default(),
        }
    }
}

impl LlmConfig {
    /// Build typed LLM config from a key lookup.
    ///
    /// Optional:
    /// - `LLM_BASE_URL`: default `https://api.deepseek.com/v1`
    /// - `LLM_MODEL`: default `deepseek-chat`
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("LLM_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let model = lookup("LLM_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        let timeouts = LlmTimeouts {
            request_secs: parse_or(lookup, "LLM_REQUEST_TIMEOUT_SECS", DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(lookup, "LLM_CONNECT_TIMEOUT_SECS", DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };
        Self { base_url, model, timeouts }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
