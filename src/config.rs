//! Service configuration parsed from environment variables.
//!
//! Every value has a default, so an empty environment yields a working
//! configuration. Values are read through a lookup function so tests can
//! supply a map instead of mutating the process environment.

use std::path::PathBuf;
use std::time::Duration;

use crate::llm::config::LlmConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";
pub const DEFAULT_EXTRACT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Errors for values that parse but make no sense.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be greater than zero")]
    Zero { var: &'static str },

    #[error("{var} must be within 0.0..=2.0, got {value}")]
    Temperature { var: &'static str, value: f32 },
}

/// Knobs for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// How long to wait for a page to answer `extractMessages`.
    pub extract_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            extract_timeout: Duration::from_millis(DEFAULT_EXTRACT_TIMEOUT_MS),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub settings_path: PathBuf,
    pub llm: LlmConfig,
    pub analysis: AnalysisOptions,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// - `PORT`: default 3000
    /// - `SETTINGS_PATH`: default `settings.json`
    /// - `EXTRACT_TIMEOUT_MS`: default 10000
    /// - `ANALYSIS_MAX_TOKENS`: default 200
    /// - `ANALYSIS_TEMPERATURE`: default 0.7
    /// - `LLM_*`: see [`LlmConfig::from_lookup`]
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for out-of-range values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT);
        let settings_path = lookup("SETTINGS_PATH")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from);

        let extract_ms = parse_or(&lookup, "EXTRACT_TIMEOUT_MS", DEFAULT_EXTRACT_TIMEOUT_MS);
        if extract_ms == 0 {
            return Err(ConfigError::Zero { var: "EXTRACT_TIMEOUT_MS" });
        }
        let max_tokens = parse_or(&lookup, "ANALYSIS_MAX_TOKENS", DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::Zero { var: "ANALYSIS_MAX_TOKENS" });
        }
        let temperature = parse_or(&lookup, "ANALYSIS_TEMPERATURE", DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Temperature { var: "ANALYSIS_TEMPERATURE", value: temperature });
        }

        Ok(Self {
            port,
            settings_path,
            llm: LlmConfig::from_lookup(&lookup),
            analysis: AnalysisOptions { extract_timeout: Duration::from_millis(extract_ms), max_tokens, temperature },
        })
    }
}

/// Parse `key`, falling back to `default` when unset or unparseable.
pub(crate) fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(%key, %raw, "config: unparseable value, using default");
            default
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
