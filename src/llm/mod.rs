//! LLM — the analyzer adapter.
//!
//! DESIGN
//! ======
//! One OpenAI-compatible backend (DeepSeek by default) behind the
//! [`LlmChat`] trait, so the coordinator can be tested against a scripted
//! mock. The model and endpoint come from the environment; the bearer key
//! is passed per call.

pub mod config;
pub mod openai;
pub mod types;

use config::LlmConfig;
pub use types::{ChatRequest, ChatResponse, LlmChat, LlmError, Message};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete analyzer client, configured by [`LlmClient::from_config`].
pub struct LlmClient {
    inner: openai::OpenAiClient,
    model: String,
}

impl LlmClient {
    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let inner = openai::OpenAiClient::new(&config.base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model.clone() })
    }

    /// Return the configured model name (e.g. `"deepseek-chat"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.inner.chat(&self.model, api_key, request).await
    }
}
